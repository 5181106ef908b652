//! Integration tests for the infrastructure components
//!
//! These tests need a live PostgreSQL (`DATABASE_URL`) and Redis (`REDIS_URL`)
//! and are ignored by default. Run them with `cargo test -- --ignored`.

use common::{
    Role,
    cache::{RedisConfig, RevocationStore},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    jwt::{JwtConfig, JwtService, TokenType},
    seed::{BootstrapAdmin, seed},
};
use sqlx::Row;
use uuid::Uuid;

/// Schema, seeding and cascade rules against a real database
#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_schema_seed_and_cascades() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    assert!(health_check(&pool).await?, "Database health check failed");

    run_migrations(&pool).await?;
    let admin = BootstrapAdmin {
        username: "admin".to_string(),
        password: "Adm1n!password".to_string(),
    };
    seed(&pool, Some(&admin)).await?;
    // Seeding twice must not duplicate roles
    seed(&pool, Some(&admin)).await?;

    let roles: Vec<String> = sqlx::query_scalar("SELECT name FROM roles ORDER BY name")
        .fetch_all(&pool)
        .await?;
    assert_eq!(roles, vec!["admin".to_string(), "member".to_string()]);

    let suffix = Uuid::new_v4().simple().to_string();
    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (username, name, surname, password_hash, role_id)
        SELECT $1, 'Ada', 'Lovelace', 'x', id FROM roles WHERE name = $2
        RETURNING id
        "#,
    )
    .bind(format!("ada_{}", suffix))
    .bind(Role::Member.as_str())
    .fetch_one(&pool)
    .await?;

    let group_id: Uuid = sqlx::query_scalar("INSERT INTO groups (name) VALUES ($1) RETURNING id")
        .bind(format!("TeamA_{}", suffix))
        .fetch_one(&pool)
        .await?;

    let event_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO events (title, date, start_time, end_time, group_id)
        VALUES ('Standup', '2024-01-10', '09:00', '09:30', $1)
        RETURNING id
        "#,
    )
    .bind(group_id)
    .fetch_one(&pool)
    .await?;

    sqlx::query("INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(group_id)
        .execute(&pool)
        .await?;
    sqlx::query("INSERT INTO user_events (user_id, event_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(event_id)
        .execute(&pool)
        .await?;

    // Deleting the group clears memberships and ungroups the event
    sqlx::query("DELETE FROM groups WHERE id = $1")
        .bind(group_id)
        .execute(&pool)
        .await?;
    let memberships: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_groups WHERE group_id = $1")
        .bind(group_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(memberships, 0);
    let row = sqlx::query("SELECT group_id FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_one(&pool)
        .await?;
    let remaining_group: Option<Uuid> = row.get("group_id");
    assert_eq!(remaining_group, None);

    // Deleting the event clears its attendance
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&pool)
        .await?;
    let attendance: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_events WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(attendance, 0);

    // An event whose start is not before its end is refused by the store
    let inverted = sqlx::query(
        "INSERT INTO events (title, date, start_time, end_time) VALUES ('Bad', '2024-01-10', '10:00', '09:00')",
    )
    .execute(&pool)
    .await;
    assert!(inverted.is_err());

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await?;

    Ok(())
}

/// Revocation round trip against a real Redis
#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_token_revocation() -> Result<(), Box<dyn std::error::Error>> {
    let store = RevocationStore::new(&RedisConfig::from_env()?)?;
    assert!(store.health_check().await?, "Redis health check failed");

    let token_id = Uuid::new_v4();
    assert!(!store.is_revoked(token_id).await?);

    assert!(store.revoke(token_id, 10).await?);
    assert!(store.is_revoked(token_id).await?);

    // A second revocation reports the token as already consumed
    assert!(!store.revoke(token_id, 10).await?);

    Ok(())
}

/// Two concurrent rotations of one refresh token yield a single new pair
#[tokio::test]
#[ignore = "requires a running Redis instance"]
async fn test_refresh_token_rotates_once() -> Result<(), Box<dyn std::error::Error>> {
    let store = RevocationStore::new(&RedisConfig::from_env()?)?;
    let jwt = JwtService::new(JwtConfig {
        secret: "an-integration-test-secret-of-32-bytes".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 3600,
    });

    let pair = jwt.issue_pair(Uuid::new_v4(), Role::Member)?;
    let claims = jwt
        .authenticate(&store, &pair.refresh_token, TokenType::Refresh)
        .await?;

    let (first, second) = tokio::join!(
        jwt.rotate_refresh_token(&store, &claims, Role::Member),
        jwt.rotate_refresh_token(&store, &claims, Role::Member),
    );
    let rotated = [first?, second?].into_iter().flatten().count();
    assert_eq!(rotated, 1);

    assert!(
        jwt.authenticate(&store, &pair.refresh_token, TokenType::Refresh)
            .await
            .is_err()
    );

    Ok(())
}

//! Start-up seeding of roles and the bootstrap administrator

use anyhow::Result;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::{password::hash_password, role::Role};

/// Administrator account created when the user table is empty
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

/// Insert the fixed roles if absent, then create the bootstrap administrator
/// when no user exists yet.
pub async fn seed(pool: &PgPool, admin: Option<&BootstrapAdmin>) -> Result<()> {
    let mut inserted = 0u64;
    for role in Role::ALL {
        inserted += sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(role.as_str())
            .execute(pool)
            .await?
            .rows_affected();
    }

    if inserted > 0 {
        info!("Seeded {} new roles", inserted);
    }

    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if user_count > 0 {
        return Ok(());
    }

    let Some(admin) = admin else {
        warn!("No users exist and no bootstrap administrator password is configured");
        return Ok(());
    };

    let password_hash = hash_password(&admin.password)?;
    sqlx::query(
        r#"
        INSERT INTO users (username, name, surname, password_hash, role_id)
        SELECT $1, 'admin', 'admin', $2, id FROM roles WHERE name = $3
        ON CONFLICT (username) DO NOTHING
        "#,
    )
    .bind(&admin.username)
    .bind(&password_hash)
    .bind(Role::Admin.as_str())
    .execute(pool)
    .await?;

    info!("Created bootstrap administrator '{}'", admin.username);
    Ok(())
}

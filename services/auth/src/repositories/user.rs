//! User repository for database operations

use anyhow::Result;
use common::{Role, password};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{Registration, User};

const USER_COLUMNS: &str = r#"
    u.id, u.username, u.name, u.surname, u.password_hash, r.name AS role, u.created_at
"#;

/// Result of a registration attempt
#[derive(Debug)]
pub enum RegistrationOutcome {
    Created(User),
    UsernameTaken,
    NameTaken,
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new member
    ///
    /// Both the username and the (name, surname) pair must be unused.
    pub async fn register(&self, form: &Registration) -> Result<RegistrationOutcome> {
        info!("Registering new user: {}", form.username);

        let password_hash = password::hash_password(&form.password)?;
        let mut tx = self.pool.begin().await?;

        let name_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE name = $1 AND surname = $2)",
        )
        .bind(form.name.trim())
        .bind(form.surname.trim())
        .fetch_one(&mut *tx)
        .await?;

        if name_taken {
            return Ok(RegistrationOutcome::NameTaken);
        }

        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, name, surname, password_hash, role_id)
            SELECT $1, $2, $3, $4, id FROM roles WHERE name = $5
            ON CONFLICT (username) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(form.username.trim())
        .bind(form.name.trim())
        .bind(form.surname.trim())
        .bind(&password_hash)
        .bind(Role::Member.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = id else {
            return Ok(RegistrationOutcome::UsernameTaken);
        };

        tx.commit().await?;

        let user = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Registered user {} vanished", id))?;

        Ok(RegistrationOutcome::Created(user))
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Verify a user's password
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        password::verify_password(password, &user.password_hash)
    }

    /// Replace a user's password; false when the user no longer exists
    pub async fn update_password(&self, id: Uuid, new_password: &str) -> Result<bool> {
        info!("Updating password for user: {}", id);

        let password_hash = password::hash_password(new_password)?;
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(&password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        surname: row.try_get("surname")?,
        password_hash: row.try_get("password_hash")?,
        role: role.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

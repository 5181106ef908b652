//! Repositories for database operations

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    RemovalOutcome,
    user::{UpdateUserRequest, UserSummary},
};

pub mod attendance;
pub mod event;
pub mod group;

pub use attendance::AttendanceRepository;
pub use event::EventRepository;
pub use group::GroupRepository;

pub(crate) const USER_SUMMARY_COLUMNS: &str = r#"
    u.id, u.username, u.name, u.surname, r.name AS role, u.created_at
"#;

pub(crate) fn user_summary_from_row(row: &PgRow) -> Result<UserSummary> {
    let role: String = row.try_get("role")?;

    Ok(UserSummary {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        surname: row.try_get("surname")?,
        role: role.parse()?,
        created_at: row.try_get("created_at")?,
    })
}

/// Result of an administrative user edit
#[derive(Debug)]
pub enum UserUpdate {
    Updated(UserSummary),
    NotFound,
    NameTaken,
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get all users, ordered by surname and name
    pub async fn list(&self) -> Result<Vec<UserSummary>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM users u
            JOIN roles r ON r.id = u.role_id
            ORDER BY u.surname, u.name, u.id
            "#,
            USER_SUMMARY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_summary_from_row).collect()
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserSummary>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1",
            USER_SUMMARY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_summary_from_row).transpose()
    }

    /// Change a user's name, surname and role
    pub async fn update(&self, id: Uuid, update: &UpdateUserRequest) -> Result<UserUpdate> {
        info!("Updating user {} with role {}", id, update.role);

        let mut tx = self.pool.begin().await?;

        let name_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE name = $1 AND surname = $2 AND id <> $3)",
        )
        .bind(update.name.trim())
        .bind(update.surname.trim())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if name_taken {
            return Ok(UserUpdate::NameTaken);
        }

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $1,
                surname = $2,
                role_id = (SELECT id FROM roles WHERE name = $3),
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(update.name.trim())
        .bind(update.surname.trim())
        .bind(update.role.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(UserUpdate::NotFound);
        }

        tx.commit().await?;

        Ok(self
            .find_by_id(id)
            .await?
            .map_or(UserUpdate::NotFound, UserUpdate::Updated))
    }

    /// Delete a user together with their memberships and attendance
    pub async fn delete(&self, id: Uuid) -> Result<RemovalOutcome> {
        info!("Deleting user {}", id);

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(RemovalOutcome::from_rows_affected(result.rows_affected()))
    }
}

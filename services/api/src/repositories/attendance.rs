//! Attendance ledger repository

use std::collections::HashSet;

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    RemovalOutcome,
    attendance::{AttendanceOutcome, Participant},
};

/// Attendance repository for database operations
#[derive(Clone)]
pub struct AttendanceRepository {
    pool: PgPool,
}

impl AttendanceRepository {
    /// Create a new attendance repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record that a user attends an event
    ///
    /// The primary key on (user_id, event_id) makes concurrent duplicates
    /// resolve to a single row.
    pub async fn add(&self, user_id: Uuid, event_id: Uuid) -> Result<AttendanceOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_events (user_id, event_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, event_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(AttendanceOutcome::AlreadyAttending);
        }

        info!("User {} now attends event {}", user_id, event_id);
        Ok(AttendanceOutcome::Added)
    }

    pub async fn remove(&self, user_id: Uuid, event_id: Uuid) -> Result<RemovalOutcome> {
        let result = sqlx::query("DELETE FROM user_events WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(RemovalOutcome::from_rows_affected(result.rows_affected()))
    }

    /// Participants of an event, ordered by surname and name
    pub async fn participants_of(&self, event_id: Uuid) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT u.id AS user_id, u.username, u.name, u.surname
            FROM user_events ue
            JOIN users u ON u.id = ue.user_id
            WHERE ue.event_id = $1
            ORDER BY u.surname, u.name, u.id
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    pub async fn is_attending(&self, user_id: Uuid, event_id: Uuid) -> Result<bool> {
        let attending = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_events WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(attending)
    }

    pub async fn events_attended_by(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT event_id FROM user_events WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }
}

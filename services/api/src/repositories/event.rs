//! Event catalog repository

use anyhow::Result;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    RemovalOutcome,
    event::{Event, EventDetails, Slot},
};

const EVENT_SELECT: &str = r#"
    SELECT e.id, e.title, e.description, e.date, e.start_time, e.end_time,
           e.capacity, e.group_id, g.name AS group_name, e.color
    FROM events e
    LEFT JOIN groups g ON g.id = e.group_id
"#;

fn event_from_row(row: &PgRow) -> Result<Event> {
    Ok(Event {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        date: row.try_get("date")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        capacity: row.try_get("capacity")?,
        group_id: row.try_get("group_id")?,
        group_name: row.try_get("group_name")?,
        color: row.try_get("color")?,
    })
}

/// Event repository for database operations
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The whole catalog in chronological order
    pub async fn list_all(&self) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY e.date, e.start_time, e.id",
            EVENT_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query(&format!("{} WHERE e.id = $1", EVENT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(event_from_row).transpose()
    }

    /// Every occurrence sharing a title, in chronological order
    pub async fn find_by_title(&self, title: &str) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "{} WHERE e.title = $1 ORDER BY e.date, e.start_time, e.id",
            EVENT_SELECT
        ))
        .bind(title)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    /// Insert one event per slot, all or nothing
    pub async fn create_many(&self, details: &EventDetails, slots: &[Slot]) -> Result<Vec<Uuid>> {
        info!("Creating {} occurrence(s) of '{}'", slots.len(), details.title);

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(slots.len());

        for slot in slots {
            let id: Uuid = sqlx::query_scalar(
                r#"
                INSERT INTO events
                    (title, description, date, start_time, end_time, capacity, group_id, color)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                "#,
            )
            .bind(&details.title)
            .bind(&details.description)
            .bind(slot.date)
            .bind(slot.start_time)
            .bind(slot.end_time)
            .bind(details.capacity)
            .bind(details.group_id)
            .bind(&details.color)
            .fetch_one(&mut *tx)
            .await?;

            ids.push(id);
        }

        tx.commit().await?;

        Ok(ids)
    }

    /// Overwrite an existing event; false when it does not exist
    pub async fn update(&self, id: Uuid, details: &EventDetails, slot: &Slot) -> Result<bool> {
        info!("Updating event {}", id);

        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = $1,
                description = $2,
                date = $3,
                start_time = $4,
                end_time = $5,
                capacity = $6,
                group_id = $7,
                color = $8,
                updated_at = NOW()
            WHERE id = $9
            "#,
        )
        .bind(&details.title)
        .bind(&details.description)
        .bind(slot.date)
        .bind(slot.start_time)
        .bind(slot.end_time)
        .bind(details.capacity)
        .bind(details.group_id)
        .bind(&details.color)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete an event; its attendance records go with it
    pub async fn delete(&self, id: Uuid) -> Result<RemovalOutcome> {
        info!("Deleting event {}", id);

        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(RemovalOutcome::from_rows_affected(result.rows_affected()))
    }
}

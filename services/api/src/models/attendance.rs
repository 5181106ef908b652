//! Attendance ledger models

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Result of opting in to an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceOutcome {
    Added,
    AlreadyAttending,
}

/// A user attending an event
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Participant {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
    pub surname: String,
}

impl Participant {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

/// Participation state of the current user for one event
#[derive(Debug, Clone, Serialize)]
pub struct ParticipationResponse {
    pub event_id: Uuid,
    pub participates: bool,
}

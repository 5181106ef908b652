//! API models for request and response payloads

use serde::Serialize;

pub mod attendance;
pub mod event;
pub mod group;
pub mod user;

/// Result of deleting an association or entity by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    NotFound,
}

impl RemovalOutcome {
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows > 0 {
            RemovalOutcome::Removed
        } else {
            RemovalOutcome::NotFound
        }
    }
}

//! User models for the scheduling service

use chrono::{DateTime, Utc};
use common::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User as seen by administrators and member listings
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Administrative edit of a user's profile and role
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub surname: String,
    pub role: Role,
}

//! User model and request payloads

use chrono::{DateTime, Utc};
use common::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity, joined with its role name
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Registration form
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub surname: String,
    pub username: String,
    pub password: String,
    pub confirmation: String,
}

/// Login credentials
#[derive(Debug, Clone, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Password change form
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub password: String,
    pub confirmation: String,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            surname: user.surname,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

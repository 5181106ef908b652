//! Error type for the authentication service

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing, invalid, expired or revoked token
    #[error("Unauthorized")]
    Unauthorized,

    /// Wrong username or password
    #[error("Invalid username and/or password")]
    InvalidCredentials,

    /// Rejected form input
    #[error("{0}")]
    Validation(String),

    /// Username or display name already in use
    #[error("{0}")]
    Conflict(String),

    /// Too many failed logins for this username
    #[error("Too many failed login attempts")]
    RateLimited { retry_after: u64 },

    /// Unexpected fault, already logged
    #[error("Internal server error")]
    InternalServerError,
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        error!("Request failed: {:#}", err);
        AuthError::InternalServerError
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AuthError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AuthError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            AuthError::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "code": code,
            "error": self.to_string(),
        }));

        let mut response = (status, body).into_response();
        if let AuthError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Type alias for authentication results
pub type AuthResult<T> = Result<T, AuthError>;

//! Custom error types for the API service

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::ConstraintViolation;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::roster::RosterError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, invalid or revoked credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not an administrator
    #[error("Administrator access required")]
    Forbidden,

    /// Rejected input
    #[error("{0}")]
    Validation(String),

    /// Unknown or invisible entity
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Unreadable or malformed upload
    #[error("{0}")]
    InvalidFormat(String),

    /// Unexpected fault, already logged
    #[error("Internal server error")]
    InternalServerError,
}

impl ApiError {
    /// Map a constraint violation through `on_violation`; other failures are a 500
    pub fn from_storage(
        err: anyhow::Error,
        on_violation: impl FnOnce(ConstraintViolation) -> ApiError,
    ) -> Self {
        match ConstraintViolation::of(&err) {
            Some(violation) => {
                warn!("Write hit a {:?} violation: {:#}", violation, err);
                on_violation(violation)
            }
            None => err.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!("Request failed: {:#}", err);
        ApiError::InternalServerError
    }
}

impl From<RosterError> for ApiError {
    fn from(err: RosterError) -> Self {
        match err {
            RosterError::InvalidFormat(message) => ApiError::InvalidFormat(message),
            RosterError::Write(e) => {
                error!("Failed to write spreadsheet: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        warn!("Rejected upload: {}", err);
        ApiError::InvalidFormat(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::InvalidFormat(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_FORMAT"),
            ApiError::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = Json(json!({
            "code": code,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ApiError::InvalidFormat("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::InternalServerError,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_anyhow_errors_are_masked() {
        let err: ApiError = anyhow::anyhow!("connection reset by peer").into();
        assert!(matches!(err, ApiError::InternalServerError));
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn test_storage_errors_without_violation_are_masked() {
        let err = ApiError::from_storage(sqlx::Error::RowNotFound.into(), |_| {
            ApiError::Conflict("unused".into())
        });
        assert!(matches!(err, ApiError::InternalServerError));
    }

    #[test]
    fn test_foreign_key_violation_maps_to_caller_error() {
        let err = ApiError::from_storage(
            sqlx::Error::Database(Box::new(ForeignKeyError)).into(),
            |violation| match violation {
                ConstraintViolation::ForeignKey => ApiError::NotFound("Group not found".into()),
                ConstraintViolation::Unique => ApiError::Conflict("duplicate".into()),
            },
        );
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Group not found"));
    }

    #[derive(Debug)]
    struct ForeignKeyError;

    impl std::fmt::Display for ForeignKeyError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("insert or update violates foreign key constraint")
        }
    }

    impl std::error::Error for ForeignKeyError {}

    impl sqlx::error::DatabaseError for ForeignKeyError {
        fn message(&self) -> &str {
            "insert or update violates foreign key constraint"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::ForeignKeyViolation
        }
    }

    #[test]
    fn test_roster_format_errors_keep_their_message() {
        let err: ApiError = RosterError::InvalidFormat("missing column Nif".into()).into();
        assert!(matches!(err, ApiError::InvalidFormat(ref m) if m == "missing column Nif"));
    }
}

//! Custom error types for the common library
//!
//! This module defines the storage-level error type shared by both services.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// True when `err` is a PostgreSQL unique-constraint violation (SQLSTATE 23505).
pub fn is_unique_violation(err: Option<&SqlxError>) -> bool {
    matches!(
        err,
        Some(SqlxError::Database(db)) if db.is_unique_violation()
    )
}

/// True when `err` is a PostgreSQL foreign-key violation (SQLSTATE 23503).
pub fn is_foreign_key_violation(err: Option<&SqlxError>) -> bool {
    matches!(
        err,
        Some(SqlxError::Database(db)) if db.is_foreign_key_violation()
    )
}

/// Integrity constraint a failed statement ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique,
    ForeignKey,
}

impl ConstraintViolation {
    /// Classify a repository failure; `None` for anything but a violation
    pub fn of(err: &anyhow::Error) -> Option<Self> {
        let source = err.downcast_ref::<SqlxError>();
        if is_unique_violation(source) {
            Some(ConstraintViolation::Unique)
        } else if is_foreign_key_violation(source) {
            Some(ConstraintViolation::ForeignKey)
        } else {
            None
        }
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::ErrorKind;
    use std::fmt;

    #[derive(Debug)]
    struct FakeDbError(ErrorKind);

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "constraint violated"
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

        fn kind(&self) -> ErrorKind {
            match self.0 {
                ErrorKind::UniqueViolation => ErrorKind::UniqueViolation,
                ErrorKind::ForeignKeyViolation => ErrorKind::ForeignKeyViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(kind: ErrorKind) -> SqlxError {
        SqlxError::Database(Box::new(FakeDbError(kind)))
    }

    #[test]
    fn test_non_database_errors_are_not_constraint_violations() {
        assert!(!is_foreign_key_violation(Some(&SqlxError::RowNotFound)));
        assert!(!is_unique_violation(None));
        assert_eq!(
            ConstraintViolation::of(&anyhow::anyhow!("connection reset")),
            None
        );
        assert_eq!(
            ConstraintViolation::of(&SqlxError::RowNotFound.into()),
            None
        );
    }

    #[test]
    fn test_constraint_violations_are_classified() {
        assert!(is_unique_violation(Some(&db_error(ErrorKind::UniqueViolation))));
        assert!(is_foreign_key_violation(Some(&db_error(
            ErrorKind::ForeignKeyViolation
        ))));

        let fk: anyhow::Error = db_error(ErrorKind::ForeignKeyViolation).into();
        assert_eq!(
            ConstraintViolation::of(&fk),
            Some(ConstraintViolation::ForeignKey)
        );

        let unique: anyhow::Error = db_error(ErrorKind::UniqueViolation).into();
        assert_eq!(
            ConstraintViolation::of(&unique),
            Some(ConstraintViolation::Unique)
        );

        let check: anyhow::Error = db_error(ErrorKind::CheckViolation).into();
        assert_eq!(ConstraintViolation::of(&check), None);
    }
}

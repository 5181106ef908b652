//! Authentication service models

pub mod user;

// Re-export for convenience
pub use user::{LoginCredentials, PasswordChange, Registration, User, UserResponse};

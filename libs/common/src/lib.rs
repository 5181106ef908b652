//! Common library for the event scheduling and attendance services
//!
//! This crate provides functionality shared by the identity and scheduling
//! services: database connectivity and schema, token revocation storage,
//! credential hashing, session tokens and the role model.

pub mod cache;
pub mod database;
pub mod error;
pub mod jwt;
pub mod password;
pub mod role;
pub mod seed;

pub use role::Role;

/// Example start-up sequence shared by both services
///
/// ```rust,no_run
/// use common::database::{DatabaseConfig, init_pool, run_migrations};
/// use common::seed::{BootstrapAdmin, seed};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::from_env()?;
///     let pool = init_pool(&config).await?;
///     run_migrations(&pool).await?;
///     seed(&pool, None::<&BootstrapAdmin>).await?;
///     Ok(())
/// }
/// ```
pub fn example_usage() {}

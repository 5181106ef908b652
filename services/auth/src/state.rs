//! Application state shared across handlers

use common::{cache::RevocationStore, jwt::JwtService};
use sqlx::PgPool;

use crate::{rate_limiter::LoginThrottle, repositories::UserRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub revocations: RevocationStore,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub login_throttle: LoginThrottle,
}

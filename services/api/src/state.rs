//! Application state shared across handlers

use common::{cache::RevocationStore, jwt::JwtService};
use sqlx::PgPool;

use crate::{
    repositories::{AttendanceRepository, EventRepository, GroupRepository, UserRepository},
    visibility::VisibilityService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub revocations: RevocationStore,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub group_repository: GroupRepository,
    pub event_repository: EventRepository,
    pub attendance_repository: AttendanceRepository,
    pub visibility: VisibilityService,
}

impl AppState {
    pub fn new(db_pool: PgPool, revocations: RevocationStore, jwt_service: JwtService) -> Self {
        let user_repository = UserRepository::new(db_pool.clone());
        let group_repository = GroupRepository::new(db_pool.clone());
        let event_repository = EventRepository::new(db_pool.clone());
        let attendance_repository = AttendanceRepository::new(db_pool.clone());
        let visibility = VisibilityService::new(
            user_repository.clone(),
            group_repository.clone(),
            event_repository.clone(),
            attendance_repository.clone(),
        );

        Self {
            db_pool,
            revocations,
            jwt_service,
            user_repository,
            group_repository,
            event_repository,
            attendance_repository,
            visibility,
        }
    }
}

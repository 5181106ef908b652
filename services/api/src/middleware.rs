//! Session identity for the scheduling routes
//!
//! The access token proves who the caller is; the role is always read back
//! from storage so that a demotion takes effect on the next request.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use common::{Role, jwt::TokenType};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Authenticated caller, inserted into request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
}

impl CurrentUser {
    pub fn require_admin(&self) -> ApiResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Require a valid access token belonging to an existing user
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::Unauthorized)?;

    let claims = state
        .jwt_service
        .authenticate(&state.revocations, bearer.token(), TokenType::Access)
        .await
        .map_err(|e| {
            warn!("Rejected access token: {}", e);
            ApiError::Unauthorized
        })?;

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            warn!("Token presented for deleted user {}", claims.sub);
            ApiError::Unauthorized
        })?;

    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        role: user.role,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin() {
        let admin = CurrentUser {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        let member = CurrentUser {
            id: Uuid::new_v4(),
            role: Role::Member,
        };

        assert!(admin.require_admin().is_ok());
        assert!(matches!(member.require_admin(), Err(ApiError::Forbidden)));
    }
}

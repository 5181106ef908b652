//! Middleware for access token validation

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
use common::jwt::TokenType;
use tracing::warn;

use crate::{error::AuthError, state::AppState};

/// Require a valid, unrevoked access token and expose its claims to handlers
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AuthError::Unauthorized)?;

    let claims = state
        .jwt_service
        .authenticate(&state.revocations, bearer.token(), TokenType::Access)
        .await
        .map_err(|e| {
            warn!("Rejected access token: {}", e);
            AuthError::Unauthorized
        })?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

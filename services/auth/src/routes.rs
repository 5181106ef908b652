//! Authentication service routes

use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use common::{
    database,
    jwt::{Claims, TokenPair, TokenType},
    password,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{AuthError, AuthResult},
    middleware::auth_middleware,
    models::{LoginCredentials, PasswordChange, Registration, UserResponse},
    repositories::RegistrationOutcome,
    state::AppState,
    validation::{validate_password_change, validate_registration},
};

/// Response for token generation
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

impl TokenResponse {
    fn bearer(pair: TokenPair, expires_in: u64) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Request carrying a refresh token
#[derive(Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/auth/password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/logout", post(logout))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = database::health_check(&state.db_pool).await.unwrap_or(false);
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if database { "ok" } else { "degraded" },
            "service": "auth-service",
            "database": database,
        })),
    )
}

/// Register a new member account
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<Registration>,
) -> AuthResult<impl IntoResponse> {
    validate_registration(&form).map_err(AuthError::Validation)?;

    match state.user_repository.register(&form).await? {
        RegistrationOutcome::Created(user) => {
            info!("Registered user {}", user.username);
            Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
        }
        RegistrationOutcome::UsernameTaken => {
            Err(AuthError::Conflict("Username already exists".to_string()))
        }
        RegistrationOutcome::NameTaken => Err(AuthError::Conflict(
            "Name and surname already exist".to_string(),
        )),
    }
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginCredentials>,
) -> AuthResult<impl IntoResponse> {
    let username = credentials.username.trim();
    info!("Login attempt for user: {}", username);

    state
        .login_throttle
        .check(username)
        .await
        .map_err(|retry_after| AuthError::RateLimited {
            retry_after: retry_after.as_secs().max(1),
        })?;

    let user = state.user_repository.find_by_username(username).await?;
    let verified = match &user {
        Some(user) => state
            .user_repository
            .verify_password(user, &credentials.password)?,
        None => password::verify_unknown_user(&credentials.password),
    };

    let Some(user) = user.filter(|_| verified) else {
        warn!("Failed login for user: {}", username);
        state.login_throttle.record_failure(username).await;
        return Err(AuthError::InvalidCredentials);
    };

    state.login_throttle.record_success(username).await;

    let pair = state.jwt_service.issue_pair(user.id, user.role)?;
    let response = TokenResponse::bearer(pair, state.jwt_service.access_token_expiry());

    Ok((StatusCode::OK, Json(response)))
}

/// Refresh token endpoint
///
/// The presented refresh token is revoked and a new pair is issued with the
/// user's current role.
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .authenticate(&state.revocations, &payload.refresh_token, TokenType::Refresh)
        .await
        .map_err(|e| {
            warn!("Rejected refresh token: {}", e);
            AuthError::Unauthorized
        })?;

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    let pair = state
        .jwt_service
        .rotate_refresh_token(&state.revocations, &claims, user.role)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    let response = TokenResponse::bearer(pair, state.jwt_service.access_token_expiry());
    Ok((StatusCode::OK, Json(response)))
}

/// Logout endpoint
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AuthResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .authenticate(&state.revocations, &payload.refresh_token, TokenType::Refresh)
        .await
        .map_err(|_| AuthError::Unauthorized)?;

    if !state.jwt_service.revoke(&state.revocations, &claims).await? {
        return Err(AuthError::Unauthorized);
    }
    info!("User {} logged out", claims.sub);

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Logged out successfully"})),
    ))
}

/// Change the current user's password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(form): Json<PasswordChange>,
) -> AuthResult<impl IntoResponse> {
    validate_password_change(&form).map_err(AuthError::Validation)?;

    if !state
        .user_repository
        .update_password(claims.sub, &form.password)
        .await?
    {
        return Err(AuthError::Unauthorized);
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({"message": "Password changed successfully"})),
    ))
}

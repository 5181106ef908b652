//! JWT service for session token generation, validation, and revocation
//!
//! The identity service issues access and refresh tokens; the scheduling
//! service validates access tokens with the same secret. Refresh tokens are
//! rotated on use and revoked on logout through the [`RevocationStore`].

use anyhow::Result;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{cache::RevocationStore, role::Role};

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret used to sign and verify tokens
    pub secret: String,
    /// Access token expiration time in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: HMAC secret, at least 32 bytes (required)
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 bytes long");
        }

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "900".to_string()) // 15 minutes
            .parse()
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604800);

        Ok(JwtConfig {
            secret,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Role at the time the token was issued
    pub role: Role,
    /// Token ID, used as the revocation key
    pub jti: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

impl Claims {
    /// Seconds left before this token expires on its own
    pub fn remaining_lifetime(&self) -> Result<u64> {
        Ok(self.exp.saturating_sub(now()?))
    }
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Issued token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        }
    }

    fn issue(&self, user_id: Uuid, role: Role, token_type: TokenType) -> Result<String> {
        let now = now()?;
        let lifetime = match token_type {
            TokenType::Access => self.config.access_token_expiry,
            TokenType::Refresh => self.config.refresh_token_expiry,
        };

        let claims = Claims {
            sub: user_id,
            role,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + lifetime,
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Generate an access and refresh token pair for a user
    pub fn issue_pair(&self, user_id: Uuid, role: Role) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(user_id, role, TokenType::Access)?,
            refresh_token: self.issue(user_id, role, TokenType::Refresh)?,
        })
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Validate a token, require the given type and reject revoked tokens
    pub async fn authenticate(
        &self,
        revocations: &RevocationStore,
        token: &str,
        expected: TokenType,
    ) -> Result<Claims> {
        let claims = self.validate_token(token)?;

        if claims.token_type != expected {
            anyhow::bail!("Expected a {:?} token", expected);
        }

        if revocations.is_revoked(claims.jti).await? {
            anyhow::bail!("Token has been revoked");
        }

        Ok(claims)
    }

    /// Revoke a token for the remainder of its lifetime
    ///
    /// Returns false when another request already revoked it.
    pub async fn revoke(&self, revocations: &RevocationStore, claims: &Claims) -> Result<bool> {
        revocations
            .revoke(claims.jti, claims.remaining_lifetime()?)
            .await
    }

    /// Rotate a refresh token
    ///
    /// Revokes the presented refresh token and issues a fresh pair carrying
    /// the caller's current role. `None` means the token was already used.
    pub async fn rotate_refresh_token(
        &self,
        revocations: &RevocationStore,
        claims: &Claims,
        role: Role,
    ) -> Result<Option<TokenPair>> {
        if claims.token_type != TokenType::Refresh {
            anyhow::bail!("Token is not a refresh token");
        }

        if !self.revoke(revocations, claims).await? {
            warn!("Refresh token {} was already used", claims.jti);
            return Ok(None);
        }
        info!("Rotated refresh token for user {}", claims.sub);

        self.issue_pair(claims.sub, role).map(Some)
    }

    /// Get the access token expiry time
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Get the refresh token expiry time
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}

fn now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

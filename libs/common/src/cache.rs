//! Redis-backed token revocation store
//!
//! Logged-out and rotated refresh tokens are recorded here until they would
//! have expired anyway, so both services can reject them.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::info;
use uuid::Uuid;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Revocation list keyed by token id
#[derive(Clone)]
pub struct RevocationStore {
    client: Client,
}

impl RevocationStore {
    /// Open a client for the configured Redis instance
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RevocationStore { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    /// Mark a token id as revoked for `ttl_seconds`
    ///
    /// Returns false when the token id was already revoked. The check and the
    /// write are one `SET NX`.
    pub async fn revoke(&self, token_id: Uuid, ttl_seconds: u64) -> Result<bool> {
        let mut conn = self.connection().await?;
        let set: Option<String> = redis::cmd("SET")
            .arg(revocation_key(token_id))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async(&mut conn)
            .await?;
        Ok(set.is_some())
    }

    /// Check whether a token id has been revoked
    pub async fn is_revoked(&self, token_id: Uuid) -> Result<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = conn.exists(revocation_key(token_id)).await?;
        Ok(exists)
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

fn revocation_key(token_id: Uuid) -> String {
    format!("revoked_token:{}", token_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_revocation_key_is_namespaced() {
        let id = Uuid::nil();
        assert_eq!(
            revocation_key(id),
            "revoked_token:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    #[serial]
    fn test_redis_config_default_url() {
        unsafe {
            std::env::remove_var("REDIS_URL");
        }
        let config = RedisConfig::from_env().unwrap();
        assert_eq!(config.url, "redis://localhost:6379");
    }

    #[test]
    fn test_store_rejects_malformed_url() {
        let config = RedisConfig {
            url: "not a url".to_string(),
        };
        assert!(RevocationStore::new(&config).is_err());
    }
}

//! Service configuration
//!
//! Same layering as the authentication service: defaults, then an optional
//! `config/api.toml`, then `SCHEDULER__*` environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Largest accepted spreadsheet upload, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub import: ImportConfig,
}

impl ServiceConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("import.max_upload_bytes", 5 * 1024 * 1024)?
            .add_source(File::with_name("config/api").required(false))
            .add_source(Environment::with_prefix("SCHEDULER").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        unsafe {
            std::env::remove_var("SCHEDULER__SERVER__PORT");
            std::env::remove_var("SCHEDULER__IMPORT__MAX_UPLOAD_BYTES");
        }

        let config = ServiceConfig::load().unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3001");
        assert_eq!(config.import.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_defaults() {
        unsafe {
            std::env::set_var("SCHEDULER__SERVER__PORT", "8081");
            std::env::set_var("SCHEDULER__IMPORT__MAX_UPLOAD_BYTES", "1024");
        }

        let config = ServiceConfig::load().unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.import.max_upload_bytes, 1024);

        unsafe {
            std::env::remove_var("SCHEDULER__SERVER__PORT");
            std::env::remove_var("SCHEDULER__IMPORT__MAX_UPLOAD_BYTES");
        }
    }
}

//! Service configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `config/auth.toml`, then `SCHEDULER__*` environment variables
//! (e.g. `SCHEDULER__BOOTSTRAP__ADMIN_PASSWORD`).

use common::seed::BootstrapAdmin;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BootstrapConfig {
    pub admin_username: String,
    pub admin_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginThrottleConfig {
    pub max_attempts: u32,
    pub window_seconds: u64,
    pub lockout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub bootstrap: BootstrapConfig,
    pub login_throttle: LoginThrottleConfig,
}

impl ServiceConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("bootstrap.admin_username", "admin")?
            .set_default("login_throttle.max_attempts", 5)?
            .set_default("login_throttle.window_seconds", 300)?
            .set_default("login_throttle.lockout_seconds", 3600)?
            .add_source(File::with_name("config/auth").required(false))
            .add_source(Environment::with_prefix("SCHEDULER").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// The bootstrap administrator, when a password has been configured
    pub fn bootstrap_admin(&self) -> Option<BootstrapAdmin> {
        self.bootstrap
            .admin_password
            .as_ref()
            .filter(|password| !password.is_empty())
            .map(|password| BootstrapAdmin {
                username: self.bootstrap.admin_username.clone(),
                password: password.clone(),
            })
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
            std::env::remove_var("SCHEDULER__BOOTSTRAP__ADMIN_PASSWORD");
            std::env::remove_var("SCHEDULER__SERVER__PORT");
        }

        let config = ServiceConfig::load().unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.login_throttle.max_attempts, 5);
        assert!(config.bootstrap_admin().is_none());
    }

    #[test]
    #[serial]
    fn test_environment_overrides_defaults() {
        unsafe {
            std::env::set_var("SCHEDULER__SERVER__PORT", "4000");
            std::env::set_var("SCHEDULER__BOOTSTRAP__ADMIN_PASSWORD", "Adm1n!password");
        }

        let config = ServiceConfig::load().unwrap();
        assert_eq!(config.server.port, 4000);
        let admin = config.bootstrap_admin().unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.password, "Adm1n!password");

        unsafe {
            std::env::remove_var("SCHEDULER__SERVER__PORT");
            std::env::remove_var("SCHEDULER__BOOTSTRAP__ADMIN_PASSWORD");
        }
    }
}

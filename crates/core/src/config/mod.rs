//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (VENDAVOA_*)
//! 2. TOML config file (if VENDAVOA_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (VENDAVOA_*)
/// 2. TOML config file (if VENDAVOA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via VENDAVOA_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Active cache generation tag. Baked in at deployment; bumping it on
    /// a new release makes activation evict every older generation.
    ///
    /// Set via VENDAVOA_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin of the dealership application the worker fronts. Manifest
    /// paths and relative request paths resolve against it.
    ///
    /// Set via VENDAVOA_APP_ORIGIN environment variable.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// User-Agent string for outgoing requests.
    ///
    /// Set via VENDAVOA_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional network timeout in milliseconds. The source worker never
    /// timed out a hanging request, so the default stays None; deployments
    /// can opt in.
    ///
    /// Set via VENDAVOA_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Gateway listen host.
    ///
    /// Set via VENDAVOA_LISTEN_HOST environment variable.
    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    /// Gateway listen port.
    ///
    /// Set via VENDAVOA_LISTEN_PORT environment variable.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./vendavoa-cache.sqlite")
}

fn default_cache_version() -> String {
    "vendavoa-v1".into()
}

fn default_app_origin() -> String {
    "http://127.0.0.1:8000".into()
}

fn default_user_agent() -> String {
    "vendavoa-worker/0.1".into()
}

fn default_listen_host() -> String {
    "127.0.0.1".into()
}

fn default_listen_port() -> u16 {
    8080
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_version: default_cache_version(),
            app_origin: default_app_origin(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `VENDAVOA_`
    /// 2. TOML file from `VENDAVOA_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("VENDAVOA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("VENDAVOA_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./vendavoa-cache.sqlite"));
        assert_eq!(config.cache_version, "vendavoa-v1");
        assert_eq!(config.app_origin, "http://127.0.0.1:8000");
        assert_eq!(config.user_agent, "vendavoa-worker/0.1");
        assert!(config.timeout_ms.is_none());
        assert_eq!(config.listen_host, "127.0.0.1");
        assert_eq!(config.listen_port, 8080);
    }

    #[test]
    fn test_no_timeout_by_default() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig { timeout_ms: Some(20_000), ..Default::default() };
        assert_eq!(config.timeout(), Some(Duration::from_millis(20_000)));
    }
}

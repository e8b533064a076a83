//! Configuration management.
//!
//! The configuration file is JSON with three sections:
//!
//! ```json
//! {
//!   "general": { "log_level": "info", "session_log_path": null },
//!   "provider": { "base_url": "https://app.fiscozen.it", "timeout_secs": 30 },
//!   "server": { "bind": "127.0.0.1:3001" }
//! }
//! ```
//!
//! Every field is optional. `FISCOZEN_BASE_URL` and `BACKEND_PORT` override
//! the file when set.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fiscorelay_providers::fiscozen::{
    FiscozenSettings, DEFAULT_BASE_URL, DEFAULT_LANDING_PATHS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_config_path, default_session_log_path, load_json, save_json};

/// Environment variable overriding `provider.base_url`.
pub const BASE_URL_ENV: &str = "FISCOZEN_BASE_URL";

/// Environment variable overriding the port of `server.bind`.
pub const PORT_ENV: &str = "BACKEND_PORT";

// ============================================================================
// Sections
// ============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Provider connection settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Session log database; the data directory when unset.
    #[serde(default)]
    pub session_log_path: Option<PathBuf>,
}

/// Provider connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Landing pages probed for the CSRF cookie, in order.
    #[serde(default = "default_landing_paths")]
    pub landing_paths: Vec<String>,
    /// User-Agent header; the built-in browser string when unset.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Accept-Language header; Italian first when unset.
    #[serde(default)]
    pub accept_language: Option<String>,
    /// Transport timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Session lifetime in hours.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Attempts per landing candidate on transient failures.
    #[serde(default = "default_landing_retry_attempts")]
    pub landing_retry_attempts: u32,
    /// Base backoff between landing attempts, in milliseconds.
    #[serde(default = "default_landing_retry_base_ms")]
    pub landing_retry_base_ms: u64,
    /// Deadline for one workflow step, in seconds.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    /// VIES check service URL.
    #[serde(default)]
    pub vies_url: Option<String>,
    /// Postal code lookup base URL.
    #[serde(default)]
    pub location_url: Option<String>,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Browser origins allowed by CORS; any origin when empty.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_landing_paths() -> Vec<String> {
    DEFAULT_LANDING_PATHS.iter().map(ToString::to_string).collect()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_session_ttl_hours() -> i64 {
    fiscorelay_core::DEFAULT_SESSION_TTL_HOURS
}

fn default_landing_retry_attempts() -> u32 {
    1
}

fn default_landing_retry_base_ms() -> u64 {
    250
}

fn default_step_timeout_secs() -> u64 {
    60
}

fn default_bind() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    ["http://localhost:3000", "http://localhost:5173", "http://localhost:5174"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            session_log_path: None,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            landing_paths: default_landing_paths(),
            user_agent: None,
            accept_language: None,
            timeout_secs: default_timeout_secs(),
            session_ttl_hours: default_session_ttl_hours(),
            landing_retry_attempts: default_landing_retry_attempts(),
            landing_retry_base_ms: default_landing_retry_base_ms(),
            step_timeout_secs: default_step_timeout_secs(),
            vies_url: None,
            location_url: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

// ============================================================================
// Loading and Saving
// ============================================================================

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path.
    pub async fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path()).await
    }

    /// Loads configuration from a specific path. A missing file yields
    /// the defaults.
    pub async fn load_from(path: &Path) -> Result<Self, StoreError> {
        match load_json(path).await {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Saves configuration to a specific path.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    // ========================================================================
    // Environment
    // ========================================================================

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, StoreError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StoreError> {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            debug!(base_url = %base_url, "Provider base URL overridden from environment");
            self.provider.base_url = base_url.trim().to_string();
        }

        if let Some(port) = lookup(PORT_ENV).filter(|v| !v.trim().is_empty()) {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| StoreError::Config(format!("{PORT_ENV} is not a port: {port}")))?;
            let mut addr = self.bind_addr()?;
            addr.set_port(port);
            self.server.bind = addr.to_string();
        }

        Ok(self)
    }

    // ========================================================================
    // Derived Values
    // ========================================================================

    /// Returns the server listen address.
    pub fn bind_addr(&self) -> Result<SocketAddr, StoreError> {
        self.server
            .bind
            .parse()
            .map_err(|_| StoreError::Config(format!("Invalid bind address: {}", self.server.bind)))
    }

    /// Returns the session log database path.
    pub fn session_log_path(&self) -> PathBuf {
        self.general
            .session_log_path
            .clone()
            .unwrap_or_else(default_session_log_path)
    }

    /// Converts the provider section into workflow settings.
    pub fn to_settings(&self) -> FiscozenSettings {
        let provider = &self.provider;
        let mut settings = FiscozenSettings::new(provider.base_url.as_str());

        if !provider.landing_paths.is_empty() {
            settings.landing_paths.clone_from(&provider.landing_paths);
        }
        if let Some(user_agent) = &provider.user_agent {
            settings.user_agent.clone_from(user_agent);
        }
        if let Some(accept_language) = &provider.accept_language {
            settings.accept_language.clone_from(accept_language);
        }
        if let Some(vies_url) = &provider.vies_url {
            settings.vies_url.clone_from(vies_url);
        }
        if let Some(location_url) = &provider.location_url {
            settings.location_url.clone_from(location_url);
        }

        settings.timeout = Duration::from_secs(provider.timeout_secs);
        settings.session_ttl = chrono::Duration::hours(provider.session_ttl_hours);
        settings.landing_retry_attempts = provider.landing_retry_attempts.max(1);
        settings.landing_retry_base = Duration::from_millis(provider.landing_retry_base_ms);
        settings.step_timeout = Duration::from_secs(provider.step_timeout_secs);
        settings
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.provider.base_url, "https://app.fiscozen.it");
        assert_eq!(config.provider.landing_paths.len(), 4);
        assert_eq!(config.server.bind, "127.0.0.1:3001");
        assert!(config
            .server
            .allowed_origins
            .contains(&"http://localhost:5173".to_string()));
        assert!(config.session_log_path().ends_with("fiscorelay/sessions.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"provider":{"timeout_secs":5}}"#).unwrap();
        assert_eq!(config.provider.timeout_secs, 5);
        assert_eq!(config.provider.step_timeout_secs, 60);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_overrides_from(env(&[
                (BASE_URL_ENV, "http://localhost:9000/"),
                (PORT_ENV, "4000"),
            ]))
            .unwrap();
        assert_eq!(config.provider.base_url, "http://localhost:9000/");
        assert_eq!(config.server.bind, "127.0.0.1:4000");
        assert_eq!(config.to_settings().base_url, "http://localhost:9000");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let err = Config::default()
            .with_overrides_from(env(&[(PORT_ENV, "http")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_empty_overrides_are_ignored() {
        let config = Config::default()
            .with_overrides_from(env(&[(BASE_URL_ENV, " ")]))
            .unwrap();
        assert_eq!(config.provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_to_settings() {
        let mut config = Config::default();
        config.provider.timeout_secs = 7;
        config.provider.session_ttl_hours = 2;
        config.provider.landing_retry_attempts = 0;
        config.provider.step_timeout_secs = 15;
        config.provider.location_url = Some("http://zip.local/IT".to_string());

        let settings = config.to_settings();
        assert_eq!(settings.timeout, Duration::from_secs(7));
        assert_eq!(settings.session_ttl, chrono::Duration::hours(2));
        assert_eq!(settings.landing_retry_attempts, 1);
        assert_eq!(settings.step_timeout, Duration::from_secs(15));
        assert_eq!(settings.location_url, "http://zip.local/IT");
        assert_eq!(settings.landing_paths[0], "/");
    }
}

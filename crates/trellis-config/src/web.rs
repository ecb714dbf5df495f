//! HTTP server and live endpoint settings.

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// Web server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Directory served under `/static`, next to the embedded client script.
    pub static_dir: Option<String>,
    /// Locale for requests that do not name one.
    pub default_locale: String,
    pub max_body_size_mb: usize,
    /// Allowed CORS origins. Empty disables the CORS layer.
    pub cors_origins: Vec<String>,
    pub live: LiveConfig,
}

/// Live session endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub enabled: bool,
    /// Websocket route.
    pub path: String,
    /// Element whose content live navigation replaces.
    pub mount_selector: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8100,
            static_dir: None,
            default_locale: "en".to_string(),
            max_body_size_mb: 10,
            cors_origins: Vec::new(),
            live: LiveConfig::default(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/live".to_string(),
            mount_selector: "#app".to_string(),
        }
    }
}

impl WebConfig {
    /// `host:port` as passed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_body_size_bytes(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", &self.host));
        }
        if self.max_body_size_mb == 0 {
            return Err(ConfigError::invalid("max_body_size_mb", self.max_body_size_mb));
        }
        if self.default_locale.trim().is_empty() {
            return Err(ConfigError::invalid("default_locale", &self.default_locale));
        }
        self.live.validate()
    }
}

impl LiveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.path.starts_with('/') {
            return Err(ConfigError::invalid("live.path", &self.path));
        }
        if self.mount_selector.trim().is_empty() {
            return Err(ConfigError::invalid("live.mount_selector", &self.mount_selector));
        }
        Ok(())
    }
}

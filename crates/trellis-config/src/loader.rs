//! Loading configuration from TOML files and the environment.

use crate::{ConfigError, WebConfig};
use std::path::{Path, PathBuf};

/// Overrides `WebConfig::host`.
pub const ENV_HOST: &str = "TRELLIS_HOST";
/// Overrides `WebConfig::port`.
pub const ENV_PORT: &str = "TRELLIS_PORT";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, apply environment overrides and validate.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<WebConfig, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!("Loaded configuration from {}", path.display());

        let mut config = Self::load_from_str(&content)?;
        Self::apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_str(content: &str) -> Result<WebConfig, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, else from the default location when that file
    /// exists, else start from defaults.
    pub async fn load(path: Option<&Path>) -> Result<WebConfig, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path).await;
        }
        if let Some(default) = Self::default_path() {
            if tokio::fs::try_exists(&default).await.unwrap_or(false) {
                return Self::load_from_file(default).await;
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        let mut config = WebConfig::default();
        Self::apply_env_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// `~/.config/trellis/config.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("trellis").join("config.toml"))
    }

    /// Apply `TRELLIS_HOST` and `TRELLIS_PORT`. An unparsable port is
    /// ignored with a warning.
    pub fn apply_env_overrides(config: &mut WebConfig) {
        if let Ok(host) = std::env::var(ENV_HOST) {
            if !host.trim().is_empty() {
                config.host = host;
            }
        }
        if let Ok(port) = std::env::var(ENV_PORT) {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(e) => tracing::warn!("Ignoring {}={}: {}", ENV_PORT, port, e),
            }
        }
    }
}

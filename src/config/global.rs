//! Global configuration management for credo.
//!
//! User-wide settings live in `~/.credo/config.toml` (`%LOCALAPPDATA%\credo\config.toml`
//! on Windows). The location can be overridden with `--config` or the
//! `CREDO_CONFIG` environment variable. A missing file means defaults.
//!
//! # File Format
//!
//! ```toml
//! # Where memoized resolutions are kept between runs
//! cache_dir = "/var/cache/credo"
//!
//! # Timeout for apt-get / apt-cache invocations, in seconds
//! command_timeout_secs = 600
//!
//! # Print optional dependencies found while resolving
//! show_suggestions = true
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::constants::{CONFIG_ENV_VAR, DEFAULT_COMMAND_TIMEOUT};
use crate::core::CredoError;

const fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT.as_secs()
}

const fn default_show_suggestions() -> bool {
    true
}

/// User-wide credo settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Directory of the durable spell cache. Defaults to the platform cache
    /// directory (`~/.cache/credo` on Linux).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Timeout for external package-manager commands, in seconds.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Print suggestions collected while resolving.
    #[serde(default = "default_show_suggestions")]
    pub show_suggestions: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            command_timeout_secs: default_command_timeout_secs(),
            show_suggestions: default_show_suggestions(),
        }
    }
}

impl GlobalConfig {
    /// Load from `CREDO_CONFIG` if set, otherwise from the default location.
    ///
    /// A missing file yields the default configuration.
    pub async fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from);
        Self::load_with_optional(explicit).await
    }

    /// Load from `path` when given, otherwise from the default location.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No global config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| CredoError::ConfigError {
                message: format!("{}: {}", path.display(), e.message()),
            })
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Write to a specific file, creating parent directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))
    }

    /// Platform default location of the config file.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("credo")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".credo")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Directory of the durable spell cache.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        Ok(dirs::cache_dir()
            .ok_or_else(|| CredoError::ConfigError {
                message: "Unable to determine cache directory; set cache_dir in the global config"
                    .to_string(),
            })?
            .join("credo"))
    }

    /// External command timeout; `0` disables it.
    #[must_use]
    pub const fn command_timeout(&self) -> Option<Duration> {
        if self.command_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.command_timeout_secs))
        }
    }
}

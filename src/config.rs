//! Configuration for the PVL source engine
//!
//! Configuration is stored at `~/.config/pvl-source/config.toml`. The kit
//! override path can also be set through the `PVL_KIT_FILE` environment
//! variable, which takes precedence over the file.

use crate::error::{PvlResult, PvlSourceError};
use crate::freshness::FreshnessPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Environment variable naming an operator-trusted kit file
pub const KIT_FILE_ENV: &str = "PVL_KIT_FILE";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PvlConfig {
    /// Engine settings
    pub source: SourceConfig,

    /// Kit server settings
    pub server: ServerConfig,
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Operator-trusted kit file. When set, its contents are returned
    /// verbatim and every anchor, freshness and hash check is bypassed.
    pub kit_override_path: Option<PathBuf>,

    /// Anchor age in seconds after which a refresh is attempted
    pub should_refresh_secs: u64,

    /// Anchor age in seconds at which the anchor is rejected outright
    pub require_refresh_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kit_override_path: None,
            should_refresh_secs: 60 * 60,
            require_refresh_secs: 24 * 60 * 60,
        }
    }
}

/// Kit server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Endpoint serving kit documents by hash. Must be set by the host
    /// application when the shipped HTTP fetcher is used.
    pub endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
        }
    }
}

impl PvlConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pvl-source")
            .join("config.toml")
    }

    /// Load configuration from a file, falling back to defaults when the
    /// file does not exist.
    pub async fn load(path: &Path) -> PvlResult<Self> {
        if !path.exists() {
            debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PvlSourceError::io(format!("reading config {}", path.display()), e))?;
        let config: Self = toml::from_str(&content).map_err(|e| PvlSourceError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// The effective kit override path: environment first, then config.
    pub fn kit_override(&self) -> Option<PathBuf> {
        self.kit_override_from(std::env::var_os(KIT_FILE_ENV).map(PathBuf::from))
    }

    fn kit_override_from(&self, env_path: Option<PathBuf>) -> Option<PathBuf> {
        env_path.or_else(|| self.source.kit_override_path.clone())
    }

    /// Freshness policy built from the configured thresholds
    pub fn freshness_policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(
            Duration::from_secs(self.source.should_refresh_secs),
            Duration::from_secs(self.source.require_refresh_secs),
        )
    }
}

//! Configuration management for remcache

pub mod schema;

pub use schema::{CacheConfig, Config, GeneralConfig, PrefetchConfig, RpcConfig, WatchConfig};

use crate::error::{RemcacheError, RemcacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Locates, loads and saves the remcache config file.
///
/// The default location may be missing, in which case defaults apply. A
/// location named explicitly with `--config` or `REMCACHE_CONFIG` must
/// exist for [`load`](Self::load), since a typo there would otherwise run
/// silently with defaults.
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigManager {
    /// Manager for the default location
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            explicit: false,
        }
    }

    /// Manager for an explicitly chosen file
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            explicit: true,
        }
    }

    /// Manager for an optional override, as given on the command line
    pub fn from_override(path: Option<PathBuf>) -> Self {
        path.map_or_else(Self::new, Self::with_path)
    }

    /// `<config_dir>/remcache/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("remcache")
            .join("config.toml")
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Load configuration.
    ///
    /// A missing default file yields defaults; a missing explicit file is
    /// [`RemcacheError::ConfigNotFound`].
    pub async fn load(&self) -> RemcacheResult<Config> {
        if !self.config_path.exists() && self.explicit {
            return Err(RemcacheError::ConfigNotFound(self.config_path.clone()));
        }
        self.load_or_default().await
    }

    /// Load configuration, using defaults whenever the file is missing
    pub async fn load_or_default(&self) -> RemcacheResult<Config> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load and validate configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> RemcacheResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| RemcacheError::io(format!("reading config from {}", path.display()), e))?;

        let invalid = |reason: String| RemcacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let config: Config = toml::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        if !matches!(config.general.log_format.as_str(), "text" | "json") {
            return Err(invalid(format!(
                "general.log_format must be \"text\" or \"json\", got {:?}",
                config.general.log_format
            )));
        }
        if config.prefetch.metadata_dir.is_empty() {
            return Err(invalid("prefetch.metadata_dir must not be empty".to_string()));
        }

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> RemcacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            RemcacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!(path = %self.config_path.display(), "Configuration saved");
        Ok(())
    }

    async fn ensure_config_dir(&self) -> RemcacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RemcacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration schema for remcache
//!
//! Configuration is stored at `~/.config/remcache/config.toml`

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// TTL cache settings
    pub cache: CacheConfig,

    /// Watch registration settings
    pub watch: WatchConfig,

    /// Prefetch batch settings
    pub prefetch: PrefetchConfig,

    /// RPC call settings
    pub rpc: RpcConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Bounded TTL cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds (0 = never expire)
    #[serde(alias = "ttlSeconds")]
    pub ttl_seconds: u64,

    /// Maximum entries per cache (0 = unbounded)
    #[serde(alias = "maxEntries")]
    pub max_entries: usize,
}

impl CacheConfig {
    /// Entry lifetime, `None` when expiry is disabled
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_seconds > 0).then(|| Duration::from_secs(self.ttl_seconds))
    }

    /// Size bound, `None` when bounding is disabled
    pub fn max_size(&self) -> Option<usize> {
        (self.max_entries > 0).then_some(self.max_entries)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            max_entries: 10_000,
        }
    }
}

/// Watch registration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Log every notification and registration at info level
    #[serde(alias = "debugLogging")]
    pub debug_logging: bool,

    /// Register the resolved project root after a prefetch
    pub auto_register: bool,

    /// Request recursive watches from the server
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            auto_register: true,
            recursive: true,
        }
    }
}

/// Prefetch batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Enable batched prefetch on render
    pub enabled: bool,

    /// Repository metadata directory the state-file probes live under
    pub metadata_dir: String,

    /// Marker names looked up by the ancestor scan
    pub ancestor_markers: Vec<String>,

    /// How many parent directories the ancestor scan may climb
    pub ancestor_max_depth: u32,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metadata_dir: ".git".to_string(),
            ancestor_markers: [
                ".git",
                ".hg",
                ".svn",
                ".bzr",
                "_darcs",
                ".projectile",
                ".dir-locals.el",
                ".editorconfig",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
            ancestor_max_depth: 32,
        }
    }
}

/// RPC call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-call timeout in seconds (0 = wait forever)
    pub timeout_secs: u64,
}

impl RpcConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[watch]"));
        assert!(toml.contains("ttl_seconds = 300"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.cache.max_size(), Some(10_000));
        assert!(!config.watch.debug_logging);
    }

    #[test]
    fn config_accepts_camel_case_aliases() {
        let toml = r#"
            [cache]
            ttlSeconds = 60
            maxEntries = 5

            [watch]
            debugLogging = true
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.cache.max_entries, 5);
        assert!(config.watch.debug_logging);
        assert_eq!(config.prefetch.metadata_dir, ".git"); // default preserved
    }

    #[test]
    fn zero_disables_expiry_and_bounding() {
        let toml = r#"
            [cache]
            ttl_seconds = 0
            max_entries = 0

            [rpc]
            timeout_secs = 0
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.cache.ttl().is_none());
        assert!(config.cache.max_size().is_none());
        assert!(config.rpc.timeout().is_none());
    }
}

//! Long-lived filesystem fact caches
//!
//! Existence and truename facts keyed by absolute remote path. Both caches
//! share the configured TTL and size bound and are invalidated together.

use super::bounded::{BoundedCache, CacheStats};
use super::lock;
use crate::config::schema::CacheConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Statistics for both fact caches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub existence: CacheStats,
    pub existence_len: usize,
    pub truename: CacheStats,
    pub truename_len: usize,
}

/// Existence and truename caches for one connection
pub struct CacheStore {
    existence: Mutex<BoundedCache<PathBuf, bool>>,
    truename: Mutex<BoundedCache<PathBuf, PathBuf>>,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            existence: Mutex::new(BoundedCache::new(config.ttl(), config.max_size())),
            truename: Mutex::new(BoundedCache::new(config.ttl(), config.max_size())),
        }
    }

    /// Cached existence of `path`, if known
    pub fn exists(&self, path: &Path) -> Option<bool> {
        lock(&self.existence).get(path)
    }

    pub fn record_exists(&self, path: impl Into<PathBuf>, exists: bool) {
        lock(&self.existence).put(path.into(), exists);
    }

    /// Cached canonical path of `path`, if known
    pub fn truename(&self, path: &Path) -> Option<PathBuf> {
        lock(&self.truename).get(path)
    }

    pub fn record_truename(&self, path: impl Into<PathBuf>, resolved: impl Into<PathBuf>) {
        lock(&self.truename).put(path.into(), resolved.into());
    }

    /// Drop every fact about `path` and about its parent directory
    pub fn invalidate_path(&self, path: &Path) {
        let parent = path.parent();

        let mut existence = lock(&self.existence);
        existence.invalidate(path);
        if let Some(parent) = parent {
            existence.invalidate(parent);
        }
        drop(existence);

        let mut truename = lock(&self.truename);
        truename.invalidate(path);
        if let Some(parent) = parent {
            truename.invalidate(parent);
        }
    }

    /// Clear both caches
    pub fn flush(&self) {
        lock(&self.existence).clear();
        lock(&self.truename).clear();
        debug!("Flushed existence and truename caches");
    }

    pub fn stats(&self) -> StoreStats {
        let existence = lock(&self.existence);
        let truename = lock(&self.truename);
        StoreStats {
            existence: existence.stats(),
            existence_len: existence.len(),
            truename: truename.stats(),
            truename_len: truename.len(),
        }
    }
}

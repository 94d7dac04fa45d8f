//! Size- and TTL-bounded key/value cache
//!
//! Entries expire lazily: an expired entry is dropped the next time it is
//! looked up, or when an insert needs room. There are no background timers.
//!
//! # Eviction
//!
//! When an insert of a new key would exceed `max_size`, expired entries are
//! purged first. If the cache is still full, the oldest 25% of entries by
//! insertion time are evicted before the insert happens, so the bound holds
//! strictly after every `put`.

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A cached value with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub inserted_at: Instant,
    pub value: V,
}

impl<V> CacheEntry<V> {
    /// An entry is valid while `now - inserted_at <= ttl`
    pub fn is_expired(&self, now: Instant, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| now.saturating_duration_since(self.inserted_at) > ttl)
    }
}

/// Counters for one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub invalidations: u64,
}

/// Mapping from key to timestamped value with optional TTL and size bound
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Option<Duration>,
    max_size: Option<usize>,
    stats: CacheStats,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache. `None` disables expiry or bounding respectively.
    pub fn new(ttl: Option<Duration>, max_size: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_size: max_size.filter(|max| *max > 0),
            stats: CacheStats::default(),
        }
    }

    /// Cache with neither expiry nor bound
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`, removing it if it has expired
    pub fn get_at<Q>(&mut self, key: &Q, now: Instant) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now, self.ttl),
        };

        if expired {
            self.entries.remove(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }

        self.stats.hits += 1;
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn put(&mut self, key: K, value: V) {
        self.put_at(key, value, Instant::now());
    }

    /// Insert `value`, making room first if the key is new and the cache is full
    pub fn put_at(&mut self, key: K, value: V, now: Instant) {
        if let Some(max) = self.max_size {
            if !self.entries.contains_key(&key) && self.entries.len() >= max {
                self.purge_expired(now);
                if self.entries.len() >= max {
                    self.evict_oldest(self.entries.len().div_ceil(4));
                }
            }
        }

        self.entries.insert(
            key,
            CacheEntry {
                inserted_at: now,
                value,
            },
        );
        self.stats.inserts += 1;
    }

    /// Remove `key`. Returns whether an entry was present.
    pub fn invalidate<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.invalidations += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        self.stats.invalidations += self.entries.len() as u64;
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet collected
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    fn purge_expired(&mut self, now: Instant) {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, ttl));
        self.stats.expirations += (before - self.entries.len()) as u64;
    }

    fn evict_oldest(&mut self, count: usize) {
        let mut by_age: Vec<(Instant, K)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.inserted_at, key.clone()))
            .collect();
        by_age.sort_by_key(|(inserted_at, _)| *inserted_at);

        for (_, key) in by_age.into_iter().take(count.max(1)) {
            self.entries.remove(&key);
            self.stats.evictions += 1;
        }
    }
}

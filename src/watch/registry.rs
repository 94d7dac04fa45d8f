//! Local belief about which remote paths have change subscriptions
//!
//! Membership means a `watch.add` for that key succeeded at some point.
//! Absence proves nothing: a path may still be watched server-side, and a
//! redundant `watch.add` is harmless. A present-but-dead entry only costs
//! missed invalidations until the TTL catches up.

use crate::cache::lock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Opaque identity of one connection to a remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// One subscription: a path on a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchKey {
    pub connection: ConnectionId,
    pub path: PathBuf,
}

impl WatchKey {
    pub fn new(connection: ConnectionId, path: impl Into<PathBuf>) -> Self {
        Self {
            connection,
            path: path.into(),
        }
    }
}

/// A registered watch and when it was registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub path: PathBuf,
    pub registered_at: DateTime<Utc>,
}

/// Set of watch keys, shareable across connections
#[derive(Debug, Default)]
pub struct WatchRegistry {
    entries: Mutex<HashMap<WatchKey, DateTime<Utc>>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_watched(&self, connection: ConnectionId, path: &Path) -> bool {
        lock(&self.entries).contains_key(&WatchKey::new(connection, path))
    }

    /// Record a watch. Returns `false` if it was already registered.
    pub fn register(&self, connection: ConnectionId, path: impl Into<PathBuf>) -> bool {
        let key = WatchKey::new(connection, path);
        let mut entries = lock(&self.entries);
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, Utc::now());
        true
    }

    /// Forget a watch. Returns `false` if it was not registered.
    pub fn unregister(&self, connection: ConnectionId, path: &Path) -> bool {
        lock(&self.entries)
            .remove(&WatchKey::new(connection, path))
            .is_some()
    }

    /// Drop every entry for a torn-down connection, returning how many were removed
    pub fn clear_for_connection(&self, connection: ConnectionId) -> usize {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, _| key.connection != connection);
        before - entries.len()
    }

    /// Replace the belief for `connection` with exactly `paths`
    pub fn replace_for_connection(
        &self,
        connection: ConnectionId,
        paths: impl IntoIterator<Item = PathBuf>,
    ) {
        let now = Utc::now();
        let mut entries = lock(&self.entries);
        let mut kept: HashMap<PathBuf, DateTime<Utc>> = HashMap::new();
        entries.retain(|key, registered_at| {
            if key.connection != connection {
                return true;
            }
            kept.insert(key.path.clone(), *registered_at);
            false
        });
        for path in paths {
            let registered_at = kept.get(&path).copied().unwrap_or(now);
            entries.insert(WatchKey::new(connection, path), registered_at);
        }
    }

    /// Watches registered for `connection`, oldest first
    pub fn entries_for(&self, connection: ConnectionId) -> Vec<WatchEntry> {
        let mut list: Vec<WatchEntry> = lock(&self.entries)
            .iter()
            .filter(|(key, _)| key.connection == connection)
            .map(|(key, registered_at)| WatchEntry {
                path: key.path.clone(),
                registered_at: *registered_at,
            })
            .collect();
        list.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.path.cmp(&b.path))
        });
        list
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let registry = WatchRegistry::new();
        let conn = ConnectionId::new();

        assert!(registry.register(conn, "/repo"));
        assert!(!registry.register(conn, "/repo"));
        assert!(!registry.register(conn, "/repo/"));

        assert_eq!(registry.len(), 1);
        assert!(registry.is_watched(conn, Path::new("/repo")));
    }

    #[test]
    fn keys_are_per_connection() {
        let registry = WatchRegistry::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();

        registry.register(a, "/repo");

        assert!(registry.is_watched(a, Path::new("/repo")));
        assert!(!registry.is_watched(b, Path::new("/repo")));
    }

    #[test]
    fn unregister_removes_key() {
        let registry = WatchRegistry::new();
        let conn = ConnectionId::new();
        registry.register(conn, "/repo");

        assert!(registry.unregister(conn, Path::new("/repo")));
        assert!(!registry.unregister(conn, Path::new("/repo")));
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_for_connection_leaves_others() {
        let registry = WatchRegistry::new();
        let dead = ConnectionId::new();
        let live = ConnectionId::new();
        registry.register(dead, "/a");
        registry.register(dead, "/b");
        registry.register(live, "/a");

        assert_eq!(registry.clear_for_connection(dead), 2);
        assert!(!registry.is_watched(dead, Path::new("/a")));
        assert!(registry.is_watched(live, Path::new("/a")));
    }

    #[test]
    fn replace_keeps_registration_time_of_surviving_paths() {
        let registry = WatchRegistry::new();
        let conn = ConnectionId::new();
        registry.register(conn, "/keep");
        registry.register(conn, "/stale");
        let before = registry.entries_for(conn);
        let keep_time = before
            .iter()
            .find(|e| e.path == Path::new("/keep"))
            .unwrap()
            .registered_at;

        registry.replace_for_connection(conn, vec![PathBuf::from("/keep"), PathBuf::from("/new")]);

        let after = registry.entries_for(conn);
        let paths: Vec<_> = after.iter().map(|e| e.path.clone()).collect();
        assert!(paths.contains(&PathBuf::from("/keep")));
        assert!(paths.contains(&PathBuf::from("/new")));
        assert!(!paths.contains(&PathBuf::from("/stale")));
        let kept = after.iter().find(|e| e.path == Path::new("/keep")).unwrap();
        assert_eq!(kept.registered_at, keep_time);
    }

    #[test]
    fn connection_id_display_is_compact() {
        let conn = ConnectionId::new();
        assert_eq!(conn.to_string().len(), 32);
    }
}

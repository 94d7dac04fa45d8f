//! Server-side watch subscriptions for one connection

use super::registry::{ConnectionId, WatchEntry, WatchRegistry};
use crate::error::RemcacheResult;
use crate::rpc::RemoteOps;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Log at info when watch debugging is on, at debug otherwise
macro_rules! watch_event {
    ($loud:expr, $($arg:tt)+) => {
        if $loud {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

pub(crate) use watch_event;

/// Keeps the registry belief in step with `watch.*` calls
pub struct WatchManager {
    connection: ConnectionId,
    registry: Arc<WatchRegistry>,
    ops: RemoteOps,
    recursive: bool,
    debug_logging: bool,
    // Serializes check-then-add so a path sees at most one `watch.add`
    registering: Mutex<()>,
}

impl WatchManager {
    pub fn new(
        connection: ConnectionId,
        registry: Arc<WatchRegistry>,
        ops: RemoteOps,
        recursive: bool,
        debug_logging: bool,
    ) -> Self {
        Self {
            connection,
            registry,
            ops,
            recursive,
            debug_logging,
            registering: Mutex::new(()),
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.registry.is_watched(self.connection, path)
    }

    /// Subscribe to changes under `path`.
    ///
    /// Returns `true` if a new watch was added, `false` if one was already
    /// registered or the server declined it.
    pub async fn watch(&self, path: &Path) -> RemcacheResult<bool> {
        let _registering = self.registering.lock().await;

        if self.is_watched(path) {
            watch_event!(self.debug_logging, path = %path.display(), "Already watched");
            return Ok(false);
        }

        let accepted = self.ops.watch_add(path, self.recursive).await?;
        if !accepted {
            warn!(path = %path.display(), "Server declined watch");
            return Ok(false);
        }

        self.registry.register(self.connection, path);
        watch_event!(
            self.debug_logging,
            connection = %self.connection,
            path = %path.display(),
            "Registered watch"
        );
        Ok(true)
    }

    /// Like [`watch`](Self::watch), but failures are only logged
    pub async fn ensure_watched(&self, path: &Path) -> bool {
        match self.watch(path).await {
            Ok(added) => added,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Watch registration failed");
                false
            }
        }
    }

    /// Drop the subscription for `path`. Returns `false` if none was registered.
    pub async fn unwatch(&self, path: &Path) -> RemcacheResult<bool> {
        if !self.is_watched(path) {
            return Ok(false);
        }

        let removed = self.ops.watch_remove(path).await?;
        if !removed {
            debug!(path = %path.display(), "Server had no such watch");
        }
        self.registry.unregister(self.connection, path);
        watch_event!(self.debug_logging, path = %path.display(), "Removed watch");
        Ok(true)
    }

    /// Like [`unwatch`](Self::unwatch), but failures are only logged.
    ///
    /// A failed `watch.remove` keeps the registry entry, so a later attempt
    /// still reaches the server.
    pub async fn ensure_unwatched(&self, path: &Path) -> bool {
        match self.unwatch(path).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove watch");
                false
            }
        }
    }

    /// Remove every watch this connection holds, returning how many were removed
    pub async fn unwatch_all(&self) -> usize {
        let paths: Vec<PathBuf> = self.watched().into_iter().map(|entry| entry.path).collect();

        join_all(paths.iter().map(|path| self.ensure_unwatched(path)))
            .await
            .into_iter()
            .filter(|removed| *removed)
            .count()
    }

    /// Rebuild the registry belief from the server's `watch.list`
    pub async fn resync(&self) -> RemcacheResult<usize> {
        let _registering = self.registering.lock().await;

        let remote = self.ops.watch_list().await?;
        let count = remote.len();
        self.registry
            .replace_for_connection(self.connection, remote.into_iter().map(|w| w.path));

        info!(connection = %self.connection, watches = count, "Resynced watches");
        Ok(count)
    }

    /// Forget everything registered for this connection
    pub fn connection_closed(&self) -> usize {
        let cleared = self.registry.clear_for_connection(self.connection);
        debug!(connection = %self.connection, cleared, "Cleared watches for closed connection");
        cleared
    }

    pub fn watched(&self) -> Vec<WatchEntry> {
        self.registry.entries_for(self.connection)
    }
}

//! Per-connection cache engine
//!
//! [`CacheEngine`] owns everything one remote connection needs: the fact
//! caches, the suppression controller, the transient prefetch state, the
//! watch manager, the dispatcher and the prefetcher. Hosts drive it through
//! [`RenderHooks`] and query it in between.

use crate::cache::{CacheStore, StoreStats};
use crate::config::Config;
use crate::dispatch::{DispatchOutcome, NotificationDispatcher, NotificationPump};
use crate::error::{RemcacheError, RemcacheResult};
use crate::normalize::{normalize, MarkerAnswer};
use crate::prefetch::{PrefetchResult, PrefetchState, Prefetcher, ProbePlan};
use crate::rpc::{CommandOutput, Notification, RemoteOps, RpcClient};
use crate::suppress::SuppressionController;
use crate::watch::{ConnectionId, WatchEntry, WatchManager, WatchRegistry};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

/// Observer the host calls around each operation that reads repository state
#[async_trait]
pub trait RenderHooks: Send + Sync {
    /// Called before the operation; may prefetch
    async fn before_render(&self, directory: &Path);

    /// Called after the operation; releases transient results
    async fn after_render(&self, directory: &Path);
}

/// Snapshot of engine state for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub connection: String,
    pub caches: StoreStats,
    pub watches: usize,
    pub prefetched: bool,
    pub suppression_active: bool,
    pub closed: bool,
}

pub struct CacheEngine {
    config: Config,
    store: Arc<CacheStore>,
    suppression: Arc<SuppressionController>,
    state: Arc<PrefetchState>,
    watches: Arc<WatchManager>,
    dispatcher: Arc<NotificationDispatcher>,
    prefetcher: Prefetcher,
    closed: AtomicBool,
}

impl CacheEngine {
    /// Engine for a fresh connection with its own watch registry
    pub fn new(config: Config, client: Arc<dyn RpcClient>) -> Self {
        Self::with_registry(config, client, Arc::new(WatchRegistry::new()))
    }

    /// Engine sharing `registry` with other connections
    pub fn with_registry(
        config: Config,
        client: Arc<dyn RpcClient>,
        registry: Arc<WatchRegistry>,
    ) -> Self {
        let connection = ConnectionId::new();
        let ops = RemoteOps::new(client, config.rpc.timeout());
        let store = Arc::new(CacheStore::new(&config.cache));
        let state = Arc::new(PrefetchState::new());

        let flushed = store.clone();
        let suppression = Arc::new(SuppressionController::with_flush_hook(move |report| {
            debug!(
                dropped = report.dropped_notifications,
                "Notifications dropped during suppressed scope, flushing"
            );
            flushed.flush();
        }));

        let watches = Arc::new(WatchManager::new(
            connection,
            registry,
            ops.clone(),
            config.watch.recursive,
            config.watch.debug_logging,
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            store.clone(),
            suppression.clone(),
            state.clone(),
            config.watch.debug_logging,
        ));
        let prefetcher = Prefetcher::new(
            config.prefetch.clone(),
            config.watch.auto_register,
            ops,
            store.clone(),
            suppression.clone(),
            state.clone(),
            watches.clone(),
        );

        info!(connection = %connection, "Cache engine ready");

        Self {
            config,
            store,
            suppression,
            state,
            watches,
            dispatcher,
            prefetcher,
            closed: AtomicBool::new(false),
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.watches.connection()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> RemcacheResult<()> {
        if self.is_closed() {
            return Err(RemcacheError::ConnectionClosed);
        }
        Ok(())
    }

    // Notifications

    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        self.dispatcher.clone()
    }

    /// Apply one server push synchronously
    pub fn dispatch(&self, method: &str, params: &Value) -> DispatchOutcome {
        self.dispatcher.dispatch(method, params)
    }

    /// Open the notification feed for this connection.
    ///
    /// The transport sends pushes into the returned sender from any thread;
    /// the pump applies them in order on the current runtime.
    pub fn spawn_notification_pump(&self) -> (UnboundedSender<Notification>, NotificationPump) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, NotificationPump::spawn(self.dispatcher.clone(), rx))
    }

    // Prefetch

    pub fn prefetch_plan(&self, directory: &Path) -> ProbePlan {
        self.prefetcher.plan(directory)
    }

    pub async fn prefetch(&self, directory: &Path) -> RemcacheResult<PrefetchResult> {
        self.ensure_open()?;
        self.prefetcher.prefetch(directory).await
    }

    /// Run `operation` between the render hooks.
    ///
    /// Transient results are released when `operation` finishes, including
    /// when the returned future is dropped early.
    pub async fn with_prefetch<F, Fut, T>(&self, directory: &Path, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.before_render(directory).await;
        let _release = ReleaseOnDrop(&self.state);
        operation().await
    }

    /// Prefetched output for a command invocation, if the batch covered it
    pub fn cached_command<S: AsRef<str>>(
        &self,
        program: &str,
        args: &[S],
        cwd: &Path,
    ) -> Option<CommandOutput> {
        let normalized = normalize(program, args)?;
        let directory = normalized.effective_directory(cwd);
        let hit = self.state.lookup(&directory, &normalized.key);
        debug!(key = %normalized.key, hit = hit.is_some(), "Command lookup");
        hit
    }

    /// Nearest directory holding `marker` for `path`, per the last ancestor scan
    pub fn marker_directory(&self, path: &Path, marker: &str) -> MarkerAnswer {
        self.state
            .ancestors()
            .map(|scan| scan.resolve(path, marker))
            .unwrap_or(MarkerAnswer::Unknown)
    }

    // Fact caches

    pub fn file_exists(&self, path: &Path) -> Option<bool> {
        self.store.exists(path)
    }

    pub fn record_exists(&self, path: impl Into<PathBuf>, exists: bool) {
        self.store.record_exists(path, exists);
    }

    pub fn truename(&self, path: &Path) -> Option<PathBuf> {
        self.store.truename(path)
    }

    pub fn record_truename(&self, path: impl Into<PathBuf>, resolved: impl Into<PathBuf>) {
        self.store.record_truename(path, resolved);
    }

    /// Local write-through invalidation, same coverage as a push
    pub fn invalidate_path(&self, path: &Path) {
        self.store.invalidate_path(path);
    }

    /// Drop every cached fact and any transient prefetch result
    pub fn flush(&self) {
        self.store.flush();
        self.state.clear();
    }

    // Watches

    /// Subscribe to pushes under `path`.
    ///
    /// Only a closed connection is an error. A failed `watch.add` is logged
    /// and reported as `Ok(false)`; caches still expire by TTL.
    pub async fn watch(&self, path: &Path) -> RemcacheResult<bool> {
        self.ensure_open()?;
        Ok(self.watches.ensure_watched(path).await)
    }

    /// Drop the subscription for `path`, logging a failed `watch.remove`
    pub async fn unwatch(&self, path: &Path) -> RemcacheResult<bool> {
        self.ensure_open()?;
        Ok(self.watches.ensure_unwatched(path).await)
    }

    /// Drop every subscription this connection holds while it is still open
    pub async fn unwatch_all(&self) -> RemcacheResult<usize> {
        self.ensure_open()?;
        let removed = self.watches.unwatch_all().await;
        info!(connection = %self.connection(), removed, "Removed all watches");
        Ok(removed)
    }

    pub async fn resync_watches(&self) -> RemcacheResult<usize> {
        self.ensure_open()?;
        self.watches.resync().await
    }

    pub fn watched(&self) -> Vec<WatchEntry> {
        self.watches.watched()
    }

    /// Tear down after the transport reports the connection gone
    pub fn connection_closed(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let cleared = self.watches.connection_closed();
        self.flush();
        info!(connection = %self.connection(), watches = cleared, "Connection closed");
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            connection: self.connection().to_string(),
            caches: self.store.stats(),
            watches: self.watches.watched().len(),
            prefetched: self.state.has_result(),
            suppression_active: self.suppression.is_active(),
            closed: self.is_closed(),
        }
    }
}

#[async_trait]
impl RenderHooks for CacheEngine {
    async fn before_render(&self, directory: &Path) {
        if !self.prefetcher.is_enabled() || self.is_closed() {
            return;
        }
        if let Err(e) = self.prefetch(directory).await {
            warn!(directory = %directory.display(), error = %e, "Prefetch failed, queries go to the server");
        }
    }

    async fn after_render(&self, directory: &Path) {
        self.state.clear();
        debug!(directory = %directory.display(), "Released prefetch results");
    }
}

struct ReleaseOnDrop<'a>(&'a PrefetchState);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

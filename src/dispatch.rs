//! Push-notification handling
//!
//! Server pushes arrive on transport threads at arbitrary times. They are
//! funnelled through one unbounded channel into a single pump task, which
//! hands each one to [`NotificationDispatcher::dispatch`]. The dispatcher
//! itself is synchronous and only takes short cache locks, so it is also
//! safe to call directly from any thread.

use crate::cache::CacheStore;
use crate::prefetch::PrefetchState;
use crate::rpc::{methods, FsChangedParams, Notification};
use crate::suppress::SuppressionController;
use crate::watch::manager::watch_event;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What a dispatched notification did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Cache entries for this many distinct paths were invalidated
    Applied { paths: usize },
    /// Dropped because a suppressed scope was active
    Suppressed,
    /// Unknown method or unusable params
    Ignored,
}

/// Applies server pushes to the caches
pub struct NotificationDispatcher {
    store: Arc<CacheStore>,
    suppression: Arc<SuppressionController>,
    state: Arc<PrefetchState>,
    debug_logging: bool,
}

impl NotificationDispatcher {
    pub fn new(
        store: Arc<CacheStore>,
        suppression: Arc<SuppressionController>,
        state: Arc<PrefetchState>,
        debug_logging: bool,
    ) -> Self {
        Self {
            store,
            suppression,
            state,
            debug_logging,
        }
    }

    pub fn dispatch(&self, method: &str, params: &Value) -> DispatchOutcome {
        match method {
            methods::FS_CHANGED => self.fs_changed(params),
            _ => {
                debug!(method, "Ignoring unknown notification");
                DispatchOutcome::Ignored
            }
        }
    }

    fn fs_changed(&self, params: &Value) -> DispatchOutcome {
        let params = match FsChangedParams::deserialize(params) {
            Ok(params) => params,
            Err(e) => {
                warn!(error = %e, "Malformed fs.changed params");
                return DispatchOutcome::Ignored;
            }
        };

        let paths: BTreeSet<PathBuf> = params
            .paths
            .into_iter()
            .filter(|path| {
                let usable = path.is_absolute();
                if !usable {
                    warn!(path = %path.display(), "Ignoring relative path in fs.changed");
                }
                usable
            })
            .collect();

        if paths.is_empty() {
            return DispatchOutcome::Ignored;
        }

        if self.suppression.suppress(paths.iter().cloned()) {
            watch_event!(
                self.debug_logging,
                paths = paths.len(),
                "Dropped fs.changed inside suppressed scope"
            );
            return DispatchOutcome::Suppressed;
        }

        for path in &paths {
            self.store.invalidate_path(path);
            if self.state.invalidate_ancestors_for(path) {
                debug!(path = %path.display(), "Marker changed, dropped ancestor scan");
            }
        }

        watch_event!(self.debug_logging, paths = paths.len(), "Applied fs.changed");
        DispatchOutcome::Applied { paths: paths.len() }
    }
}

/// Single consumer draining the notification feed into a dispatcher
pub struct NotificationPump {
    handle: JoinHandle<usize>,
}

impl NotificationPump {
    /// Start the pump on the current runtime
    pub fn spawn(
        dispatcher: Arc<NotificationDispatcher>,
        mut feed: UnboundedReceiver<Notification>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut handled = 0;
            while let Some(notification) = feed.recv().await {
                dispatcher.dispatch(&notification.method, &notification.params);
                handled += 1;
            }
            debug!(handled, "Notification feed closed");
            handled
        });
        Self { handle }
    }

    /// Wait for the feed to close, returning how many notifications were handled
    pub async fn finished(self) -> usize {
        self.handle.await.unwrap_or_else(|e| {
            warn!(error = %e, "Notification pump stopped abnormally");
            0
        })
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

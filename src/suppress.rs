//! Suppression of push invalidation during self-inflicted filesystem activity
//!
//! A prefetch batch touches repository metadata on the server, which makes
//! the server push change notifications for the very files being probed.
//! While a suppressed scope is active the dispatcher drops those
//! notifications instead of applying them. They are never replayed: when
//! the scope ends, the flush hook runs once if anything was dropped, so no
//! invalidation is lost past the end of the scope.
//!
//! Scopes do not nest. Entering while a scope is active is rejected with
//! [`RemcacheError::SuppressionActive`]; callers serialize their scopes.

use crate::cache::lock;
use crate::error::{RemcacheError, RemcacheResult};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// What was dropped while a scope was active
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppressionReport {
    pub dropped_notifications: usize,
    pub dropped_paths: BTreeSet<PathBuf>,
}

impl SuppressionReport {
    /// Whether the scope owner has to compensate for dropped invalidations
    pub fn needs_flush(&self) -> bool {
        self.dropped_notifications > 0
    }
}

type FlushHook = Box<dyn Fn(&SuppressionReport) + Send + Sync>;

#[derive(Default)]
struct SuppressionState {
    active: bool,
    report: SuppressionReport,
}

/// Gate around a scoped critical section
pub struct SuppressionController {
    state: Mutex<SuppressionState>,
    on_exit: Option<FlushHook>,
}

impl SuppressionController {
    /// Controller without a flush hook
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SuppressionState::default()),
            on_exit: None,
        }
    }

    /// Controller that calls `hook` after any scope that dropped notifications
    pub fn with_flush_hook(hook: impl Fn(&SuppressionReport) + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(SuppressionState::default()),
            on_exit: Some(Box::new(hook)),
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state).active
    }

    /// Open a scope. The returned guard closes it when dropped.
    pub fn enter(&self) -> RemcacheResult<SuppressionGuard<'_>> {
        let mut state = lock(&self.state);
        if state.active {
            return Err(RemcacheError::SuppressionActive);
        }
        state.active = true;
        state.report = SuppressionReport::default();
        debug!("Entered suppressed scope");
        Ok(SuppressionGuard {
            controller: self,
            open: true,
        })
    }

    /// Run `operation` inside a scope, closing it on every exit path
    pub async fn run_suppressed<F, Fut, T>(&self, operation: F) -> RemcacheResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.enter()?;
        Ok(operation().await)
    }

    /// Record `paths` as dropped if a scope is active.
    ///
    /// Returns `true` when the caller must not apply the notification.
    pub fn suppress<I>(&self, paths: I) -> bool
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut state = lock(&self.state);
        if !state.active {
            return false;
        }
        state.report.dropped_notifications += 1;
        state.report.dropped_paths.extend(paths);
        true
    }

    fn exit(&self) -> SuppressionReport {
        let report = {
            let mut state = lock(&self.state);
            state.active = false;
            std::mem::take(&mut state.report)
        };

        debug!(
            dropped = report.dropped_notifications,
            paths = report.dropped_paths.len(),
            "Left suppressed scope"
        );

        if report.needs_flush() {
            if let Some(hook) = &self.on_exit {
                hook(&report);
            }
        }
        report
    }
}

impl Default for SuppressionController {
    fn default() -> Self {
        Self::new()
    }
}

/// Open suppressed scope; dropping it closes the scope
#[must_use = "the scope closes as soon as the guard is dropped"]
pub struct SuppressionGuard<'a> {
    controller: &'a SuppressionController,
    open: bool,
}

impl SuppressionGuard<'_> {
    /// Close the scope now and return what was dropped while it was open
    pub fn close(mut self) -> SuppressionReport {
        self.open = false;
        self.controller.exit()
    }
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        if self.open {
            self.controller.exit();
        }
    }
}

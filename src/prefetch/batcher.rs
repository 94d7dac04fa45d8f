//! One-request prefetch of repository state

use super::probes::ProbePlan;
use super::result::{PrefetchResult, PrefetchState};
use crate::cache::CacheStore;
use crate::config::PrefetchConfig;
use crate::error::{RemcacheError, RemcacheResult};
use crate::normalize::AncestorScan;
use crate::rpc::RemoteOps;
use crate::suppress::SuppressionController;
use crate::watch::WatchManager;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Runs prefetch batches and commits their results
pub struct Prefetcher {
    config: PrefetchConfig,
    auto_register: bool,
    ops: RemoteOps,
    store: Arc<CacheStore>,
    suppression: Arc<SuppressionController>,
    state: Arc<PrefetchState>,
    watches: Arc<WatchManager>,
    // One batch at a time per connection; the suppression flag does not nest
    gate: Mutex<()>,
}

impl Prefetcher {
    pub fn new(
        config: PrefetchConfig,
        auto_register: bool,
        ops: RemoteOps,
        store: Arc<CacheStore>,
        suppression: Arc<SuppressionController>,
        state: Arc<PrefetchState>,
        watches: Arc<WatchManager>,
    ) -> Self {
        Self {
            config,
            auto_register,
            ops,
            store,
            suppression,
            state,
            watches,
            gate: Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// The batch that would be sent for `directory`
    pub fn plan(&self, directory: &Path) -> ProbePlan {
        ProbePlan::build(directory, &self.config.metadata_dir)
    }

    /// Prefetch repository state for `directory`.
    ///
    /// The batch, the ancestor scan and the root watch registration all run
    /// inside one suppressed scope. Results are committed only after the
    /// scope has closed, and only if the batch succeeded in full; any
    /// failure, timeout or cancellation before that point leaves every
    /// cache untouched. Facts that a push dropped during the scope would
    /// have invalidated are not committed.
    pub async fn prefetch(&self, directory: &Path) -> RemcacheResult<PrefetchResult> {
        if !self.config.enabled {
            return Err(RemcacheError::PrefetchDisabled);
        }

        let _serial = self.gate.lock().await;
        let plan = self.plan(directory);
        debug!(directory = %directory.display(), probes = plan.len(), "Prefetching");

        let (result, state_facts, ancestors, report) = {
            let scope = self.suppression.enter()?;

            let outputs = self.ops.run_parallel(&plan.commands).await?;
            let (result, state_facts) = PrefetchResult::from_batch(directory, outputs);
            let ancestors = self.scan_ancestors(directory).await;

            if self.auto_register {
                if let Some(toplevel) = result.toplevel() {
                    self.watches.ensure_watched(&toplevel).await;
                }
            }

            (result, state_facts, ancestors, scope.close())
        };

        let dropped = &report.dropped_paths;
        let (fresh, stale): (Vec<_>, Vec<_>) = state_facts
            .into_iter()
            .partition(|(path, _)| !touched_by(path, dropped));
        let ancestors =
            ancestors.filter(|scan| !dropped.iter().any(|path| scan.is_affected_by(path)));
        if !stale.is_empty() {
            debug!(skipped = stale.len(), "State files changed during batch, not cached");
        }

        let facts = fresh.len();
        for (path, exists) in fresh {
            self.store.record_exists(path, exists);
        }
        self.state.store(result.clone(), ancestors);

        info!(
            directory = %directory.display(),
            commands = result.len(),
            state_files = facts,
            "Prefetch committed"
        );
        Ok(result)
    }

    async fn scan_ancestors(&self, directory: &Path) -> Option<AncestorScan> {
        if self.config.ancestor_markers.is_empty() {
            return None;
        }

        match self
            .ops
            .scan_ancestors(
                directory,
                &self.config.ancestor_markers,
                self.config.ancestor_max_depth,
            )
            .await
        {
            Ok(markers) => Some(AncestorScan::new(directory, markers)),
            Err(e) => {
                warn!(directory = %directory.display(), error = %e, "Ancestor scan failed");
                None
            }
        }
    }
}

/// Whether invalidating any of `dropped` would have cleared `path`
fn touched_by(path: &Path, dropped: &BTreeSet<PathBuf>) -> bool {
    dropped.contains(path)
        || path.parent().is_some_and(|parent| dropped.contains(parent))
        || dropped.iter().any(|changed| changed.parent() == Some(path))
}

//! Prefetch results and the transient slot that holds them during a render

use super::probes::{ProbeKey, TOPLEVEL_PROBE};
use crate::cache::lock;
use crate::normalize::{command_key, AncestorScan};
use crate::rpc::CommandOutput;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Repository-query outputs from one batch, keyed by correlation key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchResult {
    directory: PathBuf,
    entries: HashMap<String, CommandOutput>,
}

impl PrefetchResult {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            entries: HashMap::new(),
        }
    }

    /// Split a raw batch response into command outputs and state-file facts
    pub(crate) fn from_batch(
        directory: &Path,
        outputs: HashMap<String, CommandOutput>,
    ) -> (Self, Vec<(PathBuf, bool)>) {
        let mut result = Self::new(directory);
        let mut state_facts = Vec::new();

        for (key, output) in outputs {
            match ProbeKey::parse(&key) {
                ProbeKey::StateFile(path) => state_facts.push((path, output.success())),
                ProbeKey::Command(key) => {
                    result.entries.insert(key, output);
                }
            }
        }

        (result, state_facts)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn get(&self, key: &str) -> Option<&CommandOutput> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, output: CommandOutput) {
        self.entries.insert(key.into(), output);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolved top-level directory, when that probe succeeded
    pub fn toplevel(&self) -> Option<PathBuf> {
        let output = self.get(&command_key(TOPLEVEL_PROBE))?;
        if !output.success() {
            return None;
        }
        output.first_line().map(PathBuf::from)
    }
}

/// Results that live for one triggering operation
#[derive(Debug, Default)]
pub struct PrefetchState {
    result: Mutex<Option<PrefetchResult>>,
    ancestors: Mutex<Option<AncestorScan>>,
}

impl PrefetchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn store(&self, result: PrefetchResult, ancestors: Option<AncestorScan>) {
        *lock(&self.result) = Some(result);
        *lock(&self.ancestors) = ancestors;
    }

    /// Output for `key`, if the current batch ran in `directory`
    pub fn lookup(&self, directory: &Path, key: &str) -> Option<CommandOutput> {
        lock(&self.result)
            .as_ref()
            .filter(|result| result.directory() == directory)
            .and_then(|result| result.get(key).cloned())
    }

    pub fn ancestors(&self) -> Option<AncestorScan> {
        lock(&self.ancestors).clone()
    }

    pub fn has_result(&self) -> bool {
        lock(&self.result).is_some()
    }

    /// Drop the ancestor scan if a change at `path` could falsify it
    pub(crate) fn invalidate_ancestors_for(&self, path: &Path) -> bool {
        let mut ancestors = lock(&self.ancestors);
        if ancestors.as_ref().is_some_and(|scan| scan.is_affected_by(path)) {
            *ancestors = None;
            return true;
        }
        false
    }

    /// Forget everything held for the finished operation
    pub fn clear(&self) {
        *lock(&self.result) = None;
        *lock(&self.ancestors) = None;
    }
}

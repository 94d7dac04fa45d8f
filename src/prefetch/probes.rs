//! The fixed probe list of a prefetch batch
//!
//! Two kinds of probe go into one `commands.run_parallel` request:
//!
//! | Kind | Correlation key | Command |
//! |------|-----------------|---------|
//! | Repository query | args joined by spaces, e.g. `rev-parse HEAD` | `git --no-pager <args>` |
//! | State file | `state:<absolute path>` | `test -e <absolute path>` |
//!
//! State-file probes live under `<directory>/<metadata_dir>` and each one is
//! answered only by its own exit code.

use crate::normalize::command::{command_key, GIT_PROGRAM};
use crate::rpc::CommandSpec;
use std::path::{Path, PathBuf};

/// Key prefix marking a state-file existence probe
pub const STATE_KEY_PREFIX: &str = "state:";

/// Probe whose stdout names the repository's top-level directory
pub const TOPLEVEL_PROBE: &[&str] = &["rev-parse", "--show-toplevel"];

/// Repository state queries a status view needs
pub const GIT_PROBES: &[&[&str]] = &[
    TOPLEVEL_PROBE,
    &["rev-parse", "--git-dir"],
    &["rev-parse", "--is-bare-repository"],
    &["rev-parse", "--verify", "HEAD"],
    &["rev-parse", "--abbrev-ref", "HEAD"],
    &["symbolic-ref", "--short", "HEAD"],
    &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{upstream}"],
    &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{push}"],
    &["rev-parse", "--verify", "refs/stash"],
    &["describe", "--long", "--tags"],
    &["describe", "--contains", "HEAD"],
    &["diff", "--quiet"],
    &["diff", "--cached", "--quiet"],
    &["diff", "--shortstat"],
    &["diff", "--cached", "--shortstat"],
    &["config", "--list", "-z"],
    &["config", "--get", "remote.origin.url"],
    &["status", "-z", "--porcelain"],
    &["stash", "list", "--format=%gd"],
    &["log", "--format=%H", "-n", "1"],
];

/// Files whose mere existence signals repository state
pub const STATE_FILES: &[&str] = &[
    "HEAD",
    "ORIG_HEAD",
    "FETCH_HEAD",
    "MERGE_HEAD",
    "MERGE_MSG",
    "AUTO_MERGE",
    "REBASE_HEAD",
    "CHERRY_PICK_HEAD",
    "REVERT_HEAD",
    "BISECT_LOG",
    "BISECT_START",
    "rebase-merge",
    "rebase-apply",
    "sequencer",
    "config",
    "index",
    "info/exclude",
    "refs/stash",
    "logs/refs/stash",
];

/// Identity of one probe, parsed from its correlation key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProbeKey {
    /// A repository query; holds the joined args
    Command(String),
    /// An existence check for the absolute path
    StateFile(PathBuf),
}

impl ProbeKey {
    pub fn parse(wire: &str) -> Self {
        match wire.strip_prefix(STATE_KEY_PREFIX) {
            Some(path) => Self::StateFile(PathBuf::from(path)),
            None => Self::Command(wire.to_string()),
        }
    }

    pub fn to_wire(&self) -> String {
        match self {
            Self::Command(key) => key.clone(),
            Self::StateFile(path) => format!("{}{}", STATE_KEY_PREFIX, path.display()),
        }
    }
}

/// Whether the batch covers the repository query with this key
pub fn is_command_probe(key: &str) -> bool {
    GIT_PROBES.iter().any(|probe| command_key(probe) == key)
}

/// The batch for one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePlan {
    pub directory: PathBuf,
    pub commands: Vec<CommandSpec>,
}

impl ProbePlan {
    /// Build the batch for `directory`, with state files under `metadata_dir`
    pub fn build(directory: &Path, metadata_dir: &str) -> Self {
        let mut commands: Vec<CommandSpec> = GIT_PROBES
            .iter()
            .map(|probe| CommandSpec {
                key: command_key(probe),
                cmd: GIT_PROGRAM.to_string(),
                args: std::iter::once("--no-pager")
                    .chain(probe.iter().copied())
                    .map(str::to_string)
                    .collect(),
                cwd: directory.to_path_buf(),
            })
            .collect();

        let metadata = directory.join(metadata_dir);
        commands.extend(STATE_FILES.iter().map(|file| {
            let path = metadata.join(file);
            CommandSpec {
                key: ProbeKey::StateFile(path.clone()).to_wire(),
                cmd: "test".to_string(),
                args: vec!["-e".to_string(), path.display().to_string()],
                cwd: directory.to_path_buf(),
            }
        }));

        Self {
            directory: directory.to_path_buf(),
            commands,
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use std::collections::HashSet;

    #[test]
    fn plan_keys_are_unique() {
        let plan = ProbePlan::build(Path::new("/repo"), ".git");
        let keys: HashSet<_> = plan.commands.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys.len(), plan.len());
        assert_eq!(plan.len(), GIT_PROBES.len() + STATE_FILES.len());
    }

    #[test]
    fn git_probe_keys_survive_normalization() {
        // Every batch command, replayed as an invocation, maps back to its own key
        let plan = ProbePlan::build(Path::new("/repo"), ".git");
        for command in plan.commands.iter().filter(|c| c.cmd == GIT_PROGRAM) {
            let normalized = normalize(&command.cmd, &command.args)
                .unwrap_or_else(|| panic!("probe {:?} does not normalize", command.key));
            assert_eq!(normalized.key, command.key);
            assert!(is_command_probe(&normalized.key));
        }
    }

    #[test]
    fn state_files_are_rooted_under_metadata_dir() {
        let plan = ProbePlan::build(Path::new("/repo"), ".git");
        let stash = plan
            .commands
            .iter()
            .find(|c| c.key == "state:/repo/.git/refs/stash")
            .unwrap();
        assert_eq!(stash.cmd, "test");
        assert_eq!(stash.args, vec!["-e", "/repo/.git/refs/stash"]);
    }

    #[test]
    fn probe_key_parses_both_kinds() {
        assert_eq!(
            ProbeKey::parse("state:/repo/.git/MERGE_HEAD"),
            ProbeKey::StateFile(PathBuf::from("/repo/.git/MERGE_HEAD"))
        );
        assert_eq!(
            ProbeKey::parse("rev-parse --verify refs/stash"),
            ProbeKey::Command("rev-parse --verify refs/stash".to_string())
        );
    }

    #[test]
    fn unknown_command_is_not_a_probe() {
        assert!(is_command_probe("status -z --porcelain"));
        assert!(!is_command_probe("status"));
        assert!(!is_command_probe("push --force"));
    }
}

//! Command-key normalization
//!
//! Reduces a git invocation to the correlation key the prefetch batch used
//! for the same query, so `git --no-pager -c color.ui=false status -z
//! --porcelain` and the batch's `status -z --porcelain` share a cache entry.
//!
//! Normalization is conservative: any leading option that is not known to
//! leave output unchanged, a dangling option operand, or an argument the key
//! format cannot represent unambiguously makes the result a miss.

use std::path::{Path, PathBuf};

/// Program the prefetch batch covers
pub const GIT_PROGRAM: &str = "git";

/// Leading options that never change a probe's output
const NEUTRAL_FLAGS: &[&str] = &[
    "--no-pager",
    "-P",
    "--literal-pathspecs",
    "--no-optional-locks",
];

/// A normalized invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCommand {
    /// Correlation key in the batch's format
    pub key: String,
    /// Accumulated `-C` operands, relative to the caller's working directory
    pub directory: Option<PathBuf>,
}

impl NormalizedCommand {
    /// Directory the command actually runs in, given the caller's cwd
    pub fn effective_directory(&self, cwd: &Path) -> PathBuf {
        match &self.directory {
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        }
    }
}

/// Whether `program` names git, either bare or as a path ending in it
pub fn is_git_program(program: &str) -> bool {
    if program == GIT_PROGRAM {
        return true;
    }
    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == GIT_PROGRAM || name == "git.exe")
}

/// Join probe arguments into a correlation key
pub fn command_key<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| arg.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a full invocation, returning `None` on any doubt
pub fn normalize<S: AsRef<str>>(program: &str, args: &[S]) -> Option<NormalizedCommand> {
    if !is_git_program(program) {
        return None;
    }
    normalize_git_args(args)
}

/// Normalize the argument list of a git invocation
pub fn normalize_git_args<S: AsRef<str>>(args: &[S]) -> Option<NormalizedCommand> {
    let mut directory: Option<PathBuf> = None;
    let mut rest = args.iter().map(|arg| arg.as_ref());
    let mut remaining: Vec<&str> = Vec::new();

    while let Some(arg) = rest.next() {
        if !arg.starts_with('-') {
            remaining.push(arg);
            break;
        }

        match arg {
            flag if NEUTRAL_FLAGS.contains(&flag) => {}
            "-C" => {
                let dir = rest.next()?;
                directory = Some(match directory {
                    Some(prev) => prev.join(dir),
                    None => PathBuf::from(dir),
                });
            }
            "-c" => {
                let setting = rest.next()?;
                let (name, _) = setting.split_once('=')?;
                if name.is_empty() {
                    return None;
                }
            }
            _ => return None,
        }
    }
    remaining.extend(rest);

    if remaining.is_empty() {
        return None;
    }
    if remaining
        .iter()
        .any(|arg| arg.is_empty() || arg.chars().any(char::is_whitespace))
    {
        return None;
    }

    Some(NormalizedCommand {
        key: command_key(&remaining),
        directory,
    })
}

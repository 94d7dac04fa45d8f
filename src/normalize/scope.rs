//! Scope resolution for ancestor-scan answers
//!
//! An ancestor scan computed for directory `D` says, per marker, which
//! directory at or above `D` contains it. That answer only transfers to a
//! query whose own directory lies at or below `D`, and a found marker only
//! applies when its directory is at or above the query's directory. Every
//! other case is [`MarkerAnswer::Unknown`], never a guess.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Answer for one marker at one query path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerAnswer {
    /// The marker lives in this directory, which contains the query path
    Present(PathBuf),
    /// The scan proves the marker is absent for this query
    Absent,
    /// The scan cannot answer; ask the server
    Unknown,
}

/// Ancestor scan results scoped to the directory they were computed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorScan {
    directory: PathBuf,
    markers: HashMap<String, Option<PathBuf>>,
}

impl AncestorScan {
    pub fn new(directory: impl Into<PathBuf>, markers: HashMap<String, Option<PathBuf>>) -> Self {
        Self {
            directory: directory.into(),
            markers,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn markers(&self) -> impl Iterator<Item = (&str, Option<&Path>)> {
        self.markers
            .iter()
            .map(|(name, dir)| (name.as_str(), dir.as_deref()))
    }

    /// Whether a change to `path` could alter this scan's answers
    pub fn is_affected_by(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.markers.contains_key(name))
    }

    /// Resolve `marker` for the file or directory at `query`
    pub fn resolve(&self, query: &Path, marker: &str) -> MarkerAnswer {
        let Some(query_dir) = self.query_directory(query) else {
            return MarkerAnswer::Unknown;
        };
        if !query_dir.starts_with(&self.directory) {
            return MarkerAnswer::Unknown;
        }

        match self.markers.get(marker) {
            None => MarkerAnswer::Unknown,
            Some(Some(found)) if query_dir.starts_with(found) => {
                MarkerAnswer::Present(found.clone())
            }
            Some(Some(_)) => MarkerAnswer::Unknown,
            // Anything below the root may itself be a directory holding the marker
            Some(None) if query == self.directory => MarkerAnswer::Absent,
            Some(None) => MarkerAnswer::Unknown,
        }
    }

    /// The directory a lookup for `query` starts from
    fn query_directory<'a>(&self, query: &'a Path) -> Option<&'a Path> {
        if !query.is_absolute() {
            return None;
        }
        // Scoping is component-wise, so `..` could escape the scanned tree
        if query
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
        {
            return None;
        }
        if query == self.directory {
            return Some(query);
        }
        query.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(directory: &str, markers: &[(&str, Option<&str>)]) -> AncestorScan {
        AncestorScan::new(
            directory,
            markers
                .iter()
                .map(|(name, dir)| (name.to_string(), dir.map(PathBuf::from)))
                .collect(),
        )
    }

    #[test]
    fn descendant_query_sees_marker() {
        let scan = scan("/repo", &[(".git", Some("/repo"))]);
        assert_eq!(
            scan.resolve(Path::new("/repo/src/file.c"), ".git"),
            MarkerAnswer::Present(PathBuf::from("/repo"))
        );
        assert_eq!(
            scan.resolve(Path::new("/repo"), ".git"),
            MarkerAnswer::Present(PathBuf::from("/repo"))
        );
    }

    #[test]
    fn query_outside_scope_is_unknown() {
        let scan = scan("/repo", &[(".git", Some("/repo"))]);
        assert_eq!(scan.resolve(Path::new("/other/file.c"), ".git"), MarkerAnswer::Unknown);
        // Shares a textual prefix but not a path component
        assert_eq!(scan.resolve(Path::new("/repository/a.c"), ".git"), MarkerAnswer::Unknown);
        assert_eq!(scan.resolve(Path::new("relative/a.c"), ".git"), MarkerAnswer::Unknown);
    }

    #[test]
    fn marker_in_sibling_subtree_does_not_apply() {
        // A misreported nearest directory that is not above the query
        let scan = scan("/work", &[(".projectile", Some("/work/other"))]);
        assert_eq!(
            scan.resolve(Path::new("/work/mine/file"), ".projectile"),
            MarkerAnswer::Unknown
        );
    }

    #[test]
    fn parent_components_leaving_scope_are_unknown() {
        let scan = scan("/repo", &[(".git", Some("/repo")), (".hg", None)]);
        assert_eq!(
            scan.resolve(Path::new("/repo/../other/file.c"), ".git"),
            MarkerAnswer::Unknown
        );
        assert_eq!(scan.resolve(Path::new("/repo/sub/.."), ".hg"), MarkerAnswer::Unknown);
    }

    #[test]
    fn absence_only_proven_at_scan_root() {
        let scan = scan("/repo", &[(".hg", None)]);
        assert_eq!(scan.resolve(Path::new("/repo"), ".hg"), MarkerAnswer::Absent);
        // Could be a directory that holds `.hg` itself
        assert_eq!(scan.resolve(Path::new("/repo/sub"), ".hg"), MarkerAnswer::Unknown);
        assert_eq!(scan.resolve(Path::new("/repo/sub/file.c"), ".hg"), MarkerAnswer::Unknown);
    }

    #[test]
    fn unscanned_marker_is_unknown() {
        let scan = scan("/repo", &[(".git", Some("/repo"))]);
        assert_eq!(scan.resolve(Path::new("/repo/a"), ".svn"), MarkerAnswer::Unknown);
    }

    #[test]
    fn marker_file_changes_affect_scan() {
        let scan = scan("/repo", &[(".git", Some("/repo"))]);
        assert!(scan.is_affected_by(Path::new("/repo/sub/.git")));
        assert!(!scan.is_affected_by(Path::new("/repo/sub/main.c")));
    }
}

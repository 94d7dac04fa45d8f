//! Wire types for the remote server's RPC methods and pushes

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::path::PathBuf;

/// Method names understood by the remote server
pub mod methods {
    pub const RUN_PARALLEL: &str = "commands.run_parallel";
    pub const ANCESTORS_SCAN: &str = "ancestors.scan";
    pub const WATCH_ADD: &str = "watch.add";
    pub const WATCH_REMOVE: &str = "watch.remove";
    pub const WATCH_LIST: &str = "watch.list";

    /// Server push carrying changed paths
    pub const FS_CHANGED: &str = "fs.changed";
}

/// A server push, delivered without a reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// One entry of a `commands.run_parallel` batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Caller-chosen correlation key
    pub key: String,
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Outcome of one command in a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    #[serde(default, deserialize_with = "bytes_or_string")]
    pub stdout: Vec<u8>,
    #[serde(default, deserialize_with = "bytes_or_string")]
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// First line of stdout without the line terminator, if non-empty
    pub fn first_line(&self) -> Option<String> {
        let text = self.stdout_lossy();
        let line = text.lines().next()?.trim_end_matches('\r');
        (!line.is_empty()).then(|| line.to_string())
    }
}

/// Params of `ancestors.scan`
#[derive(Debug, Clone, Serialize)]
pub struct AncestorScanParams<'a> {
    pub directory: &'a std::path::Path,
    pub markers: &'a [String],
    pub max_depth: u32,
}

/// Params of `watch.add`
#[derive(Debug, Clone, Serialize)]
pub struct WatchAddParams<'a> {
    pub path: &'a std::path::Path,
    pub recursive: bool,
}

/// Params of `watch.remove`
#[derive(Debug, Clone, Serialize)]
pub struct WatchRemoveParams<'a> {
    pub path: &'a std::path::Path,
}

/// One entry of the `watch.list` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWatch {
    pub path: PathBuf,
    #[serde(default)]
    pub recursive: bool,
}

/// Params of the `fs.changed` push
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FsChangedParams {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
}

/// Servers send output either as text or as a raw byte array
fn bytes_or_string<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Bytes(Vec<u8>),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text.into_bytes(),
        Some(Raw::Bytes(bytes)) => bytes,
        None => Vec::new(),
    })
}

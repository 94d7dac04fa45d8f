//! Typed wrappers over the server methods the engine consumes

use super::protocol::{
    methods, AncestorScanParams, CommandOutput, CommandSpec, RemoteWatch, WatchAddParams,
    WatchRemoveParams,
};
use super::RpcClient;
use crate::error::{RemcacheError, RemcacheResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Typed access to the remote server with a per-call timeout
#[derive(Clone)]
pub struct RemoteOps {
    client: Arc<dyn RpcClient>,
    timeout: Option<Duration>,
}

impl RemoteOps {
    pub fn new(client: Arc<dyn RpcClient>, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    /// Run a batch of commands in parallel on the server.
    ///
    /// The batch is all-or-nothing: a missing result for any key fails the
    /// whole call. Results for keys that were never sent are discarded.
    pub async fn run_parallel(
        &self,
        commands: &[CommandSpec],
    ) -> RemcacheResult<HashMap<String, CommandOutput>> {
        let params = serde_json::to_value(commands)?;
        let value = self.invoke(methods::RUN_PARALLEL, params).await?;
        let mut results: HashMap<String, CommandOutput> = decode(methods::RUN_PARALLEL, value)?;

        let sent: HashSet<&str> = commands.iter().map(|c| c.key.as_str()).collect();
        results.retain(|key, _| {
            let known = sent.contains(key.as_str());
            if !known {
                debug!(key = %key, "Discarding result for unrequested key");
            }
            known
        });

        if let Some(missing) = commands.iter().find(|c| !results.contains_key(&c.key)) {
            return Err(RemcacheError::malformed(
                methods::RUN_PARALLEL,
                format!("no result for key {:?}", missing.key),
            ));
        }

        Ok(results)
    }

    /// Search upward from `directory` for each marker name
    pub async fn scan_ancestors(
        &self,
        directory: &Path,
        markers: &[String],
        max_depth: u32,
    ) -> RemcacheResult<HashMap<String, Option<PathBuf>>> {
        let params = serde_json::to_value(AncestorScanParams {
            directory,
            markers,
            max_depth,
        })?;
        let value = self.invoke(methods::ANCESTORS_SCAN, params).await?;
        decode(methods::ANCESTORS_SCAN, value)
    }

    pub async fn watch_add(&self, path: &Path, recursive: bool) -> RemcacheResult<bool> {
        let params = serde_json::to_value(WatchAddParams { path, recursive })?;
        let value = self.invoke(methods::WATCH_ADD, params).await?;
        decode(methods::WATCH_ADD, value)
    }

    pub async fn watch_remove(&self, path: &Path) -> RemcacheResult<bool> {
        let params = serde_json::to_value(WatchRemoveParams { path })?;
        let value = self.invoke(methods::WATCH_REMOVE, params).await?;
        decode(methods::WATCH_REMOVE, value)
    }

    pub async fn watch_list(&self) -> RemcacheResult<Vec<RemoteWatch>> {
        let value = self.invoke(methods::WATCH_LIST, Value::Null).await?;
        decode(methods::WATCH_LIST, value)
    }

    async fn invoke(&self, method: &str, params: Value) -> RemcacheResult<Value> {
        debug!(method, "RPC call");
        let call = self.client.call(method, params);

        let value = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                RemcacheError::RpcTimeout {
                    method: method.to_string(),
                    millis: limit.as_millis(),
                }
            })??,
            None => call.await?,
        };

        if value.is_null() {
            return Err(RemcacheError::EmptyResult {
                method: method.to_string(),
            });
        }
        Ok(value)
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> RemcacheResult<T> {
    serde_json::from_value(value).map_err(|e| RemcacheError::malformed(method, e.to_string()))
}

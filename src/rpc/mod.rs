//! RPC client seam
//!
//! The transport (framing, connection lifecycle) lives outside this crate.
//! The engine only needs [`RpcClient::call`] for requests and a
//! [`Notification`] feed for server pushes; [`RemoteOps`] layers typed
//! wrappers over the five server methods the engine uses.

mod ops;
pub mod protocol;

#[cfg(test)]
pub(crate) mod fake;

pub use ops::RemoteOps;
pub use protocol::{
    methods, CommandOutput, CommandSpec, FsChangedParams, Notification, RemoteWatch,
};

use crate::error::RemcacheResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Request/response half of a connection to the remote server
///
/// Implementations return `Ok(Value::Null)` when the server replied without
/// a result; [`RemoteOps`] treats that as a failed call.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> RemcacheResult<Value>;
}

#[async_trait]
impl<T: RpcClient + ?Sized> RpcClient for Arc<T> {
    async fn call(&self, method: &str, params: Value) -> RemcacheResult<Value> {
        (**self).call(method, params).await
    }
}

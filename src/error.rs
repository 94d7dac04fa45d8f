//! Error types for remcache
//!
//! All modules use `RemcacheResult<T>` as their return type. Nothing in the
//! cache engine is fatal: callers treat any error as "fall back to an
//! uncached query".

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for remcache operations
pub type RemcacheResult<T> = Result<T, RemcacheError>;

/// All errors that can occur in remcache
#[derive(Error, Debug)]
pub enum RemcacheError {
    // RPC errors
    #[error("RPC call {method} failed: {reason}")]
    Rpc { method: String, reason: String },

    #[error("RPC call {method} timed out after {millis}ms")]
    RpcTimeout { method: String, millis: u128 },

    #[error("RPC call {method} returned no result")]
    EmptyResult { method: String },

    #[error("RPC call {method} returned a malformed result: {reason}")]
    MalformedResult { method: String, reason: String },

    #[error("Connection closed")]
    ConnectionClosed,

    // Coherence errors
    #[error("A suppressed scope is already active")]
    SuppressionActive,

    #[error("Prefetch is disabled by configuration")]
    PrefetchDisabled,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl RemcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport-level RPC error
    pub fn rpc(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rpc {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed-result error
    pub fn malformed(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResult {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Rpc { .. } | Self::RpcTimeout { .. } | Self::SuppressionActive
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::RpcTimeout { .. } => Some("Raise rpc.timeout_secs or check the remote server"),
            Self::ConfigNotFound(_) => Some("Run: remcache config init"),
            Self::PrefetchDisabled => Some("Set prefetch.enabled = true"),
            _ => None,
        }
    }
}

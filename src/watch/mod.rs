//! Change-notification subscriptions
//!
//! The server owns the real watcher; this module only tracks which paths
//! we believe are subscribed so redundant `watch.add` calls can be skipped.

pub mod manager;
pub mod registry;

pub use manager::WatchManager;
pub use registry::{ConnectionId, WatchEntry, WatchKey, WatchRegistry};

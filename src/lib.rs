//! remcache - client-side cache coherence for remote filesystem access
//!
//! Keeps local caches of remote filesystem facts (existence, truenames,
//! repository command output) consistent with the server through pushed
//! change notifications, and front-loads many small queries into a single
//! batched prefetch.

pub mod cache;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod prefetch;
pub mod rpc;
pub mod suppress;
pub mod ui;
pub mod watch;

pub use engine::{CacheEngine, EngineStats, RenderHooks};
pub use error::{RemcacheError, RemcacheResult};

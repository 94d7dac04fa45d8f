//! Batched prefetch of repository state
//!
//! A render trigger sends one `commands.run_parallel` request covering a
//! fixed probe list. Repository queries land in a transient result that
//! lives until the render ends; state-file existence checks are promoted
//! into the existence TTL cache where they outlive it.

pub mod batcher;
pub mod probes;
pub mod result;

pub use batcher::Prefetcher;
pub use probes::{is_command_probe, ProbeKey, ProbePlan, GIT_PROBES, STATE_FILES};
pub use result::{PrefetchResult, PrefetchState};

//! Lookup-key derivation for prefetched answers
//!
//! - [`command`]: reduce a git invocation to the batch's correlation key
//! - [`scope`]: decide whether an ancestor scan can answer a path query

pub mod command;
pub mod scope;

pub use command::{command_key, is_git_program, normalize, NormalizedCommand};
pub use scope::{AncestorScan, MarkerAnswer};

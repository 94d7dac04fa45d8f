//! CLI command implementations

pub mod config;
pub mod normalize;
pub mod plan;

pub use config::execute as config;
pub use normalize::execute as normalize;
pub use plan::execute as plan;

//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// remcache - cache coherence for remote filesystem access
///
/// Inspect configuration, the prefetch batch, and how command invocations
/// map onto prefetched results.
#[derive(Parser, Debug)]
#[command(name = "remcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REMCACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show or edit configuration
    Config(ConfigArgs),

    /// Reduce a command invocation to its prefetch lookup key
    Normalize(NormalizeArgs),

    /// Show the prefetch batch for a directory
    Plan(PlanArgs),
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.ttl_seconds)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Arguments for the normalize command
#[derive(Parser, Debug)]
pub struct NormalizeArgs {
    /// Working directory the command would run in
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Program and arguments, e.g. `-- git --no-pager status`
    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Absolute remote directory to prefetch
    pub directory: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Output format for inspection commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

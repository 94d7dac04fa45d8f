//! remcache - cache coherence for remote filesystem access
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use remcache::cli::{Cli, Commands};
use remcache::config::{Config, ConfigManager};
use remcache::error::RemcacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> RemcacheResult<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::from_override(cli.config.clone());

    // `config` may be about to create the file
    let config = match cli.command {
        Commands::Config(_) => config_manager.load_or_default().await?,
        _ => config_manager.load().await?,
    };
    init_logging(cli.verbose, &config);
    debug!("Using config at {}", config_manager.path().display());

    match cli.command {
        Commands::Config(args) => {
            remcache::cli::commands::config(args, &config_manager, &config).await
        }
        Commands::Normalize(args) => remcache::cli::commands::normalize(args).await,
        Commands::Plan(args) => remcache::cli::commands::plan(args, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("remcache=warn"),
        1 => EnvFilter::new("remcache=info"),
        _ => EnvFilter::new("remcache=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}

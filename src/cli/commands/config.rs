//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{RemcacheError, RemcacheResult};
use crate::ui::{self, UiContext};

/// Keys accepted by `config set`
const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "cache.ttl_seconds",
    "cache.max_entries",
    "watch.debug_logging",
    "watch.auto_register",
    "watch.recursive",
    "prefetch.enabled",
    "prefetch.metadata_dir",
    "prefetch.ancestor_markers",
    "prefetch.ancestor_max_depth",
    "rpc.timeout_secs",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> RemcacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> RemcacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> RemcacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> RemcacheResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply(&mut config, key, value) {
        if matches!(&e, RemcacheError::User(msg) if msg.starts_with("Unknown config key")) {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for valid in VALID_KEYS {
                ui::remark(&ctx, &format!("  {}", valid));
            }
        }
        return Err(e);
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one dot-separated key to `config`
fn apply(config: &mut Config, key: &str, value: &str) -> RemcacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,

        ["cache", "ttl_seconds"] => config.cache.ttl_seconds = parse_number(value)?,
        ["cache", "max_entries"] => config.cache.max_entries = parse_number(value)?,

        ["watch", "debug_logging"] => config.watch.debug_logging = parse_bool(value)?,
        ["watch", "auto_register"] => config.watch.auto_register = parse_bool(value)?,
        ["watch", "recursive"] => config.watch.recursive = parse_bool(value)?,

        ["prefetch", "enabled"] => config.prefetch.enabled = parse_bool(value)?,
        ["prefetch", "metadata_dir"] if value.is_empty() => {
            return Err(RemcacheError::User("prefetch.metadata_dir must not be empty".into()))
        }
        ["prefetch", "metadata_dir"] => config.prefetch.metadata_dir = value.to_string(),
        ["prefetch", "ancestor_markers"] => {
            config.prefetch.ancestor_markers = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        ["prefetch", "ancestor_max_depth"] => {
            config.prefetch.ancestor_max_depth = parse_number(value)?
        }

        ["rpc", "timeout_secs"] => config.rpc.timeout_secs = parse_number(value)?,

        _ => return Err(RemcacheError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_bool(value: &str) -> RemcacheResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(RemcacheError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> RemcacheResult<T> {
    value
        .parse()
        .map_err(|_| RemcacheError::User(format!("Invalid number: {}", value)))
}

fn parse_log_format(value: &str) -> RemcacheResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(RemcacheError::User(format!(
            "Invalid log format: {}. Use text or json",
            value
        ))),
    }
}

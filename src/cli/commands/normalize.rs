//! Normalize command - show the prefetch lookup key for an invocation

use crate::cli::args::{NormalizeArgs, OutputFormat};
use crate::error::{RemcacheError, RemcacheResult};
use crate::normalize::normalize;
use crate::prefetch::is_command_probe;
use crate::ui::{self, UiContext};
use serde_json::json;

/// Execute the normalize command
pub async fn execute(args: NormalizeArgs) -> RemcacheResult<()> {
    let Some((program, rest)) = args.command.split_first() else {
        return Err(RemcacheError::User("No command given".to_string()));
    };

    let normalized = normalize(program, rest).ok_or_else(|| {
        RemcacheError::User(format!(
            "Not normalizable, would query the server: {}",
            args.command.join(" ")
        ))
    })?;

    let directory = args
        .cwd
        .as_deref()
        .map(|cwd| normalized.effective_directory(cwd));
    let prefetched = is_command_probe(&normalized.key);

    match args.format {
        OutputFormat::Json => {
            let output = json!({
                "key": normalized.key,
                "directory": directory,
                "prefetched": prefetched,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::key_value(&ctx, "key", &normalized.key);
            if let Some(directory) = &directory {
                ui::key_value(&ctx, "directory", &directory.display().to_string());
            } else if let Some(override_dir) = &normalized.directory {
                ui::key_value(&ctx, "-C", &override_dir.display().to_string());
            }
            ui::key_value_status(
                &ctx,
                "prefetched",
                if prefetched { "yes" } else { "no" },
                prefetched,
            );
        }
    }

    Ok(())
}

//! Plan command - show the prefetch batch for a directory

use crate::cli::args::{OutputFormat, PlanArgs};
use crate::config::Config;
use crate::error::{RemcacheError, RemcacheResult};
use crate::prefetch::{ProbeKey, ProbePlan};
use crate::ui::{self, UiContext};
use serde_json::json;

/// Execute the plan command
pub async fn execute(args: PlanArgs, config: &Config) -> RemcacheResult<()> {
    if !args.directory.is_absolute() {
        return Err(RemcacheError::User(format!(
            "Directory must be an absolute remote path: {}",
            args.directory.display()
        )));
    }

    let plan = ProbePlan::build(&args.directory, &config.prefetch.metadata_dir);

    match args.format {
        OutputFormat::Json => {
            let output = json!({
                "directory": plan.directory,
                "commands": plan.commands,
                "ancestor_markers": config.prefetch.ancestor_markers,
                "ancestor_max_depth": config.prefetch.ancestor_max_depth,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => print_table(&plan, config),
    }

    Ok(())
}

fn print_table(plan: &ProbePlan, config: &Config) {
    let ctx = UiContext::detect();
    let (queries, state_files): (Vec<_>, Vec<_>) = plan
        .commands
        .iter()
        .partition(|c| matches!(ProbeKey::parse(&c.key), ProbeKey::Command(_)));

    ui::section(&ctx, &format!("Repository queries ({})", queries.len()));
    for command in &queries {
        ui::remark(&ctx, &format!("{} {}", command.cmd, command.args.join(" ")));
    }

    println!();
    ui::section(&ctx, &format!("State files ({})", state_files.len()));
    for command in &state_files {
        if let ProbeKey::StateFile(path) = ProbeKey::parse(&command.key) {
            ui::remark(&ctx, &path.display().to_string());
        }
    }

    println!();
    ui::section(&ctx, "Ancestor scan");
    ui::key_value(&ctx, "markers", &config.prefetch.ancestor_markers.join(", "));
    ui::key_value(
        &ctx,
        "max depth",
        &config.prefetch.ancestor_max_depth.to_string(),
    );
    if !config.prefetch.enabled {
        ui::step_warn_hint(&ctx, "Prefetch is disabled", "Set prefetch.enabled = true");
    }
}

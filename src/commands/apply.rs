//! `choro apply` - converge target files to match the declared state.
//!
//! Validation runs first and any failure aborts the whole run before a
//! single file is opened. Each file then converges independently; a
//! failed file aborts the run with the remaining files untouched.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use dialoguer::Confirm;
use reconcile::{ChangeKind, Engine};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::commands::{self, validate};
use crate::config::ChoroConfig;
use crate::ui;

pub fn run(ctx: &Context, config: &ChoroConfig, args: &ApplyArgs) -> Result<()> {
    ui::header("Applying Configuration");

    if args.dry_run {
        ui::warn("Dry run - no changes will be made");
        println!();
    }

    // All-or-nothing: no file is touched while any resource is invalid.
    validate::check_all(ctx, config)?;

    let targets = commands::filter_targets(config.ini_resources(), args.target.as_deref());
    if targets.is_empty() {
        ui::warn("No INI-backed resources to apply");
        return Ok(());
    }

    let engine = Engine::new();

    // Plan first so the confirmation prompt can show what is pending.
    let mut plans = Vec::new();
    let mut pending = 0;
    for resource in &targets {
        let batch = resource
            .batch()
            .with_context(|| format!("building batch for {}", resource.id()))?;
        let report = engine
            .plan(&batch)
            .with_context(|| format!("planning {}", resource.id()))?;
        pending += report.changes.len();
        plans.push((resource.id(), batch, report));
    }

    if pending == 0 {
        ui::success("All files already match the declared state");
        return Ok(());
    }

    for (id, batch, report) in &plans {
        ui::section(&format!("{id} ({})", batch.path().display()));
        for change in &report.changes {
            let symbol = match change.kind {
                ChangeKind::Added => "+".green(),
                ChangeKind::Changed => "~".yellow(),
                ChangeKind::Removed => "-".red(),
            };
            println!("  {symbol} {change}");
        }
    }
    println!();

    if args.dry_run {
        ui::dim("Dry run complete. Run without --dry-run to apply.");
        return Ok(());
    }

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Apply {pending} pending changes?"))
            .default(true)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            anyhow::bail!("Apply cancelled");
        }
    }

    let mut written = 0;
    for (id, batch, _) in &plans {
        let report = engine
            .apply(batch)
            .with_context(|| format!("applying {id}"))?;
        if report.written {
            written += 1;
            if !ctx.quiet {
                ui::success(&format!(
                    "{id}: {} change{} written",
                    report.changes.len(),
                    if report.changes.len() == 1 { "" } else { "s" }
                ));
            }
        } else {
            log::debug!("{id}: converged between plan and apply");
        }
    }

    println!();
    ui::success(&format!(
        "Apply complete - {written} file{} updated",
        if written == 1 { "" } else { "s" }
    ));
    Ok(())
}

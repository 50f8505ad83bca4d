//! `choro diff` - preview pending changes without writing anything.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use reconcile::{ChangeKind, Engine};
use std::fs;

use crate::Context;
use crate::cli::DiffArgs;
use crate::commands::{self, validate};
use crate::config::ChoroConfig;
use crate::ui;

pub fn run(ctx: &Context, config: &ChoroConfig, args: &DiffArgs) -> Result<()> {
    ui::header("Configuration Diff");

    validate::check_all(ctx, config)?;

    let targets = commands::filter_targets(config.ini_resources(), args.target.as_deref());
    if targets.is_empty() {
        ui::warn("No INI-backed resources to diff");
        return Ok(());
    }

    let engine = Engine::new();
    let mut pending = 0;

    for resource in targets {
        let batch = resource
            .batch()
            .with_context(|| format!("building batch for {}", resource.id()))?;
        let (report, planned) = engine
            .preview(&batch)
            .with_context(|| format!("planning {}", resource.id()))?;

        ui::section(&format!("{} ({})", resource.id(), batch.path().display()));

        if report.is_in_sync() {
            ui::success("In sync");
            continue;
        }
        pending += report.changes.len();

        for change in &report.changes {
            let symbol = match change.kind {
                ChangeKind::Added => "+".green(),
                ChangeKind::Changed => "~".yellow(),
                ChangeKind::Removed => "-".red(),
            };
            println!("  {symbol} {change}");
        }

        if args.full {
            let current = match fs::read_to_string(batch.path()) {
                Ok(text) => text,
                Err(_) => String::new(),
            };
            let secret_keys: Vec<&str> = batch
                .settings()
                .iter()
                .filter(|s| s.is_secret())
                .map(reconcile::Setting::key)
                .collect();
            show_text_diff(&current, &planned, &secret_keys);
        }
    }

    println!();
    if pending == 0 {
        ui::success("No changes - files match the declared state");
    } else {
        println!(
            "  {} pending change{}; run {} to converge",
            pending.to_string().bold(),
            if pending == 1 { "" } else { "s" },
            "choro apply".cyan()
        );
    }
    Ok(())
}

/// Render a line diff between the current and planned file content using
/// the `similar` crate. Lines holding a secret key are masked on both
/// sides of the diff.
fn show_text_diff(current: &str, planned: &str, secret_keys: &[&str]) {
    let mask = |line: &str| -> String {
        let key = line.split('=').next().unwrap_or_default().trim();
        if secret_keys.contains(&key) {
            format!("{key} = {}\n", reconcile::NEW_SECRET)
        } else {
            line.to_string()
        }
    };

    let diff = similar::TextDiff::from_lines(current, planned);
    for change in diff.iter_all_changes() {
        let line = mask(change.value());
        match change.tag() {
            similar::ChangeTag::Delete => print!("    {}", format!("- {line}").red()),
            similar::ChangeTag::Insert => print!("    {}", format!("+ {line}").green()),
            similar::ChangeTag::Equal => {}
        }
    }
}

//! `choro validate` - check every declared resource, touch nothing.

use anyhow::{Result, bail};
use colored::Colorize;

use crate::Context;
use crate::config::ChoroConfig;
use crate::ui;

/// Validate all resources, printing warnings and errors. Returns an error
/// when any resource fails, so apply can abort before any file I/O.
pub fn check_all(ctx: &Context, config: &ChoroConfig) -> Result<()> {
    let mut failures = 0;

    for resource in config.resources() {
        match resource.validate() {
            Ok(warnings) => {
                if !ctx.quiet {
                    println!("  {} {}", "✓".green(), resource.id());
                }
                for warning in warnings {
                    log::warn!("{}: {warning}", resource.id());
                    ui::warn(&format!("{}: {warning}", resource.id()));
                }
            }
            Err(err) => {
                ui::error(&format!("{}: {err}", resource.id()));
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!(
            "{failures} resource{} failed validation",
            if failures == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

pub fn run(ctx: &Context, config: &ChoroConfig) -> Result<()> {
    ui::header("Validating declared resources");

    if config.resources().is_empty() {
        ui::warn("No resources declared");
        return Ok(());
    }

    check_all(ctx, config)?;

    println!();
    ui::success("All resources valid");
    Ok(())
}

//! `choro show` - render the declared desired state.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::Context;
use crate::cli::ShowArgs;
use crate::config::ChoroConfig;
use crate::resource::{IniResource, Resource};
use crate::ui;

#[derive(Serialize)]
struct ResourceView {
    kind: &'static str,
    id: String,
    requires: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

fn view(resource: &dyn Resource, file: Option<&dyn IniResource>) -> ResourceView {
    ResourceView {
        kind: resource.kind(),
        id: resource.id(),
        requires: resource.requires().iter().map(ToString::to_string).collect(),
        file: file.map(|r| r.file_path().display().to_string()),
    }
}

pub fn run(ctx: &Context, config: &ChoroConfig, args: &ShowArgs) -> Result<()> {
    let mut views: Vec<ResourceView> = Vec::new();
    for router in &config.routers {
        views.push(view(router, None));
    }
    for subnet in &config.subnets {
        views.push(view(subnet, None));
    }
    for ini in config.ini_resources() {
        views.push(view(ini as &dyn Resource, Some(ini)));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    ui::header("Declared Resources");

    if views.is_empty() {
        ui::warn("No resources declared");
        return Ok(());
    }

    for v in &views {
        println!("  {} {}", v.kind.cyan().bold(), v.id);
        if let Some(file) = &v.file {
            ui::kv("file", file);
        }
        if !v.requires.is_empty() && !ctx.quiet {
            ui::kv("requires", &v.requires.join(", "));
        }
    }
    println!();
    Ok(())
}

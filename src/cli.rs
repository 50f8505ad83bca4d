use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "choro")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative INI configuration for OpenStack networking services", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to ~/.config/choro/config.toml)
    #[arg(short, long, global = true, env = "CHORO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate every declared resource without touching any file
    Validate,

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Converge target files to match the declared state
    Apply(ApplyArgs),

    /// Show the declared resources and their dependency edges
    Show(ShowArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Only diff this resource kind (e.g. ml2, l3_agent)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Show the full file rewrite, not just the settings that change
    #[arg(long)]
    pub full: bool,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Don't make changes, just show what would happen
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Only apply this resource kind (e.g. ml2, l3_agent)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Emit machine-readable JSON instead of the table
    #[arg(long)]
    pub json: bool,
}

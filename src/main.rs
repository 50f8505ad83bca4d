mod cli;
mod commands;
mod config;
mod error;
mod resource;
mod ui;
mod validate;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::ChoroConfig;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Validate => {
            let config = ChoroConfig::load(cli.config.as_deref())?;
            commands::validate::run(&ctx, &config)
        }
        Command::Diff(args) => {
            let config = ChoroConfig::load(cli.config.as_deref())?;
            commands::diff::run(&ctx, &config, &args)
        }
        Command::Apply(args) => {
            let config = ChoroConfig::load(cli.config.as_deref())?;
            commands::apply::run(&ctx, &config, &args)
        }
        Command::Show(args) => {
            let config = ChoroConfig::load(cli.config.as_deref())?;
            commands::show::run(&ctx, &config, &args)
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "choro", &mut io::stdout());
            Ok(())
        }
    }
}

//! ImportGuard CLI
//!
//! Checks Go imports against path-scoped rules, caching results per file.

mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{CacheCommands, Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(has_violations) => {
            if has_violations {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    match &cli.command {
        Commands::Check {
            patterns,
            format,
            refresh,
        } => commands::check::run_check(cli, patterns, *format, *refresh),
        Commands::Init { force } => commands::init::run_init(*force).map(|_| false),
        Commands::Cache { command } => match command {
            CacheCommands::Stats { format } => {
                commands::cache::run_cache_stats(cli, *format).map(|_| false)
            }
            CacheCommands::Show { file } => commands::cache::run_cache_show(cli, file),
            CacheCommands::Clear => commands::cache::run_cache_clear(cli).map(|_| false),
        },
    }
}

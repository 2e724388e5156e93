//! Subcommand implementations

pub mod cache;
pub mod check;
pub mod init;

use miette::{IntoDiagnostic, Result};
use tracing::info;

use importguard_core::GuardConfig;

use crate::cli::Cli;

/// Loads the configuration named by `--config`, or discovers one in the
/// working directory.
pub fn load_config(cli: &Cli) -> Result<GuardConfig> {
    let mut config = if let Some(ref path) = cli.config {
        GuardConfig::from_file(path).into_diagnostic()?
    } else if let Some(path) = GuardConfig::discover(".") {
        info!("Using config: {}", path.display());
        GuardConfig::from_file(&path).into_diagnostic()?
    } else {
        info!("No config file found, using defaults");
        GuardConfig::new()
    };

    if cli.no_cache {
        config.cache = false;
    }

    Ok(config)
}

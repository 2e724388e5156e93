//! Cache command implementations

use std::path::Path;
use std::sync::Arc;

use importguard_core::file_finder::relative_slash_path;
use importguard_core::{CacheStore, ContentHashes, GuardConfig, OsFileSystem, Persistence};
use miette::{IntoDiagnostic, Result};
use tracing::{info, warn};

use crate::cli::{Cli, OutputFormat};
use crate::commands::load_config;

fn open_cache(config: &GuardConfig) -> Result<CacheStore> {
    let base_dir = config.resolved_base_dir();
    CacheStore::open_on_disk(config.cache_file(&base_dir)).into_diagnostic()
}

pub fn run_cache_stats(cli: &Cli, format: OutputFormat) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_cache(&config)?;
    let stats = store.get_stats();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": store.path().display().to_string(),
                "stats": stats,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).into_diagnostic()?
            );
        }
        OutputFormat::Text => {
            println!("Cache: {}", store.path().display());
            println!("{}", stats);
        }
    }

    Ok(())
}

/// Prints the cached violations of `file`. Returns true if it has none cached.
pub fn run_cache_show(cli: &Cli, file: &str) -> Result<bool> {
    let config = load_config(cli)?;
    let store = open_cache(&config)?;
    let key = relative_slash_path(Path::new(file), &config.resolved_base_dir());

    match store.has_entry(&key) {
        Ok(entry) => {
            println!("{} ({} violations)", entry.file, entry.violations.len());
            for violation in &entry.violations {
                println!(
                    "  {} [{}]: {}",
                    violation.import, violation.rule, violation.cause
                );
                if !violation.details.is_empty() {
                    println!("    {}", violation.details);
                }
            }
            Ok(false)
        }
        Err(e) if e.is_not_found() => {
            eprintln!("No cache entry for {}", key);
            Ok(true)
        }
        Err(e) => Err(e).into_diagnostic(),
    }
}

/// Deletes the cache file and its content hashes, even when the cache is
/// unreadable.
pub fn run_cache_clear(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let path = config.cache_file(&config.resolved_base_dir());

    match CacheStore::open_on_disk(&path) {
        Ok(store) => {
            let count = store.len();
            store.clear().into_diagnostic()?;
            info!("Removed {} ({} entries)", path.display(), count);
        }
        Err(e) => {
            warn!("Cache is unreadable ({}), removing it", e);
            Persistence::new(&path, Arc::new(OsFileSystem))
                .remove()
                .into_diagnostic()?;
            info!("Removed {}", path.display());
        }
    }
    ContentHashes::remove(&path).into_diagnostic()?;

    Ok(())
}

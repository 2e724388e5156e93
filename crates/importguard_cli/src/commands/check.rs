//! Check command implementation

use importguard_core::Checker;
use miette::{IntoDiagnostic, Result};

use crate::cli::{Cli, OutputFormat};
use crate::commands::load_config;
use crate::output::output_results;

pub fn run_check(
    cli: &Cli,
    patterns: &[String],
    format: OutputFormat,
    refresh: bool,
) -> Result<bool> {
    let config = load_config(cli)?;

    let checker = Checker::new(config).into_diagnostic()?.with_refresh(refresh);

    let (results, failures) = checker.check_patterns(patterns).into_diagnostic()?;

    if !failures.is_empty() {
        eprintln!("\n{} file(s) failed to check:", failures.len());
        for (path, error) in &failures {
            eprintln!("  {}: {}", path.display(), error);
        }
    }

    let has_violations = output_results(&results, format)?;

    Ok(has_violations || !failures.is_empty())
}

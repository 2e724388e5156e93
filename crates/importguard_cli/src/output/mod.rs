//! Output formatting module

mod json;
mod text;

use importguard_core::CheckResult;
use miette::Result;

use crate::cli::OutputFormat;

/// Prints `results` and returns whether any file has violations.
pub fn output_results(results: &[CheckResult], format: OutputFormat) -> Result<bool> {
    let has_violations = results.iter().any(|r| r.has_violations());

    match format {
        OutputFormat::Json => json::output_json(results)?,
        OutputFormat::Text => text::output_text(results),
    }

    Ok(has_violations)
}

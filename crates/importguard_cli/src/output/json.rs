//! JSON output formatter

use importguard_core::CheckResult;
use miette::{IntoDiagnostic, Result};

pub fn output_json(results: &[CheckResult]) -> Result<()> {
    let output: Vec<_> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "path": r.file,
                "from_cache": r.from_cache,
                "violations": r.violations,
            })
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&output).into_diagnostic()?
    );
    Ok(())
}

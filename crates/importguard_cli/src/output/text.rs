//! Text output formatter

use importguard_core::CheckResult;

pub fn output_text(results: &[CheckResult]) {
    for result in results {
        if result.violations.is_empty() {
            continue;
        }

        println!("\n{}:", result.file);
        for violation in &result.violations {
            println!(
                "  {} [{}]: {}",
                violation.details, violation.rule, violation.cause
            );
        }
    }

    let total_files = results.len();
    let total_violations: usize = results.iter().map(|r| r.violations.len()).sum();
    let cached = results.iter().filter(|r| r.from_cache).count();

    println!();
    println!(
        "Checked {} files ({} from cache), found {} violations",
        total_files, cached, total_violations
    );
}

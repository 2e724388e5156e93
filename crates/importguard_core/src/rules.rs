//! Path-scoped import rules.

use std::collections::HashSet;

use importguard_cache::Violation;
use serde::{Deserialize, Serialize};

use crate::imports::Import;

/// Rule id reported for imports missing from an allow-list.
pub const NOT_ALLOWED_RULE: &str = "not-allowed";

/// Import constraints for every file under a path prefix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportRule {
    /// Path prefix, relative to the project root. Empty matches every file.
    #[serde(default)]
    pub path: String,

    /// If non-empty, only these imports (and their sub-packages) are allowed.
    #[serde(default)]
    pub allow: Vec<String>,

    /// Imports that are always reported.
    #[serde(default)]
    pub prohibit: Vec<Prohibition>,
}

/// A prohibited import and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Prohibition {
    /// The prohibited import (sub-packages included).
    pub import: String,

    /// Human-readable cause.
    pub cause: String,

    /// Rule id; defaults to `no-<import>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Prohibition {
    /// Returns the rule id reported for this prohibition.
    pub fn rule_id(&self) -> String {
        match &self.rule {
            Some(rule) => rule.clone(),
            None => format!("no-{}", self.import.replace(['/', '.'], "-")),
        }
    }
}

impl ImportRule {
    /// Returns true if this rule applies to `file` (slash-separated, relative).
    pub fn applies_to(&self, file: &str) -> bool {
        let prefix = self.path.trim_start_matches("./");
        if prefix.is_empty() || prefix.ends_with('/') {
            return file.starts_with(prefix);
        }
        file == prefix
            || file
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    fn allows(&self, import: &str) -> bool {
        self.allow.is_empty() || self.allow.iter().any(|a| import_matches(a, import))
    }
}

/// Returns true if `import` is `pattern` or one of its sub-packages.
pub fn import_matches(pattern: &str, import: &str) -> bool {
    import
        .strip_prefix(pattern)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// An ordered collection of import rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ImportRule>,
}

impl RuleSet {
    /// Creates a rule set.
    pub fn new(rules: Vec<ImportRule>) -> Self {
        Self { rules }
    }

    /// Returns the rules.
    pub fn rules(&self) -> &[ImportRule] {
        &self.rules
    }

    /// Evaluates the imports of `file` against every applicable rule.
    ///
    /// Violations are in source order; an (import, rule) pair is reported once.
    pub fn evaluate(&self, file: &str, imports: &[Import]) -> Vec<Violation> {
        let applicable: Vec<&ImportRule> =
            self.rules.iter().filter(|r| r.applies_to(file)).collect();
        if applicable.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut violations = Vec::new();

        for import in imports {
            for rule in &applicable {
                let (rule_id, cause) = match rule
                    .prohibit
                    .iter()
                    .find(|p| import_matches(&p.import, &import.path))
                {
                    Some(prohibition) => (prohibition.rule_id(), prohibition.cause.clone()),
                    None if !rule.allows(&import.path) => (
                        NOT_ALLOWED_RULE.to_string(),
                        format!(
                            "\"{}\" is not in the allow-list for \"{}\"",
                            import.path, rule.path
                        ),
                    ),
                    None => continue,
                };

                if !seen.insert((import.path.clone(), rule_id.clone())) {
                    continue;
                }

                let details = format!(
                    "{}:{}: import \"{}\" (rule scope \"{}\")",
                    file, import.line, import.path, rule.path
                );
                violations.push(Violation::new(
                    file,
                    import.path.as_str(),
                    rule_id,
                    cause,
                    details,
                ));
            }
        }

        violations
    }
}

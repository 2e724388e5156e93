//! Cache entry types.

use serde::{Deserialize, Serialize};

/// A single import-rule infraction found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// Source file containing the offending import.
    pub file: String,

    /// The offending import identifier.
    pub import: String,

    /// Identifier of the rule that was broken.
    pub rule: String,

    /// Human-readable cause.
    pub cause: String,

    /// Extended detail text.
    pub details: String,

    /// Set on records served from the cache. Never persisted.
    #[serde(default)]
    pub cached: bool,
}

impl Violation {
    /// Creates a freshly computed (uncached) violation.
    pub fn new(
        file: impl Into<String>,
        import: impl Into<String>,
        rule: impl Into<String>,
        cause: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            import: import.into(),
            rule: rule.into(),
            cause: cause.into(),
            details: details.into(),
            cached: false,
        }
    }
}

/// The violations stored for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// File path; the key of this entry.
    pub file: String,

    /// Violations in the order they were reported.
    pub violations: Vec<Violation>,
}

impl CacheEntry {
    /// Creates a new cache entry.
    pub fn new(file: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            file: file.into(),
            violations,
        }
    }

    /// Returns the first violation whose file disagrees with the entry key.
    pub fn find_mismatch(&self) -> Option<&Violation> {
        self.violations.iter().find(|v| v.file != self.file)
    }

    /// Sets the cached marker on every violation.
    pub(crate) fn mark_cached(&mut self, cached: bool) {
        for violation in &mut self.violations {
            violation.cached = cached;
        }
    }
}

//! Aggregate cache counters.

use std::fmt;

use serde::Serialize;

/// A snapshot of the cache's aggregate counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of files with an entry.
    pub entries: usize,

    /// Total violations across all entries.
    pub violations: usize,

    /// Encoded size of the current state, in bytes.
    pub size_bytes: usize,

    /// Lookups that found an entry since the store was opened.
    pub hits: u64,

    /// Lookups that found nothing since the store was opened.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that were hits, or `None` before the first lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        (lookups > 0).then(|| self.hits as f64 / lookups as f64)
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries, {} violations, {} bytes",
            self.entries, self.violations, self.size_bytes
        )?;
        if let Some(rate) = self.hit_rate() {
            write!(
                f,
                ", {} hits / {} misses ({:.1}% hit rate)",
                self.hits,
                self.misses,
                rate * 100.0
            )?;
        }
        Ok(())
    }
}

//! Cache error types.

use thiserror::Error;

/// Errors that can occur in the cache system.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem open/read/write/rename failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted bytes do not form a valid cache file.
    #[error("Corrupted cache: {0}")]
    Corrupted(String),

    /// No entry is stored for the requested file.
    #[error("No cache entry for {0}")]
    EntryNotFound(String),

    /// A record handed to the cache is inconsistent with its key or too large to encode.
    #[error("Invalid cache record: {0}")]
    Validation(String),
}

impl CacheError {
    /// Creates a corrupted cache error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Returns true for a lookup miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_))
    }
}

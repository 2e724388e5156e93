//! Checker error types.

use thiserror::Error;

/// Errors that can occur while checking files.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O error.
    #[error("File error: {0}")]
    File(String),

    /// Cache error.
    #[error("Cache error: {0}")]
    Cache(#[from] importguard_cache::CacheError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GuardError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a file error.
    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }
}

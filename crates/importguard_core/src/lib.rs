//! # importguard_core
//!
//! Import rule checking for Go projects.
//!
//! This crate provides:
//! - Configuration loading
//! - Import extraction from Go sources
//! - Path-scoped rule evaluation
//! - The cached, parallel `Checker`
//! - Content hashes that invalidate cache entries of edited files
//!
//! ## Example
//!
//! ```rust,ignore
//! use importguard_core::{Checker, GuardConfig};
//!
//! let config = GuardConfig::from_file(".importguard.jsonc")?;
//! let checker = Checker::new(config)?;
//!
//! let (results, _failures) = checker.check_patterns(&["./...".to_string()])?;
//! for result in results {
//!     println!("{}: {} violations", result.file, result.violations.len());
//! }
//! ```

mod checker;
mod config;
mod error;
pub mod file_finder;
mod hashes;
pub mod imports;
pub mod rules;

pub use checker::{CheckFilesResult, CheckResult, Checker};
pub use config::GuardConfig;
pub use error::GuardError;
pub use hashes::ContentHashes;
pub use imports::{Import, extract_imports};
pub use rules::{ImportRule, Prohibition, RuleSet};

pub use importguard_cache::{
    CacheEntry, CacheError, CacheStats, CacheStore, OsFileSystem, Persistence, Violation,
};

//! # importguard_cache
//!
//! Persistent violation cache for ImportGuard.
//!
//! Stores, per source file, the import-rule violations computed for it, so a
//! later run can skip re-analyzing files it has already seen.
//!
//! ## Layers
//!
//! 1. **Codec** ([`codec`]): versioned binary format with LEB128 varint
//!    lengths and counts.
//! 2. **Persistence** ([`Persistence`]): write-to-temp-then-rename through an
//!    injectable [`FileSystem`].
//! 3. **Store** ([`CacheStore`]): the in-memory index behind a
//!    single-writer/multi-reader lock, written through on every mutation.
//! 4. **Stats** ([`CacheStats`]): aggregate counters derived from the store.
//!
//! ## Example
//!
//! ```rust,ignore
//! use importguard_cache::{CacheStore, Violation};
//!
//! let store = CacheStore::open_on_disk(".importguard-cache/violations.bin")?;
//! store.add_file_with_violations(
//!     "a.go",
//!     vec![Violation::new("a.go", "unsafe", "no-unsafe", "unsafe is banned", "")],
//! )?;
//!
//! let entry = store.has_entry("a.go")?;
//! assert!(entry.violations.iter().all(|v| v.cached));
//! ```

pub mod codec;
mod entry;
mod error;
mod fs;
mod persist;
mod stats;
mod store;

pub use entry::{CacheEntry, Violation};
pub use error::CacheError;
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use persist::Persistence;
pub use stats::CacheStats;
pub use store::CacheStore;

//! Content hashes of the sources behind cache entries.
//!
//! The violation cache stores results only. This side file records, per cache
//! key, the blake3 hash of the source the result was computed from, so an
//! edited file is re-analyzed instead of served from the cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use importguard_cache::{OsFileSystem, Persistence};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::GuardError;

/// Source hashes keyed by cache key, stored as JSON next to the cache file.
#[derive(Debug)]
pub struct ContentHashes {
    persistence: Persistence,
    hashes: RwLock<BTreeMap<String, String>>,
}

impl ContentHashes {
    /// Path of the hash file kept alongside `cache_file`.
    pub fn path_for(cache_file: &Path) -> PathBuf {
        cache_file.with_extension("hashes.json")
    }

    /// Hashes source text.
    pub fn hash_content(source: &str) -> String {
        blake3::hash(source.as_bytes()).to_hex().to_string()
    }

    /// Loads the hashes for `cache_file`.
    ///
    /// A missing or unreadable file yields an empty set.
    pub fn load(cache_file: &Path) -> Self {
        let persistence = Persistence::new(Self::path_for(cache_file), Arc::new(OsFileSystem));

        let hashes = match persistence.load() {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(hashes) => hashes,
                Err(e) => {
                    warn!(
                        "Ignoring unreadable hash file {}: {}",
                        persistence.path().display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(
                    "Failed to read hash file {}: {}",
                    persistence.path().display(),
                    e
                );
                BTreeMap::new()
            }
        };
        debug!("Loaded {} content hashes", hashes.len());

        Self {
            persistence,
            hashes: RwLock::new(hashes),
        }
    }

    /// Returns true if `file` was last cached from content hashing to `hash`.
    pub fn matches(&self, file: &str, hash: &str) -> bool {
        self.hashes.read().get(file).is_some_and(|h| h == hash)
    }

    /// Records new hashes and writes the file.
    pub fn update(
        &self,
        updates: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), GuardError> {
        let mut hashes = self.hashes.write();
        hashes.extend(updates);

        let bytes = serde_json::to_vec(&*hashes)?;
        self.persistence.store(&bytes)?;
        Ok(())
    }

    /// Deletes the hash file kept alongside `cache_file`.
    pub fn remove(cache_file: &Path) -> Result<(), GuardError> {
        Persistence::new(Self::path_for(cache_file), Arc::new(OsFileSystem)).remove()?;
        Ok(())
    }
}

//! The violation cache store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::{
    CacheEntry, CacheError, CacheStats, FileSystem, OsFileSystem, Persistence, Violation, codec,
};

/// Violations per file, persisted on every mutation.
///
/// ## Concurrency
///
/// Lookups and stats share a read lock. Mutations hold the write lock for the
/// whole replace + encode + persist sequence, so readers never observe a state
/// that is not also what the cache file holds (or is about to hold).
#[derive(Debug)]
pub struct CacheStore {
    persistence: Persistence,
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    /// Opens the cache at `path`, loading it if the file exists.
    ///
    /// A missing file yields an empty store. Malformed contents fail with
    /// [`CacheError::Corrupted`] rather than being discarded.
    pub fn open(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Self, CacheError> {
        let persistence = Persistence::new(path, fs);

        let entries = match persistence.load()? {
            Some(bytes) => {
                let decoded = codec::decode(&bytes)?;
                let mut entries = HashMap::with_capacity(decoded.len());
                for entry in decoded {
                    if let Some(duplicate) = entries.insert(entry.file.clone(), entry) {
                        return Err(CacheError::corrupted(format!(
                            "duplicate entry for {}",
                            duplicate.file
                        )));
                    }
                }
                info!(
                    "Loaded {} cache entries from {}",
                    entries.len(),
                    persistence.path().display()
                );
                entries
            }
            None => HashMap::new(),
        };

        Ok(Self {
            persistence,
            entries: RwLock::new(entries),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    /// Opens the cache at `path` on the real filesystem.
    pub fn open_on_disk(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        Self::open(path, Arc::new(OsFileSystem))
    }

    /// Path of the backing cache file.
    pub fn path(&self) -> &Path {
        self.persistence.path()
    }

    /// Replaces the entry for `file` with `violations` and persists the store.
    ///
    /// Every violation must name `file`. Incoming `cached` markers are
    /// cleared. If persisting fails the previous entry is restored.
    pub fn add_file_with_violations(
        &self,
        file: impl Into<String>,
        violations: Vec<Violation>,
    ) -> Result<(), CacheError> {
        let entry = Self::prepare(CacheEntry::new(file, violations))?;
        self.replace(vec![entry])
    }

    /// Replaces several entries and persists the store once.
    ///
    /// Either every entry is stored or, on failure, none is.
    pub fn extend(&self, entries: impl IntoIterator<Item = CacheEntry>) -> Result<(), CacheError> {
        let entries = entries
            .into_iter()
            .map(Self::prepare)
            .collect::<Result<Vec<_>, _>>()?;

        if entries.is_empty() {
            return Ok(());
        }
        self.replace(entries)
    }

    /// Looks up the entry for `file`.
    ///
    /// Returns a copy whose violations all have `cached == true`, or
    /// [`CacheError::EntryNotFound`].
    pub fn has_entry(&self, file: &str) -> Result<CacheEntry, CacheError> {
        let found = self.entries.read().get(file).cloned();

        match found {
            Some(mut entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", file);
                entry.mark_cached(true);
                Ok(entry)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss for {}", file);
                Err(CacheError::EntryNotFound(file.to_string()))
            }
        }
    }

    /// Removes the entry for `file`. Returns whether one existed.
    pub fn remove(&self, file: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.write();
        let Some(previous) = entries.remove(file) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&entries) {
            entries.insert(previous.file.clone(), previous);
            warn!("Failed to persist removal of {}: {}", file, e);
            return Err(e);
        }
        Ok(true)
    }

    /// Drops every entry and deletes the cache file.
    pub fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.write();
        let previous = std::mem::take(&mut *entries);

        if let Err(e) = self.persistence.remove() {
            *entries = previous;
            return Err(e);
        }

        info!(
            "Cleared {} cache entries from {}",
            previous.len(),
            self.path().display()
        );
        Ok(())
    }

    /// Returns a snapshot of the aggregate counters.
    pub fn get_stats(&self) -> CacheStats {
        let entries = self.entries.read();

        CacheStats {
            entries: entries.len(),
            violations: entries.values().map(|e| e.violations.len()).sum(),
            size_bytes: codec::encoded_len(entries.values()),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Returns the number of cached files.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the cached file paths, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.entries.read().keys().cloned().collect();
        files.sort_unstable();
        files
    }

    fn prepare(mut entry: CacheEntry) -> Result<CacheEntry, CacheError> {
        if let Some(mismatch) = entry.find_mismatch() {
            return Err(CacheError::validation(format!(
                "violation for {} cannot be stored under {}",
                mismatch.file, entry.file
            )));
        }
        entry.mark_cached(false);
        Ok(entry)
    }

    fn replace(&self, batch: Vec<CacheEntry>) -> Result<(), CacheError> {
        let mut entries = self.entries.write();

        let mut previous = Vec::with_capacity(batch.len());
        for entry in batch {
            let key = entry.file.clone();
            let old = entries.insert(key.clone(), entry);
            previous.push((key, old));
        }

        if let Err(e) = self.persist(&entries) {
            // Unwind in reverse so a key repeated within the batch ends up at
            // its pre-batch value.
            for (key, old) in previous.into_iter().rev() {
                match old {
                    Some(old) => entries.insert(key, old),
                    None => entries.remove(&key),
                };
            }
            warn!("Failed to persist cache, changes rolled back: {}", e);
            return Err(e);
        }

        debug!("Stored {} entries, {} total", previous.len(), entries.len());
        Ok(())
    }

    fn persist(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
        let mut sorted: Vec<&CacheEntry> = entries.values().collect();
        sorted.sort_unstable_by(|a, b| a.file.cmp(&b.file));

        let bytes = codec::encode(sorted.iter().copied())?;
        self.persistence.store(&bytes)
    }
}

//! Atomic reads and writes of the cache file.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{CacheError, FileSystem};

/// Reads and writes one cache file through a [`FileSystem`].
///
/// Writes go to `<path>.tmp` and are renamed over `<path>`, so a reader never
/// observes a half-written file.
#[derive(Clone)]
pub struct Persistence {
    path: PathBuf,
    tmp_path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl Persistence {
    /// Creates a persistence layer for `path`.
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        let path = path.into();
        let mut tmp = OsString::from(path.as_os_str());
        tmp.push(".tmp");

        Self {
            path,
            tmp_path: PathBuf::from(tmp),
            fs,
        }
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cache file. Returns `None` if it does not exist.
    pub fn load(&self) -> Result<Option<Vec<u8>>, CacheError> {
        match self.fs.read(&self.path) {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), self.path.display());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cache file found at {}", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the cache file with `bytes`.
    pub fn store(&self, bytes: &[u8]) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            self.fs.create_dir_all(parent)?;
        }

        if let Err(e) = self.fs.write(&self.tmp_path, bytes) {
            self.discard_tmp();
            return Err(e.into());
        }

        if let Err(e) = self.fs.rename(&self.tmp_path, &self.path) {
            self.discard_tmp();
            return Err(e.into());
        }

        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }

    /// Deletes the cache file. A missing file is not an error.
    pub fn remove(&self) -> Result<(), CacheError> {
        match self.fs.remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn discard_tmp(&self) {
        match self.fs.remove_file(&self.tmp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove temporary cache file {}: {}",
                self.tmp_path.display(),
                e
            ),
        }
    }
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

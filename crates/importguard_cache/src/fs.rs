//! Filesystem capability used by the persistence layer.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// The filesystem operations the cache needs.
///
/// Implementations report a missing file through [`io::ErrorKind::NotFound`].
pub trait FileSystem: Send + Sync {
    /// Creates a directory and all of its parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Reads the full contents of a file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Creates or truncates a file and writes `contents` to it durably.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Renames `from` to `to`, replacing `to` if it exists.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Removes a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(contents)?;
        file.sync_all()
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// An in-memory filesystem.
///
/// Files live in a map keyed by path. Writing requires the parent directory to
/// have been created, like a real disk. [`MemoryFileSystem::set_fail_writes`]
/// makes every write and rename fail, for exercising error paths.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<HashSet<PathBuf>>,
    fail_writes: AtomicBool,
}

impl MemoryFileSystem {
    /// Creates an empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes and renames fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of a file's contents, if present.
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().get(path).cloned()
    }

    /// Returns true if a file exists at `path`.
    pub fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    /// Stores a file directly, creating its parent directories.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.mark_dirs(parent);
        }
        self.files.lock().insert(path, contents.into());
    }

    fn mark_dirs(&self, path: &Path) {
        let mut dirs = self.dirs.lock();
        for ancestor in path.ancestors() {
            dirs.insert(ancestor.to_path_buf());
        }
    }

    fn check_writable(&self, path: &Path) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("writes disabled: {}", path.display()),
            ));
        }
        Ok(())
    }

    fn check_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                if self.dirs.lock().contains(parent) {
                    Ok(())
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no such directory: {}", parent.display()),
                    ))
                }
            }
            _ => Ok(()),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check_writable(path)?;
        self.mark_dirs(path);
        Ok(())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.contents(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.check_writable(path)?;
        self.check_parent(path)?;
        self.files.lock().insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check_writable(to)?;
        self.check_parent(to)?;
        let mut files = self.files.lock();
        let contents = files.remove(from).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", from.display()),
            )
        })?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.check_writable(path)?;
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                )
            })
    }
}

use crate::error::GuardError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// Discovers source files, filtering by include/exclude globs.
///
/// Globs are matched against paths relative to the base directory, with `/`
/// separators.
pub struct FileFinder {
    include_globs: Option<GlobSet>,
    exclude_globs: Option<GlobSet>,
}

impl FileFinder {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, GuardError> {
        let include_globs = Self::build_globset(include)?;
        let exclude_globs = Self::build_globset(exclude)?;

        Ok(Self {
            include_globs,
            exclude_globs,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, GuardError> {
        if patterns.is_empty() {
            return Ok(None);
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| GuardError::config(format!("Invalid glob pattern: {}", e)))?;
            builder.add(glob);
        }

        let globset = builder
            .build()
            .map_err(|e| GuardError::config(format!("Failed to build globset: {}", e)))?;

        Ok(Some(globset))
    }

    /// Checks if a relative path should be ignored based on include/exclude patterns.
    pub fn should_ignore(&self, relative: &str) -> bool {
        if self
            .exclude_globs
            .as_ref()
            .is_some_and(|excludes| excludes.is_match(relative))
        {
            return true;
        }

        if self
            .include_globs
            .as_ref()
            .is_some_and(|includes| !includes.is_match(relative))
        {
            return true;
        }

        false
    }

    /// Expands `patterns` (files, directories or globs) under `base_dir`.
    ///
    /// Explicit files are always returned; directory and glob results are
    /// filtered by the include/exclude patterns.
    pub fn discover_files(
        &self,
        patterns: &[String],
        base_dir: &Path,
    ) -> Result<Vec<PathBuf>, GuardError> {
        let mut files = Vec::new();

        let mut glob_builder = GlobSetBuilder::new();
        let mut has_globs = false;

        for pattern in patterns {
            let path = base_dir.join(pattern);
            let metadata = path.symlink_metadata();

            if metadata.as_ref().is_ok_and(|m| m.file_type().is_file()) {
                files.push(path);
            } else if metadata.as_ref().is_ok_and(|m| m.file_type().is_dir()) {
                self.walk(&path, base_dir, |_| true, &mut files);
            } else {
                let glob = Glob::new(pattern).map_err(|e| {
                    GuardError::config(format!("Invalid pattern '{}': {}", pattern, e))
                })?;
                glob_builder.add(glob);
                has_globs = true;
            }
        }

        if has_globs {
            let glob_set = glob_builder
                .build()
                .map_err(|e| GuardError::config(format!("Failed to build globset: {}", e)))?;
            self.walk(base_dir, base_dir, |rel| glob_set.is_match(rel), &mut files);
        }

        files.sort();
        files.dedup();

        info!("Discovered {} files to check", files.len());
        Ok(files)
    }

    fn walk(
        &self,
        root: &Path,
        base_dir: &Path,
        matches: impl Fn(&str) -> bool,
        files: &mut Vec<PathBuf>,
    ) {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = relative_slash_path(path, base_dir);
            if matches(&relative) && !self.should_ignore(&relative) {
                files.push(path.to_path_buf());
            }
        }
    }
}

/// Renders `path` relative to `base_dir` with `/` separators.
///
/// A path outside `base_dir` keeps its root, so `/tmp/a.go` never shares a
/// key with `tmp/a.go` under the base.
pub fn relative_slash_path(path: &Path, base_dir: &Path) -> String {
    let relative = path.strip_prefix(base_dir).unwrap_or(path);

    let mut key = String::new();
    for component in relative.components() {
        let segment = match component {
            Component::Prefix(prefix) => {
                key.push_str(&prefix.as_os_str().to_string_lossy());
                continue;
            }
            Component::RootDir => {
                key.push('/');
                continue;
            }
            Component::CurDir => continue,
            Component::ParentDir => "..".into(),
            Component::Normal(name) => name.to_string_lossy(),
        };
        if !key.is_empty() && !key.ends_with('/') {
            key.push('/');
        }
        key.push_str(&segment);
    }
    key
}

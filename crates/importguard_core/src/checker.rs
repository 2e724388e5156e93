//! Cached import checking.

use std::fs;
use std::path::{Path, PathBuf};

use importguard_cache::{CacheEntry, CacheStore, Violation};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::file_finder::{FileFinder, relative_slash_path};
use crate::hashes::ContentHashes;
use crate::imports::extract_imports;
use crate::rules::RuleSet;
use crate::{GuardConfig, GuardError};

/// Result type for `check_files` and `check_patterns`.
///
/// Contains a tuple of:
/// - Successful check results
/// - Failed files with their errors (path and error)
pub type CheckFilesResult = Result<(Vec<CheckResult>, Vec<(PathBuf, GuardError)>), GuardError>;

/// The outcome of checking one file.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Path that was read.
    pub path: PathBuf,

    /// Cache key: path relative to the base directory, `/`-separated.
    pub file: String,

    /// Violations found (or served from the cache).
    pub violations: Vec<Violation>,

    /// Whether the result came from the cache.
    pub from_cache: bool,
}

impl CheckResult {
    /// Returns true if any violation was found.
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Checks Go files against import rules, reusing cached results.
pub struct Checker {
    rules: RuleSet,
    finder: FileFinder,
    base_dir: PathBuf,
    cache: Option<CacheStore>,
    hashes: Option<ContentHashes>,
    refresh: bool,
}

impl Checker {
    /// Creates a checker, opening the cache unless it is disabled.
    ///
    /// A cache that cannot be opened (unreadable or corrupted) is reported
    /// and the checker runs uncached.
    pub fn new(config: GuardConfig) -> Result<Self, GuardError> {
        let base_dir = config.resolved_base_dir();

        let finder = FileFinder::new(&config.include, &config.exclude)?;

        let (cache, hashes) = if config.cache {
            let cache_file = config.cache_file(&base_dir);
            match CacheStore::open_on_disk(&cache_file) {
                Ok(store) => (Some(store), Some(ContentHashes::load(&cache_file))),
                Err(e) => {
                    warn!(
                        "Failed to open cache {}: {}. Running without cache.",
                        cache_file.display(),
                        e
                    );
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Ok(Self {
            rules: RuleSet::new(config.rules),
            finder,
            base_dir,
            cache,
            hashes,
            refresh: false,
        })
    }

    /// Re-analyzes every file and overwrites its cache entry.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// The open cache, if any.
    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    /// The directory paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Evaluates Go source text without touching the cache.
    pub fn check_source(&self, file: &str, source: &str) -> Vec<Violation> {
        self.rules.evaluate(file, &extract_imports(source))
    }

    /// Checks files matching the given patterns.
    pub fn check_patterns(&self, patterns: &[String]) -> CheckFilesResult {
        let files = self.finder.discover_files(patterns, &self.base_dir)?;
        self.check_files(&files)
    }

    /// Checks a list of files in parallel using rayon.
    ///
    /// Freshly analyzed results are written to the cache in one batch, and
    /// the hashes of their sources are recorded afterwards. A failed write
    /// is logged and does not fail the check.
    pub fn check_files(&self, paths: &[PathBuf]) -> CheckFilesResult {
        let outcomes: Vec<Result<(CheckResult, String), (PathBuf, GuardError)>> = paths
            .par_iter()
            .map(|path| self.check_file(path).map_err(|e| (path.clone(), e)))
            .collect();

        let mut successes = Vec::new();
        let mut fresh_hashes = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok((result, hash)) => {
                    if !result.from_cache {
                        fresh_hashes.push((result.file.clone(), hash));
                    }
                    successes.push(result);
                }
                Err((path, error)) => {
                    warn!("Failed to check {}: {}", path.display(), error);
                    failures.push((path, error));
                }
            }
        }

        if let (Some(cache), Some(hashes)) = (&self.cache, &self.hashes)
            && !fresh_hashes.is_empty()
        {
            let fresh: Vec<CacheEntry> = successes
                .iter()
                .filter(|r| !r.from_cache)
                .map(|r| CacheEntry::new(r.file.clone(), r.violations.clone()))
                .collect();
            let count = fresh.len();

            match cache.extend(fresh) {
                Ok(()) => {
                    info!("Cached results for {} files", count);
                    if let Err(e) = hashes.update(fresh_hashes) {
                        warn!("Failed to save content hashes: {}", e);
                    }
                }
                Err(e) => warn!("Failed to save cache: {}", e),
            }
        }

        Ok((successes, failures))
    }

    /// Checks one file, returning the result and the hash of its source.
    ///
    /// A cache entry is served only while the source still hashes to the
    /// value recorded when the entry was written.
    fn check_file(&self, path: &Path) -> Result<(CheckResult, String), GuardError> {
        let path = if path.is_relative() {
            self.base_dir.join(path)
        } else {
            path.to_path_buf()
        };
        let file = relative_slash_path(&path, &self.base_dir);

        let source = fs::read_to_string(&path)
            .map_err(|e| GuardError::file(format!("{}: {}", path.display(), e)))?;
        let hash = ContentHashes::hash_content(&source);

        if let (Some(cache), Some(hashes)) = (&self.cache, &self.hashes)
            && !self.refresh
            && hashes.matches(&file, &hash)
        {
            match cache.has_entry(&file) {
                Ok(entry) => {
                    let result = CheckResult {
                        path,
                        file,
                        violations: entry.violations,
                        from_cache: true,
                    };
                    return Ok((result, hash));
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        let violations = self.check_source(&file, &source);
        debug!("Checked {}: {} violations", file, violations.len());

        let result = CheckResult {
            path,
            file,
            violations,
            from_cache: false,
        };
        Ok((result, hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ImportRule, Prohibition};
    use pretty_assertions::assert_eq;
    use tempfile::{TempDir, tempdir};

    fn config_in(dir: &TempDir, cache: bool) -> GuardConfig {
        let mut config = GuardConfig::new();
        config.base_dir = Some(dir.path().to_path_buf());
        config.cache = cache;
        config.rules = vec![ImportRule {
            path: String::new(),
            allow: vec![],
            prohibit: vec![
                Prohibition {
                    import: "unsafe".to_string(),
                    cause: "unsafe breaks memory safety".to_string(),
                    rule: None,
                },
                Prohibition {
                    import: "reflect".to_string(),
                    cause: "reflection is slow".to_string(),
                    rule: None,
                },
            ],
        }];
        config
    }

    fn write_go(dir: &TempDir, name: &str, imports: &[&str]) -> PathBuf {
        let body: String = imports.iter().map(|i| format!("\t\"{}\"\n", i)).collect();
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("package x\n\nimport (\n{})\n", body)).unwrap();
        path
    }

    #[test]
    fn test_check_source() {
        let dir = tempdir().unwrap();
        let checker = Checker::new(config_in(&dir, false)).unwrap();

        let violations =
            checker.check_source("a.go", "package a\nimport (\n\"unsafe\"\n\"reflect\"\n)\n");
        let rules: Vec<&str> = violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(rules, vec!["no-unsafe", "no-reflect"]);
    }

    #[test]
    fn test_second_run_is_served_from_cache() {
        let dir = tempdir().unwrap();
        let a = write_go(&dir, "a.go", &["fmt", "unsafe", "reflect"]);
        let b = write_go(&dir, "pkg/b.go", &["fmt"]);

        let checker = Checker::new(config_in(&dir, true)).unwrap();
        let (first, failures) = checker.check_files(&[a.clone(), b.clone()]).unwrap();
        assert!(failures.is_empty());
        assert!(first.iter().all(|r| !r.from_cache));
        assert_eq!(first[0].file, "a.go");
        assert_eq!(first[0].violations.len(), 2);
        assert_eq!(first[1].file, "pkg/b.go");
        drop(checker);

        let checker = Checker::new(config_in(&dir, true)).unwrap();
        let (second, _) = checker.check_files(&[a, b]).unwrap();
        assert!(second.iter().all(|r| r.from_cache));
        assert_eq!(second[0].violations.len(), 2);
        assert!(second[0].violations.iter().all(|v| v.cached));
        assert!(second[1].violations.is_empty());

        let stats = checker.cache().unwrap().get_stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.violations, 2);
        assert_eq!(stats.hits, 2);
    }

    #[test]
    fn test_edited_file_is_reanalyzed() {
        let dir = tempdir().unwrap();
        let a = write_go(&dir, "a.go", &["fmt"]);

        let checker = Checker::new(config_in(&dir, true)).unwrap();
        let (first, _) = checker.check_files(std::slice::from_ref(&a)).unwrap();
        assert!(first[0].violations.is_empty());
        drop(checker);

        write_go(&dir, "a.go", &["unsafe"]);
        let checker = Checker::new(config_in(&dir, true)).unwrap();
        let (second, _) = checker.check_files(std::slice::from_ref(&a)).unwrap();
        assert!(!second[0].from_cache);
        assert_eq!(second[0].violations.len(), 1);
        assert_eq!(second[0].violations[0].rule, "no-unsafe");
        assert!(!second[0].violations[0].cached);

        let (third, _) = checker.check_files(std::slice::from_ref(&a)).unwrap();
        assert!(third[0].from_cache);
        assert_eq!(third[0].violations.len(), 1);
    }

    #[test]
    fn test_refresh_reanalyzes_unchanged_file() {
        let dir = tempdir().unwrap();
        let a = write_go(&dir, "a.go", &["unsafe"]);

        let checker = Checker::new(config_in(&dir, true)).unwrap();
        checker.check_files(std::slice::from_ref(&a)).unwrap();
        let (cached, _) = checker.check_files(std::slice::from_ref(&a)).unwrap();
        assert!(cached[0].from_cache);

        let checker = checker.with_refresh(true);
        let (fresh, _) = checker.check_files(std::slice::from_ref(&a)).unwrap();
        assert!(!fresh[0].from_cache);
        assert_eq!(fresh[0].violations.len(), 1);
        assert_eq!(checker.cache().unwrap().has_entry("a.go").unwrap().violations.len(), 1);
    }

    #[test]
    fn test_missing_hashes_force_reanalysis() {
        let dir = tempdir().unwrap();
        let a = write_go(&dir, "a.go", &["unsafe"]);
        let config = config_in(&dir, true);
        let cache_file = config.cache_file(&dir.path().canonicalize().unwrap());

        let checker = Checker::new(config).unwrap();
        checker.check_files(std::slice::from_ref(&a)).unwrap();
        drop(checker);
        assert!(ContentHashes::path_for(&cache_file).exists());

        fs::write(ContentHashes::path_for(&cache_file), "{").unwrap();
        let checker = Checker::new(config_in(&dir, true)).unwrap();
        let (results, _) = checker.check_files(std::slice::from_ref(&a)).unwrap();
        assert!(!results[0].from_cache);
        assert_eq!(results[0].violations.len(), 1);
    }

    #[test]
    fn test_cache_disabled() {
        let dir = tempdir().unwrap();
        let a = write_go(&dir, "a.go", &["unsafe"]);

        let checker = Checker::new(config_in(&dir, false)).unwrap();
        assert!(checker.cache().is_none());

        let (results, _) = checker.check_files(&[a]).unwrap();
        assert!(!results[0].from_cache);
        assert!(!dir.path().join(".importguard-cache").exists());
    }

    #[test]
    fn test_corrupt_cache_runs_uncached() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, true);
        let cache_file = config.cache_file(&dir.path().canonicalize().unwrap());
        fs::create_dir_all(cache_file.parent().unwrap()).unwrap();
        fs::write(&cache_file, b"garbage").unwrap();

        let checker = Checker::new(config).unwrap();
        assert!(checker.cache().is_none());
    }

    #[test]
    fn test_missing_file_is_reported_as_failure() {
        let dir = tempdir().unwrap();
        let a = write_go(&dir, "a.go", &["fmt"]);
        let missing = dir.path().join("missing.go");

        let checker = Checker::new(config_in(&dir, true)).unwrap();
        let (successes, failures) = checker.check_files(&[a, missing.clone()]).unwrap();

        assert_eq!(successes.len(), 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, missing);
        assert!(matches!(failures[0].1, GuardError::File(_)));
        assert_eq!(checker.cache().unwrap().len(), 1);
    }

    #[test]
    fn test_file_outside_base_keeps_absolute_key() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let outside = write_go(&other, "a.go", &["unsafe"]);

        let checker = Checker::new(config_in(&dir, true)).unwrap();
        let (results, failures) = checker.check_files(std::slice::from_ref(&outside)).unwrap();
        assert!(failures.is_empty());

        let key = results[0].file.clone();
        assert!(key.starts_with('/'));
        assert!(key.ends_with("/a.go"));
        let cache = checker.cache().unwrap();
        assert_eq!(cache.has_entry(&key).unwrap().violations.len(), 1);
        assert!(cache.has_entry(key.trim_start_matches('/')).unwrap_err().is_not_found());
    }

    #[test]
    fn test_check_patterns() {
        let dir = tempdir().unwrap();
        write_go(&dir, "a.go", &["unsafe"]);
        write_go(&dir, "internal/b.go", &["reflect"]);
        fs::write(dir.path().join("notes.md"), "import \"unsafe\"").unwrap();

        let checker = Checker::new(config_in(&dir, false)).unwrap();
        let (results, failures) = checker.check_patterns(&["**/*".to_string()]).unwrap();

        assert!(failures.is_empty());
        let files: Vec<&str> = results.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["a.go", "internal/b.go"]);
    }
}

//! Checker configuration.

use std::fs;
use std::path::{Path, PathBuf};

use jsonc_parser::ParseOptions;
use serde::{Deserialize, Serialize};

use crate::GuardError;
use crate::rules::ImportRule;

/// Configuration for the checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Path-scoped import rules.
    #[serde(default)]
    pub rules: Vec<ImportRule>,

    /// File patterns to include.
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// File patterns to exclude.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Whether to enable caching.
    #[serde(default = "default_cache")]
    pub cache: bool,

    /// Cache directory, relative to the base directory.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Base directory for resolving relative paths.
    /// This is usually the directory containing the configuration file.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_include() -> Vec<String> {
    vec!["**/*.go".to_string()]
}

fn default_cache() -> bool {
    true
}

fn default_cache_dir() -> String {
    ".importguard-cache".to_string()
}

impl GuardConfig {
    /// Configuration file names, in discovery order.
    pub const CONFIG_FILES: &'static [&'static str] = &[".importguard.jsonc", ".importguard.json"];

    /// Creates a configuration with no rules.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            include: default_include(),
            exclude: Vec::new(),
            cache: true,
            cache_dir: default_cache_dir(),
            base_dir: None,
        }
    }

    /// Finds a configuration file in `dir`.
    pub fn discover(dir: impl AsRef<Path>) -> Option<PathBuf> {
        Self::CONFIG_FILES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| GuardError::config(format!("Failed to read config: {}", e)))?;

        let mut config = Self::from_json(&content)?;
        if let Some(parent) = path.parent() {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            config.base_dir = Some(parent.to_path_buf());
        }

        Ok(config)
    }

    /// Parses configuration from JSON (comments and trailing commas allowed).
    pub fn from_json(json: &str) -> Result<Self, GuardError> {
        let value = jsonc_parser::parse_to_serde_value(json, &ParseOptions::default())
            .map_err(|e| GuardError::config(format!("Invalid JSON: {}", e)))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        serde_json::from_value(value)
            .map_err(|e| GuardError::config(format!("Invalid config: {}", e)))
    }

    /// Returns the canonical base directory, defaulting to the working directory.
    pub fn resolved_base_dir(&self) -> PathBuf {
        let base_dir = self
            .base_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        base_dir.canonicalize().unwrap_or(base_dir)
    }

    /// Computes a hash of the rules, used to scope the cache file.
    pub fn rules_hash(&self) -> String {
        let json = serde_json::to_string(&self.rules).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Returns the cache file for these rules under `base_dir`.
    pub fn cache_file(&self, base_dir: &Path) -> PathBuf {
        let hash = self.rules_hash();
        base_dir
            .join(&self.cache_dir)
            .join(format!("violations-{}.bin", &hash[..16]))
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::new()
    }
}

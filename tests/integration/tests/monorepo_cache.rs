//! End-to-end tests over a small Go monorepo
//!
//! Exercises config loading, rule evaluation and the persisted cache together.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use importguard_cache::codec;
use importguard_core::{CacheStore, Checker, GuardConfig};

const CONFIG: &str = r#"{
    // Transport stays at the edge.
    "rules": [
        {
            "path": "internal/",
            "allow": ["fmt", "errors", "context", "database/sql", "github.com/acme/shop/internal"],
            "prohibit": [
                { "import": "net/http", "cause": "internal packages must not speak HTTP", "rule": "layering" }
            ]
        },
        {
            "path": "",
            "prohibit": [
                { "import": "unsafe", "cause": "unsafe bypasses memory safety" }
            ]
        }
    ],
    "exclude": ["vendor/**"]
}"#;

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn setup_monorepo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(root, ".importguard.jsonc", CONFIG);
    write(
        root,
        "cmd/shop/main.go",
        "package main\n\nimport (\n\t\"net/http\"\n\n\t\"github.com/acme/shop/internal/orders\"\n)\n\nfunc main() {}\n",
    );
    write(
        root,
        "internal/orders/orders.go",
        "package orders\n\nimport (\n\t\"context\"\n\t\"net/http\"\n\t\"os/exec\"\n)\n",
    );
    write(
        root,
        "internal/orders/store.go",
        "package orders\n\nimport (\n\t\"database/sql\"\n\tu \"unsafe\"\n)\n",
    );
    write(
        root,
        "internal/payments/pay.go",
        "package payments\n\nimport \"github.com/acme/shop/internal/orders\"\n",
    );
    write(
        root,
        "vendor/github.com/x/y/y.go",
        "package y\n\nimport \"unsafe\"\n",
    );

    dir
}

fn load_config(root: &Path) -> GuardConfig {
    let path = GuardConfig::discover(root).expect("config should be discovered");
    GuardConfig::from_file(path).unwrap()
}

fn summarize(checker: &Checker) -> Vec<(String, Vec<(String, String)>, bool)> {
    let (results, failures) = checker.check_patterns(&["**/*.go".to_string()]).unwrap();
    assert!(failures.is_empty());
    results
        .into_iter()
        .map(|r| {
            let violations = r
                .violations
                .iter()
                .map(|v| (v.import.clone(), v.rule.clone()))
                .collect();
            (r.file, violations, r.from_cache)
        })
        .collect()
}

fn pair(import: &str, rule: &str) -> (String, String) {
    (import.to_string(), rule.to_string())
}

#[test]
fn test_check_and_reuse_across_runs() {
    let repo = setup_monorepo();

    let checker = Checker::new(load_config(repo.path())).unwrap();
    let first = summarize(&checker);
    assert_eq!(
        first,
        vec![
            ("cmd/shop/main.go".to_string(), vec![], false),
            (
                "internal/orders/orders.go".to_string(),
                vec![pair("net/http", "layering"), pair("os/exec", "not-allowed")],
                false,
            ),
            (
                "internal/orders/store.go".to_string(),
                vec![pair("unsafe", "not-allowed"), pair("unsafe", "no-unsafe")],
                false,
            ),
            ("internal/payments/pay.go".to_string(), vec![], false),
        ]
    );
    drop(checker);

    let checker = Checker::new(load_config(repo.path())).unwrap();
    let second = summarize(&checker);
    assert!(second.iter().all(|(_, _, from_cache)| *from_cache));
    let strip = |rows: Vec<(String, Vec<(String, String)>, bool)>| {
        rows.into_iter().map(|(f, v, _)| (f, v)).collect::<Vec<_>>()
    };
    assert_eq!(strip(second), strip(first));

    let stats = checker.cache().unwrap().get_stats();
    assert_eq!(stats.entries, 4);
    assert_eq!(stats.violations, 4);
    assert_eq!(stats.hits, 4);
}

#[test]
fn test_cache_file_is_deterministic_and_decodable() {
    let repo = setup_monorepo();
    let config = load_config(repo.path());
    let cache_path = config.cache_file(&config.resolved_base_dir());

    let checker = Checker::new(config.clone()).unwrap();
    summarize(&checker);
    let bytes = fs::read(&cache_path).unwrap();
    drop(checker);

    let entries = codec::decode(&bytes).unwrap();
    let files: Vec<&str> = entries.iter().map(|e| e.file.as_str()).collect();
    assert_eq!(
        files,
        vec![
            "cmd/shop/main.go",
            "internal/orders/orders.go",
            "internal/orders/store.go",
            "internal/payments/pay.go",
        ]
    );
    assert!(entries.iter().flat_map(|e| &e.violations).all(|v| !v.cached));

    // A refresh that finds the same violations writes identical bytes.
    let checker = Checker::new(config).unwrap().with_refresh(true);
    summarize(&checker);
    assert_eq!(fs::read(&cache_path).unwrap(), bytes);
}

#[test]
fn test_store_written_by_checker_opens_directly() {
    let repo = setup_monorepo();
    let config = load_config(repo.path());
    let cache_path = config.cache_file(&config.resolved_base_dir());

    summarize(&Checker::new(config).unwrap());

    let store = CacheStore::open_on_disk(&cache_path).unwrap();
    let entry = store.has_entry("internal/orders/orders.go").unwrap();
    assert_eq!(entry.violations.len(), 2);
    assert_eq!(
        entry.violations[0].details,
        "internal/orders/orders.go:5: import \"net/http\" (rule scope \"internal/\")"
    );
    assert!(entry.violations.iter().all(|v| v.cached));
    assert!(store.has_entry("vendor/github.com/x/y/y.go").unwrap_err().is_not_found());
}

#[test]
fn test_only_edited_files_are_reanalyzed() {
    let repo = setup_monorepo();

    summarize(&Checker::new(load_config(repo.path())).unwrap());

    write(
        repo.path(),
        "internal/payments/pay.go",
        "package payments\n\nimport \"net/http\"\n",
    );
    let checker = Checker::new(load_config(repo.path())).unwrap();
    let rows = summarize(&checker);

    let payments = rows
        .iter()
        .find(|(file, _, _)| file == "internal/payments/pay.go")
        .unwrap();
    assert_eq!(payments.1, vec![pair("net/http", "layering")]);
    assert!(!payments.2);
    assert!(
        rows.iter()
            .filter(|(file, _, _)| file != "internal/payments/pay.go")
            .all(|(_, _, from_cache)| *from_cache)
    );
    assert_eq!(checker.cache().unwrap().get_stats().violations, 5);
}

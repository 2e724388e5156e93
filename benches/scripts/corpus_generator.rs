//! Corpus generator for benchmark runs.
//!
//! Generates a synthetic Go monorepo on demand. Generated files are NOT
//! committed to git.
//! Run: cargo run --bin corpus-generator

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

const CORPUS_DIR: &str = "benches/corpus";
const MONOREPO_DIR: &str = "monorepo";
const MODULE: &str = "github.com/acme/bench";

const SERVICES: usize = 50;
const PACKAGES_PER_SERVICE: usize = 20;
const FILES_PER_PACKAGE: usize = 10;

/// Import paths mixed into generated files.
const STD_IMPORTS: &[&str] = &[
    "context",
    "errors",
    "fmt",
    "io",
    "net/http",
    "os",
    "os/exec",
    "reflect",
    "sort",
    "strings",
    "sync",
    "time",
    "unsafe",
];

const CONFIG: &str = r#"{
  "rules": [
    {
      "path": "internal/",
      "prohibit": [
        { "import": "net/http", "cause": "internal packages must not speak HTTP", "rule": "layering" },
        { "import": "os/exec", "cause": "no subprocesses in library code" }
      ]
    },
    {
      "path": "",
      "prohibit": [
        { "import": "unsafe", "cause": "unsafe bypasses memory safety" },
        { "import": "reflect", "cause": "reflection is slow" }
      ]
    }
  ],
  "exclude": ["vendor/**"]
}
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Generating benchmark corpus...");

    let root = Path::new(CORPUS_DIR).join(MONOREPO_DIR);
    fs::create_dir_all(&root)?;
    fs::write(root.join(".importguard.jsonc"), CONFIG)?;

    let total = generate_monorepo(&root)?;

    println!("Corpus generation complete!");
    println!(
        "  - Monorepo: {}/{} ({} Go files)",
        CORPUS_DIR, MONOREPO_DIR, total
    );
    println!(
        "  - Check it: cd {}/{} && importguard check .",
        CORPUS_DIR, MONOREPO_DIR
    );

    Ok(())
}

/// Writes `internal/<service>/<package>/file_<n>.go` files. Returns the count.
fn generate_monorepo(root: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let total = SERVICES * PACKAGES_PER_SERVICE * FILES_PER_PACKAGE;
    let mut written = 0;

    for service in 0..SERVICES {
        for package in 0..PACKAGES_PER_SERVICE {
            let dir = root
                .join("internal")
                .join(format!("svc{:03}", service))
                .join(format!("pkg{:03}", package));
            fs::create_dir_all(&dir)?;

            for n in 0..FILES_PER_PACKAGE {
                written += 1;
                let seed = written;
                let mut file = File::create(dir.join(format!("file_{:02}.go", n)))?;

                writeln!(file, "package pkg{:03}\n", package)?;
                writeln!(file, "import (")?;
                // 3 to 7 imports per file, spread deterministically.
                for i in 0..(3 + seed % 5) {
                    let import = STD_IMPORTS[(seed * 7 + i * 3) % STD_IMPORTS.len()];
                    writeln!(file, "\t\"{}\"", import)?;
                }
                if package > 0 {
                    writeln!(
                        file,
                        "\n\t\"{}/internal/svc{:03}/pkg{:03}\"",
                        MODULE,
                        service,
                        package - 1
                    )?;
                }
                writeln!(file, ")\n")?;
                writeln!(file, "func F{}() {{}}", n)?;

                if written % 1000 == 0 {
                    print!("\r  Generated: {}/{} files", written, total);
                    std::io::stdout().flush()?;
                }
            }
        }
    }

    println!("\r  Generated: {}/{} files ✓", written, total);

    Ok(written)
}

//! Build script for sqlbench: link a system DuckDB when not bundled

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=DUCKDB_LIB_PATH");

    if env::var_os("CARGO_FEATURE_BUNDLED").is_some() {
        return;
    }

    match find_duckdb_library() {
        Some(dir) => {
            println!("cargo:rustc-link-search=native={}", dir.display());
            println!("cargo:warning=Linking DuckDB from {}", dir.display());
        }
        None => {
            println!("cargo:warning=No DuckDB library found; set DUCKDB_LIB_PATH or enable the `bundled` feature");
        }
    }
    println!("cargo:rustc-link-lib=duckdb");
}

fn find_duckdb_library() -> Option<PathBuf> {
    if let Ok(path) = env::var("DUCKDB_LIB_PATH") {
        let path = PathBuf::from(path);
        if has_library(&path) {
            return Some(path);
        }
    }

    if let Ok(output) = Command::new("pkg-config")
        .args(["--libs-only-L", "duckdb"])
        .output()
    {
        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Some(dir) = stdout
                .split_whitespace()
                .filter_map(|flag| flag.strip_prefix("-L"))
                .map(PathBuf::from)
                .find(|dir| has_library(dir))
            {
                return Some(dir);
            }
        }
    }

    ["/usr/lib", "/usr/local/lib", "/opt/homebrew/lib", "/usr/lib/x86_64-linux-gnu", "/usr/lib64"]
        .iter()
        .map(PathBuf::from)
        .find(|dir| has_library(dir))
}

fn has_library(dir: &Path) -> bool {
    ["libduckdb.so", "libduckdb.dylib", "libduckdb.a", "duckdb.lib", "duckdb.dll"]
        .iter()
        .any(|name| dir.join(name).exists())
}

//! DuckDB library discovery and start-up check

use crate::error::{Result, SqlbenchError};
use duckdb::Connection;
use std::env;
use std::path::{Path, PathBuf};

/// Where the DuckDB engine comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DuckDbSource {
    Bundled,
    System(PathBuf),
}

#[derive(Debug, Clone)]
pub struct DuckDbSetup {
    pub source: DuckDbSource,
    /// Engine version reported by `SELECT version()`
    pub version: String,
}

/// Resolve the DuckDB library and make sure the engine answers queries
pub fn init_duckdb() -> Result<DuckDbSetup> {
    let source = resolve_source()?;
    let version = probe_version()?;

    match &source {
        DuckDbSource::Bundled => log::debug!("Using bundled DuckDB {}", version),
        DuckDbSource::System(path) => {
            log::debug!("Using DuckDB {} from {}", version, path.display())
        }
    }

    Ok(DuckDbSetup { source, version })
}

fn resolve_source() -> Result<DuckDbSource> {
    let bundled_disabled = env::var("DUCKDB_DISABLE_BUNDLED").is_ok();
    if cfg!(feature = "bundled") && !bundled_disabled {
        return Ok(DuckDbSource::Bundled);
    }

    find_system_library()
        .map(DuckDbSource::System)
        .ok_or_else(|| SqlbenchError::config(missing_library_message()))
}

fn probe_version() -> Result<String> {
    let connection = Connection::open_in_memory()?;
    let version: String = connection.query_row("SELECT version()", [], |row| row.get(0))?;
    Ok(version)
}

/// `DUCKDB_LIB_PATH` first, then the platform's usual library directories
fn find_system_library() -> Option<PathBuf> {
    if let Ok(path) = env::var("DUCKDB_LIB_PATH") {
        let path = PathBuf::from(path);
        if has_duckdb_library(&path) {
            return Some(path);
        }
        log::warn!("DUCKDB_LIB_PATH={} holds no DuckDB library", path.display());
    }

    standard_paths().into_iter().find(|p| has_duckdb_library(p))
}

fn standard_paths() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(target_os = "macos") {
        &["/opt/homebrew/lib", "/usr/local/lib", "/opt/local/lib"]
    } else if cfg!(target_os = "windows") {
        &["C:\\Program Files\\DuckDB\\lib", "C:\\duckdb\\lib"]
    } else {
        &[
            "/usr/lib",
            "/usr/local/lib",
            "/usr/lib/x86_64-linux-gnu",
            "/usr/lib64",
        ]
    };
    paths.iter().map(PathBuf::from).collect()
}

fn has_duckdb_library(dir: &Path) -> bool {
    let names: &[&str] = if cfg!(target_os = "windows") {
        &["duckdb.dll", "libduckdb.dll"]
    } else if cfg!(target_os = "macos") {
        &["libduckdb.dylib", "libduckdb.so"]
    } else {
        &["libduckdb.so", "libduckdb.so.1"]
    };
    names.iter().any(|name| dir.join(name).exists())
}

fn missing_library_message() -> String {
    let mut message = String::from("DuckDB library not found.\n\n");
    if cfg!(target_os = "macos") {
        message.push_str("Install it with: brew install duckdb\n");
    } else if cfg!(target_os = "linux") {
        message.push_str("Install it with your package manager (e.g. libduckdb-dev)\n");
    }
    message.push_str("or set DUCKDB_LIB_PATH=/path/to/duckdb/lib,\n");
    message.push_str("or rebuild with the default `bundled` feature.\n\nSearched:\n");
    for path in standard_paths() {
        message.push_str(&format!("  {}\n", path.display()));
    }
    message
}

//! Database schema catalogue used to build prompt context

use crate::error::{Result, SqlbenchError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableScript {
    pub name: String,
    pub script: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    #[serde(default)]
    pub tables: Vec<TableScript>,
}

impl DatabaseSchema {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SqlbenchError::file_not_found(path));
        }
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            SqlbenchError::config(format!("Invalid schema file '{}': {}", path.display(), e))
        })
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// DDL for a table, matched case-insensitively
    pub fn table_script(&self, name: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .map(|t| t.script.as_str())
    }

    /// DDL of the listed tables, in the listed order, for prompt context.
    /// Unknown names are logged and skipped.
    pub fn tables_context(&self, names: &[String]) -> String {
        names
            .iter()
            .filter_map(|name| {
                let script = self.table_script(name);
                if script.is_none() {
                    log::warn!("Table '{}' is not in the schema catalogue", name);
                }
                script
            })
            .map(|s| s.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

//! # sqlbench
//!
//! Benchmarks LLM text-to-SQL generation: every question runs through every
//! configured model, the generated SQL is executed against DuckDB and the
//! result set is scored against a precomputed baseline despite differences
//! in column names, column order, row order and float precision.

pub mod baseline;
pub mod cli;
pub mod commands;
pub mod compare;
pub mod config;
pub mod database;
pub mod duckdb_config;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod normalize;
pub mod output;
pub mod progress;
pub mod questions;
pub mod report;
pub mod schema;
pub mod sql;
pub mod table;
pub mod workspace;

pub use compare::{compare, try_compare, ComparisonError, ComparisonFailure, ComparisonOutcome};
pub use error::{Result, SqlbenchError};
pub use table::{Cell, Column, Table};
pub use workspace::ResultsWorkspace;

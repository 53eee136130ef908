//! Query execution and result loading using DuckDB

use crate::error::{Result, SqlbenchError};
use crate::table::{Cell, Column, Table};
use chrono::{DateTime, NaiveDate, NaiveTime};
use duckdb::types::{TimeUnit, ValueRef};
use duckdb::Connection;
use std::path::Path;
use std::time::Instant;

const RESULT_VIEW: &str = "sqlbench_result";

/// Days between 0001-01-01 and 1970-01-01, the DuckDB date epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Outcome of running one query, successful or not
#[derive(Debug, Clone, Default)]
pub struct QueryExecution {
    pub table: Option<Table>,
    pub executed: bool,
    pub rows: usize,
    pub columns: usize,
    /// Wall-clock seconds, rounded to 2 decimals
    pub duration_sql: f64,
    pub error: Option<String>,
}

/// Column metadata reported by DuckDB
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// Runs SQL against a DuckDB database and materializes results as tables
pub struct DatabaseService {
    connection: Connection,
}

impl DatabaseService {
    /// Open a transient in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::configure(Connection::open_in_memory()?)
    }

    /// Open a database file
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SqlbenchError::file_not_found(path));
        }
        let connection = Connection::open(path)?;
        log::info!("Opened DuckDB database {}", path.display());
        Self::configure(connection)
    }

    /// Open `path` when given, otherwise an in-memory database
    pub fn open_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::open(path),
            None => Self::open_in_memory(),
        }
    }

    fn configure(connection: Connection) -> Result<Self> {
        connection.execute("SET enable_progress_bar=false", [])?;
        Ok(Self { connection })
    }

    /// Run setup statements (DDL, inserts) without collecting results
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.connection.execute_batch(sql)?;
        Ok(())
    }

    /// Run a query and return its complete result set
    pub fn query_table(&self, sql: &str) -> Result<Table> {
        let body = sql.trim().trim_end_matches(';').trim();
        if body.is_empty() {
            return Err(SqlbenchError::invalid_input("Empty SQL query"));
        }

        let create_view_sql = format!("CREATE OR REPLACE TEMP VIEW {} AS {}", RESULT_VIEW, body);
        self.connection.execute(&create_view_sql, [])?;

        let table = self.read_result_view();
        self.connection
            .execute(&format!("DROP VIEW IF EXISTS {}", RESULT_VIEW), [])?;
        table
    }

    /// Execute a query, recording timing and shape.
    /// Failures are logged and reported as `executed = false`.
    pub fn execute_sql_query(&self, sql: &str) -> QueryExecution {
        if sql.trim().is_empty() {
            return QueryExecution::default();
        }

        let start = Instant::now();
        let result = self.query_table(sql);
        let duration_sql = round_seconds(start.elapsed().as_secs_f64());

        match result {
            Ok(table) => QueryExecution {
                rows: table.row_count(),
                columns: table.column_count(),
                table: Some(table),
                executed: true,
                duration_sql,
                error: None,
            },
            Err(e) => {
                log::error!("SQL execution failed: {}", e);
                QueryExecution {
                    duration_sql,
                    error: Some(e.to_string()),
                    ..QueryExecution::default()
                }
            }
        }
    }

    /// Load a tab-delimited file with a header row, letting DuckDB infer types
    pub fn load_delimited(&self, path: &Path) -> Result<Table> {
        if !path.is_file() {
            return Err(SqlbenchError::file_not_found(path));
        }

        let path_str = path.to_string_lossy().replace('\'', "''");
        let sql = format!(
            "SELECT * FROM read_csv('{}', delim='\\t', header=true, auto_detect=true)",
            path_str
        );

        self.query_table(&sql).map_err(|e| match e {
            SqlbenchError::DuckDb(inner) => SqlbenchError::data_processing(format!(
                "Failed to read '{}': {}",
                path.display(),
                inner
            )),
            other => other,
        })
    }

    fn describe_result_view(&self) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .connection
            .prepare(&format!("DESCRIBE {}", RESULT_VIEW))
            .map_err(|e| SqlbenchError::data_processing(format!(
                "Failed to prepare describe query: {}", e
            )))?;

        let rows = stmt.query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get::<_, String>(0)?,
                data_type: row.get::<_, String>(1)?,
            })
        })?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    fn read_result_view(&self) -> Result<Table> {
        let info = self.describe_result_view()?;
        let column_count = info.len();

        let mut columns: Vec<Column> = info
            .iter()
            .map(|c| Column::new(c.name.clone(), Vec::new()))
            .collect();

        if column_count == 0 {
            return Ok(Table::new(columns));
        }

        let mut stmt = self
            .connection
            .prepare(&format!("SELECT * FROM {}", RESULT_VIEW))?;

        let rows = stmt.query_map([], |row| {
            let mut cells = Vec::with_capacity(column_count);
            for i in 0..column_count {
                cells.push(cell_from_value(row.get_ref(i)?));
            }
            Ok(cells)
        })?;

        for row in rows {
            for (column, cell) in columns.iter_mut().zip(row?) {
                column.values.push(cell);
            }
        }

        log::debug!(
            "Materialized result with {} column(s): {}",
            column_count,
            info.iter()
                .map(|c| format!("{} {}", c.name, c.data_type))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Table::new(columns))
    }
}

fn round_seconds(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

fn parse_float(text: &str) -> Cell {
    text.parse::<f64>()
        .map(Cell::Float)
        .unwrap_or_else(|_| Cell::Text(text.to_string()))
}

/// Convert a DuckDB value into a table cell
fn cell_from_value(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Boolean(b) => Cell::Bool(b),
        ValueRef::TinyInt(i) => Cell::Int(i as i64),
        ValueRef::SmallInt(i) => Cell::Int(i as i64),
        ValueRef::Int(i) => Cell::Int(i as i64),
        ValueRef::BigInt(i) => Cell::Int(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Cell::Int)
            .unwrap_or(Cell::Float(i as f64)),
        ValueRef::UTinyInt(i) => Cell::Int(i as i64),
        ValueRef::USmallInt(i) => Cell::Int(i as i64),
        ValueRef::UInt(i) => Cell::Int(i as i64),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(Cell::Int)
            .unwrap_or(Cell::Float(i as f64)),
        // Go through the decimal text so 0.1f32 stays 0.1
        ValueRef::Float(f) => parse_float(&f.to_string()),
        ValueRef::Double(f) => Cell::Float(f),
        ValueRef::Decimal(d) => parse_float(&d.to_string()),
        ValueRef::Text(s) => Cell::Text(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Cell::Text(format!("<blob:{} bytes>", b.len())),
        ValueRef::Date32(days) => UNIX_EPOCH_DAYS_FROM_CE
            .checked_add(days)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(|d| Cell::Text(d.to_string()))
            .unwrap_or(Cell::Int(days as i64)),
        ValueRef::Time64(unit, t) => {
            let micros = to_micros(unit, t);
            let secs = (micros / 1_000_000) as u32;
            let nanos = ((micros % 1_000_000) * 1_000) as u32;
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .map(|t| Cell::Text(t.to_string()))
                .unwrap_or(Cell::Int(t))
        }
        ValueRef::Timestamp(unit, ts) => DateTime::from_timestamp_micros(to_micros(unit, ts))
            .map(|dt| Cell::Text(dt.naive_utc().to_string()))
            .unwrap_or(Cell::Int(ts)),
        other => Cell::Text(format!("{:?}", other)),
    }
}

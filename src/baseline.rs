//! Baseline datasets: run the reference SQL once and persist the results

use crate::database::DatabaseService;
use crate::error::{Result, SqlbenchError};
use crate::progress::ProgressReporter;
use crate::questions::QuestionSet;
use crate::table::Table;
use crate::workspace::ResultsWorkspace;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for a baseline run
#[derive(Debug, Clone)]
pub struct BaselineOptions {
    /// Write a dataset file for every non-empty result
    pub persist_results: bool,
    /// Remove previous datasets and summary first
    pub drop_existing: bool,
}

impl Default for BaselineOptions {
    fn default() -> Self {
        Self {
            persist_results: true,
            drop_existing: false,
        }
    }
}

/// One line of the baseline summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineRecord {
    pub question_number: String,
    pub duration_sql: f64,
    pub columns: usize,
    pub rows: usize,
    pub executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaselineRun {
    pub records: Vec<BaselineRecord>,
    pub summary_path: PathBuf,
}

impl BaselineRun {
    pub fn failed(&self) -> usize {
        self.records.iter().filter(|r| !r.executed).count()
    }
}

/// Executes the reference query of every question
pub struct BaselineExecutor<'a> {
    database: &'a DatabaseService,
    workspace: &'a ResultsWorkspace,
}

impl<'a> BaselineExecutor<'a> {
    pub fn new(database: &'a DatabaseService, workspace: &'a ResultsWorkspace) -> Self {
        Self { database, workspace }
    }

    pub fn execute(
        &self,
        questions: &QuestionSet,
        options: &BaselineOptions,
        progress: &mut ProgressReporter,
    ) -> Result<BaselineRun> {
        fs::create_dir_all(&self.workspace.baseline_dir)?;
        if options.drop_existing {
            let removed = self.workspace.remove_baseline_datasets()?;
            log::info!("Removed {} previous baseline file(s)", removed);
        }

        progress.start_batch("baseline");
        let mut records = Vec::with_capacity(questions.len());

        for question in &questions.questions {
            let execution = self.database.execute_sql_query(&question.sql_query);

            let mut dataset = None;
            if let Some(table) = execution.table.as_ref().filter(|t| !t.is_empty()) {
                if options.persist_results {
                    let path = self.workspace.baseline_dataset_path(question);
                    write_dataset(table, &path)?;
                    dataset = Some(path);
                }
            }

            log::info!(
                "Question #{}: SQL: {:.1} sec(s), {} row(s) affected",
                question.question_number,
                execution.duration_sql,
                execution.rows
            );

            records.push(BaselineRecord {
                question_number: question.question_number.clone(),
                duration_sql: execution.duration_sql,
                columns: execution.columns,
                rows: execution.rows,
                executed: execution.executed,
                dataset,
            });
            progress.question_done(&question.question_number);
        }

        let summary_path = self.workspace.baseline_summary_path();
        write_summary(&records, &summary_path)?;
        progress.finish_batch("baseline complete");
        log::info!("Summary file {} generated", summary_path.display());

        Ok(BaselineRun {
            records,
            summary_path,
        })
    }
}

/// Write a table as tab-delimited text with a header row
pub fn write_dataset(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;

    writer.write_record(table.column_names())?;
    for index in 0..table.row_count() {
        let row = table.row(index).ok_or_else(|| {
            SqlbenchError::data_processing(format!("Row {} is missing from the result", index))
        })?;
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}

fn write_summary(records: &[BaselineRecord], path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;

    writer.write_record(["question_number", "duration_sql", "columns", "rows"])?;
    for record in records {
        writer.write_record([
            record.question_number.clone(),
            format!("{:.1}", record.duration_sql),
            record.columns.to_string(),
            record.rows.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Load every persisted baseline dataset, keyed by question number
pub fn load_baseline_datasets(
    database: &DatabaseService,
    workspace: &ResultsWorkspace,
) -> Result<IndexMap<String, Table>> {
    let mut datasets = IndexMap::new();

    for path in workspace.list_baseline_datasets()? {
        let Some(number) = question_number_from_path(&path) else {
            log::warn!("Skipping unrecognised baseline file {}", path.display());
            continue;
        };

        let table = database.load_delimited(&path)?;
        log::debug!(
            "Loaded baseline for question {}: {} row(s), {} column(s)",
            number,
            table.row_count(),
            table.column_count()
        );
        datasets.insert(number, table);
    }

    log::info!("Loaded {} baseline dataset(s)", datasets.len());
    Ok(datasets)
}

/// `question_07.tsv` -> `7`
fn question_number_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let number = stem.strip_prefix(crate::workspace::DATASET_PREFIX)?;
    if number.trim().is_empty() {
        return None;
    }
    Some(crate::questions::canonical_number(number))
}

//! Evaluation loop: every question through every model, compared against
//! the baseline datasets

use crate::compare::compare;
use crate::config::ModelSpec;
use crate::database::DatabaseService;
use crate::error::{Result, SqlbenchError};
use crate::llm::{Completion, CompletionRequest, GeneratorFactory, SqlGenerator};
use crate::progress::ProgressReporter;
use crate::questions::{Question, QuestionResult, QuestionSet};
use crate::schema::DatabaseSchema;
use crate::sql::{extract_sql, render_system_message};
use crate::table::Table;
use crate::workspace::ResultsWorkspace;
use chrono::Local;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

pub const DEFAULT_TEMPERATURE: f32 = 0.9;
pub const DEFAULT_MAX_TOKENS: u32 = 10_000;
pub const DEFAULT_FILE_PREFIX: &str = "results_llm";

/// Column headers of the evaluation summary file
pub const SUMMARY_HEADER: [&str; 17] = [
    "Timestamp",
    "Question",
    "Model",
    "LLM_time",
    "SQL_time",
    "Rows",
    "Columns",
    "Percent_rows_equality",
    "Percent_columns_equality",
    "Percent_source_rows_equality",
    "Percent_llm_rows_equality",
    "Total_tokens",
    "Prompt_tokens",
    "Completion_tokens",
    "Cost_total_EUR",
    "Cost_input_tokens_EUR",
    "Cost_output_tokens_EUR",
];

/// Settings shared by every model in a run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    pub iterations: u32,
    pub file_prefix: String,
    /// Write `<prefix>_<model>.yaml` per model
    pub log_results: bool,
    /// Write the tab-delimited summary per iteration
    pub log_summary: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            iterations: 1,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            log_results: true,
            log_summary: true,
        }
    }
}

/// System message template and the semantic rules substituted into it
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub system_message: String,
    pub semantic_rules: String,
}

impl PromptContext {
    pub fn load(system_message: &Path, semantic_rules: &Path) -> Result<Self> {
        Ok(Self {
            system_message: read_text(system_message)?,
            semantic_rules: read_text(semantic_rules)?,
        })
    }
}

fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(SqlbenchError::file_not_found(path));
    }
    Ok(fs::read_to_string(path)?)
}

/// One line of the evaluation summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "LLM_time")]
    pub llm_time: f64,
    #[serde(rename = "SQL_time")]
    pub sql_time: f64,
    #[serde(rename = "Rows")]
    pub rows: usize,
    #[serde(rename = "Columns")]
    pub columns: usize,
    #[serde(rename = "Percent_rows_equality")]
    pub rows_equality: f64,
    #[serde(rename = "Percent_columns_equality")]
    pub columns_equality: f64,
    #[serde(rename = "Percent_source_rows_equality")]
    pub source_rows_equality: f64,
    #[serde(rename = "Percent_llm_rows_equality")]
    pub llm_rows_equality: f64,
    #[serde(rename = "Total_tokens")]
    pub total_tokens: u64,
    #[serde(rename = "Prompt_tokens")]
    pub prompt_tokens: u64,
    #[serde(rename = "Completion_tokens")]
    pub completion_tokens: u64,
    #[serde(rename = "Cost_total_EUR")]
    pub cost_total_eur: f64,
    #[serde(rename = "Cost_input_tokens_EUR")]
    pub cost_input_eur: f64,
    #[serde(rename = "Cost_output_tokens_EUR")]
    pub cost_output_eur: f64,
}

impl SummaryRow {
    pub fn from_question(question: &Question, timestamp: &str) -> Self {
        let r = &question.result;
        Self {
            timestamp: timestamp.to_string(),
            question: question.question_number.clone(),
            model: r.model_name.clone(),
            llm_time: round1(r.duration_llm),
            sql_time: round1(r.duration_sql),
            rows: r.rows,
            columns: r.columns,
            rows_equality: r.percent_rows_equality,
            columns_equality: r.percent_columns_equality,
            source_rows_equality: r.percent_source_rows_equality,
            llm_rows_equality: r.percent_llm_rows_equality,
            total_tokens: r.total_tokens,
            prompt_tokens: r.prompt_tokens,
            completion_tokens: r.completion_tokens,
            cost_total_eur: r.cost_total_eur,
            cost_input_eur: r.cost_input_eur,
            cost_output_eur: r.cost_output_eur,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Results of one model over the question set
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub model: String,
    pub questions: Vec<Question>,
    pub rows: Vec<SummaryRow>,
    pub total_rows: usize,
    pub total_time_sql: f64,
    pub total_time_llm: f64,
    pub elapsed: f64,
}

impl BatchReport {
    pub fn exact_matches(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| q.result.percent_source_rows_equality == 1.0 && q.result.percent_llm_rows_equality == 1.0)
            .count()
    }
}

/// Generates, executes and scores the SQL for a question
pub struct QuestionProcessor<'a> {
    generator: &'a dyn SqlGenerator,
    database: &'a DatabaseService,
    schema: &'a DatabaseSchema,
    prompt: &'a PromptContext,
}

impl<'a> QuestionProcessor<'a> {
    pub fn new(
        generator: &'a dyn SqlGenerator,
        database: &'a DatabaseService,
        schema: &'a DatabaseSchema,
        prompt: &'a PromptContext,
    ) -> Self {
        Self {
            generator,
            database,
            schema,
            prompt,
        }
    }

    /// Process one question; LLM and SQL failures are recorded, not returned
    pub fn process_question(
        &self,
        question: &Question,
        model: &ModelSpec,
        baseline: Option<&Table>,
        settings: &RunSettings,
        iteration: &str,
    ) -> Question {
        let tables_context = self.schema.tables_context(&question.tables_used);
        let system_message = render_system_message(
            &self.prompt.system_message,
            &tables_context,
            &self.prompt.semantic_rules,
        );

        let request = CompletionRequest {
            model: &model.name,
            system_message: &system_message,
            user_prompt: &question.user_question,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        let completion = self.generator.generate(&request).unwrap_or_else(|e| {
            log::error!(
                "Question #{}: {} call for {} failed: {}",
                question.question_number,
                self.generator.provider_name(),
                model.name,
                e
            );
            Completion::default()
        });

        let (llm_sql_query, changed) = extract_sql(&completion.text);
        let execution = self.database.execute_sql_query(&llm_sql_query);

        // Baselines are shared across models; normalize a private copy
        let mut baseline = baseline.cloned();
        let mut candidate = execution.table;
        let outcome = compare(baseline.as_mut(), candidate.as_mut(), &question.question_number);

        let (cost_input_eur, cost_output_eur, cost_total_eur) =
            model.cost(completion.prompt_tokens, completion.completion_tokens);

        let mut result = QuestionResult {
            model_name: model.name.clone(),
            iteration: iteration.to_string(),
            llm_sql_query,
            llm_sql_query_changed: changed,
            executed: execution.executed,
            rows: execution.rows,
            columns: execution.columns,
            duration_sql: execution.duration_sql,
            duration_llm: round2(completion.duration),
            prompt_tokens: completion.prompt_tokens,
            completion_tokens: completion.completion_tokens,
            total_tokens: completion.total_tokens,
            cost_input_eur,
            cost_output_eur,
            cost_total_eur,
            ..QuestionResult::default()
        };
        result.apply_outcome(&outcome);

        log::info!(
            "Question #{}: LLM: {:.1} sec(s), SQL: {:.1} sec(s), {} row(s) affected, \
             {} rows equality, {} columns equality, {} source rows equality, {} LLM rows equality",
            question.question_number,
            result.duration_llm,
            result.duration_sql,
            result.rows,
            outcome.row_ratio,
            outcome.column_ratio,
            outcome.baseline_coverage,
            outcome.candidate_coverage
        );

        Question {
            result,
            ..question.clone()
        }
    }

    /// Process every question with one model
    pub fn process_questions_with_model(
        &self,
        questions: &QuestionSet,
        baselines: &IndexMap<String, Table>,
        model: &ModelSpec,
        settings: &RunSettings,
        iteration: &str,
        progress: &mut ProgressReporter,
    ) -> BatchReport {
        let started = Instant::now();
        let mut answered = Vec::with_capacity(questions.len());
        let mut rows = Vec::with_capacity(questions.len());

        for question in &questions.questions {
            let baseline = baselines.get(&question.baseline_key());
            if baseline.is_none() {
                log::warn!("Question #{} has no baseline dataset", question.question_number);
            }

            let result = self.process_question(question, model, baseline, settings, iteration);
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            rows.push(SummaryRow::from_question(&result, &timestamp));
            answered.push(result);
            progress.question_done(&question.question_number);
        }

        let batch_id = format!("batch_id-{}", Uuid::new_v4());
        let total_rows = answered.iter().map(|q| q.result.rows).sum();
        let total_time_sql = round2(answered.iter().map(|q| q.result.duration_sql).sum());
        let total_time_llm = round2(answered.iter().map(|q| q.result.duration_llm).sum());
        let elapsed = round2(started.elapsed().as_secs_f64());

        log::info!(
            "Batch summary: processed {} queries, {} rows, {} sec SQL, {} sec LLM",
            answered.len(),
            total_rows,
            total_time_sql,
            total_time_llm
        );
        log::info!("Batch ID {} processed in {} second(s)", batch_id, elapsed);

        BatchReport {
            batch_id,
            model: model.name.clone(),
            questions: answered,
            rows,
            total_rows,
            total_time_sql,
            total_time_llm,
            elapsed,
        }
    }
}

/// Files and batches produced by one iteration
#[derive(Debug, Clone, Serialize)]
pub struct IterationRun {
    pub iteration: String,
    pub file_prefix: String,
    pub summary_path: Option<PathBuf>,
    pub files_generated: Vec<PathBuf>,
    pub batches: Vec<BatchReport>,
    pub elapsed: f64,
}

/// Runs the question set through every model, once per iteration
pub struct ModelEvaluator<'a> {
    factory: &'a dyn GeneratorFactory,
    database: &'a DatabaseService,
    schema: &'a DatabaseSchema,
    prompt: &'a PromptContext,
    workspace: &'a ResultsWorkspace,
}

impl<'a> ModelEvaluator<'a> {
    pub fn new(
        factory: &'a dyn GeneratorFactory,
        database: &'a DatabaseService,
        schema: &'a DatabaseSchema,
        prompt: &'a PromptContext,
        workspace: &'a ResultsWorkspace,
    ) -> Self {
        Self {
            factory,
            database,
            schema,
            prompt,
            workspace,
        }
    }

    pub fn evaluate(
        &self,
        models: &[ModelSpec],
        questions: &QuestionSet,
        baselines: &IndexMap<String, Table>,
        settings: &RunSettings,
        progress: &mut ProgressReporter,
    ) -> Result<Vec<IterationRun>> {
        if models.is_empty() {
            return Err(SqlbenchError::config("No models to evaluate"));
        }
        if questions.is_empty() {
            return Err(SqlbenchError::invalid_input("The question set is empty"));
        }
        if settings.iterations == 0 {
            return Err(SqlbenchError::invalid_input("Iterations must be at least 1"));
        }

        fs::create_dir_all(&self.workspace.runs_dir)?;

        let mut runs = Vec::with_capacity(settings.iterations as usize);
        for i in 1..=settings.iterations {
            let iteration = format!("{:02}", i);
            log::info!("Iteration {} of {} started", i, settings.iterations);
            runs.push(self.evaluate_iteration(models, questions, baselines, settings, &iteration, progress)?);
        }

        progress.finish_all("evaluation complete");
        Ok(runs)
    }

    fn evaluate_iteration(
        &self,
        models: &[ModelSpec],
        questions: &QuestionSet,
        baselines: &IndexMap<String, Table>,
        settings: &RunSettings,
        iteration: &str,
        progress: &mut ProgressReporter,
    ) -> Result<IterationRun> {
        let started = Instant::now();
        let file_prefix = format!("{}_{}", settings.file_prefix, iteration);
        let stamp = Local::now().format("%Y%m%d_%H%M").to_string();

        let mut summary = if settings.log_summary {
            let path = self.workspace.summary_path(&file_prefix, &stamp);
            Some((SummaryWriter::create(&path)?, path))
        } else {
            None
        };

        let mut files_generated = Vec::new();
        let mut batches = Vec::with_capacity(models.len());

        for model in models {
            log::info!(
                "Processing questions with model {}, temperature {}",
                model.name,
                settings.temperature
            );
            let generator = self.factory.generator_for(model)?;
            let processor =
                QuestionProcessor::new(generator.as_ref(), self.database, self.schema, self.prompt);

            progress.start_batch(&model.name);
            let batch = processor.process_questions_with_model(
                questions, baselines, model, settings, iteration, progress,
            );
            progress.finish_batch(&format!("{} done", model.name));

            if settings.log_results {
                let path = self.workspace.model_results_path(&file_prefix, &model.name);
                QuestionSet::new(batch.questions.clone()).save(&path)?;
                log::info!("Log file generated: {}", path.display());
                files_generated.push(path);
            }

            if let Some((writer, _)) = summary.as_mut() {
                writer.append(&batch.rows)?;
            }

            batches.push(batch);
        }

        let summary_path = summary.map(|(_, path)| path);
        if let Some(path) = &summary_path {
            log::info!("Summary file {} generated", path.display());
        }

        Ok(IterationRun {
            iteration: iteration.to_string(),
            file_prefix,
            summary_path,
            files_generated,
            batches,
            elapsed: round2(started.elapsed().as_secs_f64()),
        })
    }
}

/// Tab-delimited summary, flushed after every model
pub struct SummaryWriter {
    writer: csv::Writer<fs::File>,
}

impl SummaryWriter {
    /// Create (or truncate) the summary file and write its header
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(SUMMARY_HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn append(&mut self, rows: &[SummaryRow]) -> Result<()> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Read summary rows back from a file written by [`SummaryWriter`]
pub fn read_summary(path: &Path) -> Result<Vec<SummaryRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

//! Command-line interface for sqlbench

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlbench")]
#[command(about = "Benchmark LLM text-to-SQL generation against baseline result sets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Results directory (baseline datasets, run files, reports)
    #[arg(long, global = true, default_value = "results")]
    pub results_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Database connection options shared by commands that execute SQL
#[derive(clap::Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// DuckDB database file (in-memory when omitted)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// SQL script run before any question (DDL, seed data)
    #[arg(long)]
    pub setup_sql: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every reference query and persist the baseline datasets
    Baseline {
        /// Questions YAML file
        #[arg(long)]
        questions: PathBuf,

        #[command(flatten)]
        db: DatabaseArgs,

        /// Keep existing baseline files instead of removing them first
        #[arg(long)]
        keep_existing: bool,

        /// Execute and summarize without writing dataset files
        #[arg(long)]
        no_persist: bool,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Run the questions through every enabled model and score the results
    Evaluate {
        /// Questions YAML file
        #[arg(long)]
        questions: PathBuf,

        /// Database schema YAML file
        #[arg(long)]
        schema: PathBuf,

        /// Models YAML file
        #[arg(long)]
        models: PathBuf,

        /// System message template
        #[arg(long)]
        system_message: PathBuf,

        /// Semantic rules document
        #[arg(long)]
        semantic_rules: PathBuf,

        #[command(flatten)]
        db: DatabaseArgs,

        /// Sampling temperature
        #[arg(long, default_value = "0.9", value_parser = validate_temperature)]
        temperature: f32,

        /// Maximum tokens per completion
        #[arg(long, default_value = "10000", value_parser = validate_positive)]
        max_tokens: u32,

        /// Number of passes over all models
        #[arg(long, default_value = "1", value_parser = validate_positive)]
        iterations: u32,

        /// Request timeout in seconds
        #[arg(long, default_value = "60", value_parser = validate_positive)]
        timeout: u32,

        /// Prefix for per-iteration file names
        #[arg(long, default_value = "results_llm")]
        prefix: String,

        /// Only evaluate these models (repeatable)
        #[arg(long = "model")]
        model_names: Vec<String>,

        /// Only evaluate these question numbers (repeatable)
        #[arg(long = "question")]
        question_numbers: Vec<String>,

        /// Answer with each question's reference SQL instead of calling a model
        #[arg(long)]
        dry_run: bool,

        /// Skip the per-model results YAML files
        #[arg(long)]
        no_results: bool,

        /// Skip the tab-delimited summary file
        #[arg(long)]
        no_summary: bool,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Aggregate evaluation summaries into a performance report
    Report {
        /// Summary file name prefix
        #[arg(long, default_value = "questions_summary_results_llm")]
        prefix: String,

        /// Only include summaries whose name contains this data source
        #[arg(long)]
        source: Option<String>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Compare two tab-delimited result files
    Compare {
        /// Baseline result file
        baseline: PathBuf,

        /// Candidate result file
        candidate: PathBuf,

        /// Label used in log messages
        #[arg(long, default_value = "adhoc")]
        question: String,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Show what the results directory holds
    Status {
        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Validate that a count or limit is greater than 0
fn validate_positive(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("Invalid value: '{}'. Must be a positive integer.", s))?;

    if value == 0 {
        return Err("Value must be greater than 0".to_string());
    }

    Ok(value)
}

fn validate_temperature(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("Invalid temperature: '{}'", s))?;

    if !(0.0..=2.0).contains(&value) {
        return Err(format!("Temperature must be between 0 and 2: {}", value));
    }

    Ok(value)
}

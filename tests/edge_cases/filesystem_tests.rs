//! Filesystem edge case tests

use crate::common::assertions::assert_dir_exists;
use crate::common::{CliTestRunner, TestFixture};
use sqlbench::baseline::load_baseline_datasets;
use sqlbench::cli::Commands;
use sqlbench::commands::execute_command;
use sqlbench::questions::QuestionSet;
use sqlbench::{ResultsWorkspace, SqlbenchError};
use std::fs;

#[test]
fn test_status_on_missing_results_dir() {
    let fixture = TestFixture::new().unwrap();
    let missing = fixture.root().join("does-not-exist");

    let err = execute_command(
        Commands::Status {
            format: "json".to_string(),
        },
        &missing,
    )
    .unwrap_err();
    assert!(matches!(err, SqlbenchError::FileNotFound { .. }));
}

#[test]
fn test_status_counts_workspace_files() {
    let runner = CliTestRunner::new().unwrap();
    let workspace = &runner.fixture().workspace;

    fs::write(workspace.baseline_dir.join("question_01.tsv"), "a\n1\n").unwrap();
    fs::write(workspace.summary_path("results_llm_01", "20240501_1000"), "Timestamp\n").unwrap();
    fs::write(workspace.model_results_path("results_llm_01", "model-a"), "questions: []\n").unwrap();

    let stats = workspace.stats().unwrap();
    assert_eq!(stats.baseline_datasets, 1);
    assert_eq!(stats.summaries, 1);
    assert_eq!(stats.model_results, 1);
    assert!(stats.total_size > 0);

    runner.expect_success(&["status"]);
    runner.expect_success(&["status", "--format", "json"]);
}

#[test]
fn test_invalid_format_is_rejected() {
    let runner = CliTestRunner::new().unwrap();

    let err = runner.expect_failure(&["status", "--format", "xml"]);
    assert!(matches!(err, SqlbenchError::InvalidInput { .. }));
}

#[test]
fn test_baseline_with_missing_questions_file() {
    let runner = CliTestRunner::new().unwrap();
    let missing = runner.fixture().root().join("questions.yaml");

    let err = runner.expect_failure(&["baseline", "--questions", missing.to_str().unwrap()]);
    assert!(matches!(err, SqlbenchError::FileNotFound { .. }));
}

#[test]
fn test_baseline_with_missing_setup_script() {
    let runner = CliTestRunner::new().unwrap();
    let inputs = runner.fixture().create_inputs().unwrap();
    let missing = runner.fixture().root().join("missing.sql");

    let err = runner.expect_failure(&[
        "baseline",
        "--questions",
        inputs.questions.to_str().unwrap(),
        "--setup-sql",
        missing.to_str().unwrap(),
    ]);
    assert!(matches!(err, SqlbenchError::FileNotFound { .. }));
}

#[test]
fn test_malformed_questions_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_file("questions.yaml", "questions:\n  - question_number: [1, 2\n")
        .unwrap();

    let err = QuestionSet::load(&path).unwrap_err();
    assert!(matches!(err, SqlbenchError::Config { .. }));
}

#[test]
fn test_results_dir_is_created_on_demand() {
    let runner = CliTestRunner::new().unwrap();
    let inputs = runner.fixture().create_inputs().unwrap();
    let nested = runner.fixture().root().join("deep").join("results");

    execute_command(
        Commands::Baseline {
            questions: inputs.questions.clone(),
            db: sqlbench::cli::DatabaseArgs {
                database: None,
                setup_sql: Some(inputs.setup_sql.clone()),
            },
            keep_existing: false,
            no_persist: false,
            format: "json".to_string(),
        },
        &nested,
    )
    .unwrap();

    let workspace = ResultsWorkspace::from_root(nested);
    assert_dir_exists(&workspace.baseline_dir);
    assert_dir_exists(&workspace.runs_dir);
    assert_eq!(workspace.list_baseline_datasets().unwrap().len(), 4);
}

#[test]
fn test_unrelated_files_in_baseline_dir_are_ignored() {
    let fixture = TestFixture::new().unwrap();
    let database = fixture.seeded_database().unwrap();
    let baseline_dir = &fixture.workspace.baseline_dir;

    fs::write(baseline_dir.join("question_04.tsv"), "n\n7\n").unwrap();
    fs::write(baseline_dir.join("questions_baseline_summary.tsv"), "question_number\n4\n").unwrap();
    fs::write(baseline_dir.join("question_05.csv"), "n\n8\n").unwrap();
    fs::write(baseline_dir.join("README.md"), "notes").unwrap();

    let baselines = load_baseline_datasets(&database, &fixture.workspace).unwrap();
    assert_eq!(baselines.len(), 1);
    assert_eq!(baselines["4"].row_count(), 1);
}

#[test]
fn test_missing_workspace_dirs_list_as_empty() {
    let fixture = TestFixture::new().unwrap();
    let workspace = ResultsWorkspace::from_root(fixture.root().join("never-created"));

    assert!(workspace.list_baseline_datasets().unwrap().is_empty());
    assert!(workspace.list_summaries("questions_summary", None).unwrap().is_empty());
    assert_eq!(workspace.remove_baseline_datasets().unwrap(), 0);
    assert_eq!(workspace.stats().unwrap().baseline_datasets, 0);
}

#[test]
fn test_existing_database_file_is_required() {
    let runner = CliTestRunner::new().unwrap();
    let inputs = runner.fixture().create_inputs().unwrap();
    let missing_db = runner.fixture().root().join("warehouse.duckdb");

    let err = runner.expect_failure(&[
        "baseline",
        "--questions",
        inputs.questions.to_str().unwrap(),
        "--database",
        missing_db.to_str().unwrap(),
    ]);
    assert!(matches!(err, SqlbenchError::FileNotFound { .. }));
}

//! Functional tests for the performance report

use crate::common::assertions::assert_file_exists_and_not_empty;
use crate::common::CliTestRunner;
use sqlbench::evaluator::{SummaryRow, SummaryWriter};
use sqlbench::report::PerformanceReport;
use sqlbench::SqlbenchError;
use std::fs;

fn row(model: &str, question: &str, llm_time: f64, equality: f64, cost: f64) -> SummaryRow {
    SummaryRow {
        timestamp: "2024-05-01 10:00:00".to_string(),
        question: question.to_string(),
        model: model.to_string(),
        llm_time,
        sql_time: 0.1,
        rows: 3,
        columns: 2,
        rows_equality: equality,
        columns_equality: 1.0,
        source_rows_equality: equality,
        llm_rows_equality: equality,
        total_tokens: 100,
        prompt_tokens: 80,
        completion_tokens: 20,
        cost_total_eur: cost,
        cost_input_eur: cost / 2.0,
        cost_output_eur: cost / 2.0,
    }
}

fn sample_rows() -> Vec<SummaryRow> {
    vec![
        row("slow-but-right", "10", 4.0, 1.0, 0.02),
        row("slow-but-right", "2", 6.0, 1.0, 0.04),
        row("fast-and-cheap", "10", 1.0, 0.5, 0.001),
        row("fast-and-cheap", "2", 1.0, 0.0, 0.001),
    ]
}

#[test]
fn test_per_model_aggregates() {
    let report = PerformanceReport::from_rows(&sample_rows());

    let models: Vec<&str> = report.per_model.iter().map(|m| m.model.as_str()).collect();
    assert_eq!(models, vec!["fast-and-cheap", "slow-but-right"]);

    let slow = &report.per_model[1];
    assert_eq!(slow.queries_executed, 2);
    assert_eq!(slow.mean_llm_time, 5.0);
    assert_eq!(slow.stdev_llm_time, Some(1.41));
    assert_eq!(slow.mean_datasets_equality, 1.0);
    assert_eq!(slow.mean_cost_eur, 0.03);

    let fast = &report.per_model[0];
    assert_eq!(fast.stdev_llm_time, Some(0.0));
    assert_eq!(fast.mean_datasets_equality, 0.25);
}

#[test]
fn test_questions_sorted_numerically() {
    let report = PerformanceReport::from_rows(&sample_rows());

    let questions: Vec<&str> = report.per_question.iter().map(|q| q.question.as_str()).collect();
    assert_eq!(questions, vec!["2", "10"]);
    assert_eq!(report.per_question[0].mean_datasets_equality, 0.5);
    assert_eq!(report.per_question[1].mean_datasets_equality, 0.75);
}

#[test]
fn test_rankings() {
    let report = PerformanceReport::from_rows(&sample_rows());

    assert_eq!(report.best_by_time[0].0, "fast-and-cheap");
    assert_eq!(report.best_by_cost[0].0, "fast-and-cheap");
    assert_eq!(report.best_by_quality[0].0, "slow-but-right");

    let best = &report.combined_ranking[0];
    assert_eq!(best.model, "slow-but-right");
    assert_eq!(best.rank_quality, "1 (1.0)");
    assert_eq!(best.rank_time, "2 (5.0)");
}

#[test]
fn test_render_has_every_section() {
    let rendered = PerformanceReport::from_rows(&sample_rows()).render();

    for heading in [
        "Performance Report per model:",
        "Performance Report per query:",
        "Best models based on average LLM time:",
        "Best models based on mean token cost:",
        "Best models based on average datasets equality:",
        "Ranking of the models based on the total cost, LLM time and source rows equality:",
    ] {
        assert!(rendered.contains(heading), "missing section: {}", heading);
    }
    assert!(rendered.contains("| model "));
    assert!(rendered.contains("slow-but-right"));
}

#[test]
fn test_report_command_reads_every_summary() {
    let runner = CliTestRunner::new().unwrap();
    let workspace = &runner.fixture().workspace;

    let first = workspace.summary_path("results_llm_01", "20240501_1000");
    let second = workspace.summary_path("results_llm_02", "20240501_1010");
    let rows = sample_rows();
    SummaryWriter::create(&first).unwrap().append(&rows[..2]).unwrap();
    SummaryWriter::create(&second).unwrap().append(&rows[2..]).unwrap();

    runner.expect_success(&["report", "--format", "json"]);

    let report_path = workspace.report_path(None);
    assert_file_exists_and_not_empty(&report_path);
    let content = fs::read_to_string(&report_path).unwrap();
    assert!(content.contains("fast-and-cheap"));
    assert!(content.contains("slow-but-right"));
}

#[test]
fn test_report_scoped_to_a_source() {
    let runner = CliTestRunner::new().unwrap();
    let workspace = &runner.fixture().workspace;

    let sales = workspace.summary_path("results_llm_sales_01", "20240501_1000");
    let hr = workspace.summary_path("results_llm_hr_01", "20240501_1000");
    let rows = sample_rows();
    SummaryWriter::create(&sales).unwrap().append(&rows[..2]).unwrap();
    SummaryWriter::create(&hr).unwrap().append(&rows[2..]).unwrap();

    runner.expect_success(&["report", "--source", "sales"]);

    let content = fs::read_to_string(workspace.report_path(Some("sales"))).unwrap();
    assert!(content.starts_with("Data source: sales"));
    assert!(content.contains("slow-but-right"));
    assert!(!content.contains("fast-and-cheap"));
}

#[test]
fn test_report_without_summaries_fails() {
    let runner = CliTestRunner::new().unwrap();

    let err = runner.expect_failure(&["report"]);
    assert!(matches!(err, SqlbenchError::InvalidInput { .. }));
    assert!(!runner.fixture().workspace.report_path(None).exists());
}

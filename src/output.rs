//! Output formatting utilities

use crate::baseline::BaselineRun;
use crate::compare::ComparisonOutcome;
use crate::error::Result;
use crate::evaluator::IterationRun;
use crate::workspace::WorkspaceStats;

/// Pretty printer for sqlbench output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print workspace statistics
    pub fn print_workspace_stats(stats: &WorkspaceStats) {
        println!("📊 sqlbench Results Workspace");
        println!("├─ Baseline datasets: {}", stats.baseline_datasets);
        println!("├─ Evaluation summaries: {}", stats.summaries);
        println!("├─ Model result files: {}", stats.model_results);
        println!("└─ Run files size: {}", format_bytes(stats.total_size));
    }

    /// Print the four comparison metrics
    pub fn print_comparison(outcome: &ComparisonOutcome, question: &str) {
        println!("🔍 Comparison: {}", question);
        println!("├─ Rows ratio: {}", format_ratio(outcome.row_ratio));
        println!("├─ Columns ratio: {}", format_ratio(outcome.column_ratio));
        println!("├─ Baseline rows found: {}", format_ratio(outcome.baseline_coverage));
        println!("└─ Candidate rows in baseline: {}", format_ratio(outcome.candidate_coverage));

        if outcome.is_exact_match() {
            println!();
            println!("✅ Result sets match");
        }
    }

    /// Print the outcome of a baseline run
    pub fn print_baseline_run(run: &BaselineRun) {
        println!("📦 Baseline");
        for record in &run.records {
            let marker = if record.executed { "✅" } else { "❌" };
            println!(
                "├─ {} Question #{}: SQL: {:.1} sec(s), {} row(s), {} column(s)",
                marker, record.question_number, record.duration_sql, record.rows, record.columns
            );
        }
        println!("└─ Summary: {}", run.summary_path.display());

        if run.failed() > 0 {
            println!();
            println!("🟡 {} baseline query(ies) failed to execute", run.failed());
        }
    }

    /// Print per-model batch results of every iteration
    pub fn print_evaluation(runs: &[IterationRun]) {
        for run in runs {
            println!("🧪 Iteration {} ({} sec)", run.iteration, run.elapsed);
            for (i, batch) in run.batches.iter().enumerate() {
                let prefix = if i == run.batches.len() - 1 { "└─" } else { "├─" };
                println!(
                    "{} {}: {}/{} exact, {} row(s), {} sec SQL, {} sec LLM",
                    prefix,
                    batch.model,
                    batch.exact_matches(),
                    batch.questions.len(),
                    batch.total_rows,
                    batch.total_time_sql,
                    batch.total_time_llm
                );
            }
            if let Some(summary) = &run.summary_path {
                println!("   Summary: {}", summary.display());
            }
            for file in &run.files_generated {
                println!("   Log file: {}", file.display());
            }
        }
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Format a comparison outcome with its question label
    pub fn format_comparison(outcome: &ComparisonOutcome, question: &str) -> Result<String> {
        let json = serde_json::json!({
            "question": question,
            "row_ratio": outcome.row_ratio,
            "column_ratio": outcome.column_ratio,
            "baseline_coverage": outcome.baseline_coverage,
            "candidate_coverage": outcome.candidate_coverage,
            "exact_match": outcome.is_exact_match(),
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

fn format_ratio(ratio: f64) -> String {
    format!("{:.2} ({:.0}%)", ratio, ratio * 100.0)
}

/// Format bytes in human-readable format
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

//! Performance report over evaluation summaries: per-model and per-question
//! aggregates, single-metric rankings and a combined ranking

use crate::error::{Result, SqlbenchError};
use crate::evaluator::{read_summary, SummaryRow};
use crate::workspace::ResultsWorkspace;
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_SUMMARY_PREFIX: &str = "questions_summary_results_llm";

/// Ranks past this position are left blank in the combined ranking
const MAX_DISPLAYED_RANK: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPerformance {
    pub model: String,
    pub queries_executed: usize,
    pub mean_sql_time: f64,
    pub mean_llm_time: f64,
    /// Sample standard deviation; absent with fewer than two samples
    pub stdev_llm_time: Option<f64>,
    pub mean_tokens: f64,
    pub mean_datasets_equality: f64,
    pub mean_cost_eur: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionPerformance {
    pub question: String,
    pub mean_llm_time: f64,
    pub stdev_llm_time: Option<f64>,
    pub mean_rows_equality: f64,
    pub mean_columns_equality: f64,
    pub mean_datasets_equality: f64,
}

/// One row of the combined ranking; each cell is `"rank (value)"` or blank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedRank {
    pub model: String,
    pub rank_quality: String,
    pub rank_time: String,
    pub rank_price: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub source: Option<String>,
    pub files: Vec<PathBuf>,
    pub per_model: Vec<ModelPerformance>,
    pub per_question: Vec<QuestionPerformance>,
    pub best_by_time: Vec<(String, f64)>,
    pub best_by_cost: Vec<(String, f64)>,
    pub best_by_quality: Vec<(String, f64)>,
    pub combined_ranking: Vec<CombinedRank>,
}

impl PerformanceReport {
    /// Aggregate every summary in the workspace matching `prefix` and `source`
    pub fn from_workspace(
        workspace: &ResultsWorkspace,
        prefix: &str,
        source: Option<&str>,
    ) -> Result<Self> {
        let files = workspace.list_summaries(prefix, source)?;
        if files.is_empty() {
            return Err(SqlbenchError::invalid_input(format!(
                "No summary files found with prefix '{}' in {}",
                prefix,
                workspace.runs_dir.display()
            )));
        }

        let mut rows = Vec::new();
        let mut loaded = Vec::new();
        for path in files {
            match read_summary(&path) {
                Ok(mut file_rows) => {
                    log::debug!("Read {} row(s) from {}", file_rows.len(), path.display());
                    rows.append(&mut file_rows);
                    loaded.push(path);
                }
                Err(e) => log::warn!("Error reading {}: {}", path.display(), e),
            }
        }

        if loaded.is_empty() {
            return Err(SqlbenchError::data_processing("No summary file could be loaded"));
        }

        let mut report = Self::from_rows(&rows);
        report.source = source.map(str::to_string);
        report.files = loaded;
        Ok(report)
    }

    pub fn from_rows(rows: &[SummaryRow]) -> Self {
        let per_model = model_performance(rows);
        let per_question = question_performance(rows);

        let mut best_by_time: Vec<(String, f64)> = per_model
            .iter()
            .map(|m| (m.model.clone(), m.mean_llm_time))
            .collect();
        best_by_time.sort_by(|a, b| cmp_f64(a.1, b.1));

        let mut best_by_cost: Vec<(String, f64)> = per_model
            .iter()
            .map(|m| (m.model.clone(), m.mean_cost_eur))
            .collect();
        best_by_cost.sort_by(|a, b| cmp_f64(a.1, b.1));

        let mut best_by_quality: Vec<(String, f64)> = per_model
            .iter()
            .map(|m| (m.model.clone(), m.mean_datasets_equality))
            .collect();
        best_by_quality.sort_by(|a, b| cmp_f64(b.1, a.1));

        let combined_ranking = combined_ranking(&per_model);

        Self {
            source: None,
            files: Vec::new(),
            per_model,
            per_question,
            best_by_time,
            best_by_cost,
            best_by_quality,
            combined_ranking,
        }
    }

    /// Render the report as pipe tables
    pub fn render(&self) -> String {
        let mut out = String::new();

        if let Some(source) = &self.source {
            let _ = writeln!(out, "Data source: {}", source);
        }

        let _ = writeln!(out, "\nPerformance Report per model:\n");
        let mut table = PipeTable::new(&[
            "model",
            "queries_executed",
            "mean_sql_time",
            "mean_llm_time",
            "stdev_llm_time",
            "mean_tokens",
            "mean_datasets_equality",
            "mean_cost_EUR",
        ]);
        for m in &self.per_model {
            table.push(vec![
                m.model.clone(),
                m.queries_executed.to_string(),
                format_float(m.mean_sql_time),
                format_float(m.mean_llm_time),
                format_optional(m.stdev_llm_time),
                format_float(m.mean_tokens),
                format_float(m.mean_datasets_equality),
                format_float(m.mean_cost_eur),
            ]);
        }
        let _ = writeln!(out, "{}", table.render());

        let _ = writeln!(out, "\nPerformance Report per query:\n");
        let mut table = PipeTable::new(&[
            "question",
            "mean_llm_time",
            "stdev_llm_time",
            "mean_rows_equality",
            "mean_columns_equality",
            "mean_datasets_equality",
        ]);
        for q in &self.per_question {
            table.push(vec![
                q.question.clone(),
                format_float(q.mean_llm_time),
                format_optional(q.stdev_llm_time),
                format_float(q.mean_rows_equality),
                format_float(q.mean_columns_equality),
                format_float(q.mean_datasets_equality),
            ]);
        }
        let _ = writeln!(out, "{}", table.render());

        for (title, column, ranking) in [
            ("Best models based on average LLM time:", "mean_llm_time", &self.best_by_time),
            ("Best models based on mean token cost:", "mean_cost_EUR", &self.best_by_cost),
            (
                "Best models based on average datasets equality:",
                "mean_datasets_equality",
                &self.best_by_quality,
            ),
        ] {
            let _ = writeln!(out, "\n{}\n", title);
            let mut table = PipeTable::new(&["model", column]);
            for (model, value) in ranking {
                table.push(vec![model.clone(), format_float(*value)]);
            }
            let _ = writeln!(out, "{}", table.render());
        }

        let _ = writeln!(
            out,
            "\n\nRanking of the models based on the total cost, LLM time and source rows equality:\n"
        );
        let mut table = PipeTable::new(&["model", "rank_quality", "rank_time", "rank_price"]);
        for r in &self.combined_ranking {
            table.push(vec![
                r.model.clone(),
                r.rank_quality.clone(),
                r.rank_time.clone(),
                r.rank_price.clone(),
            ]);
        }
        let _ = writeln!(out, "{}", table.render());

        out
    }

    /// Write the rendered report, replacing any previous one
    pub fn save(&self, workspace: &ResultsWorkspace) -> Result<PathBuf> {
        let path = workspace.report_path(self.source.as_deref());
        fs::create_dir_all(&workspace.root)?;
        fs::write(&path, self.render())?;
        log::info!("Performance report saved to: {}", path.display());
        Ok(path)
    }
}

fn model_performance(rows: &[SummaryRow]) -> Vec<ModelPerformance> {
    let mut groups: IndexMap<&str, Vec<&SummaryRow>> = IndexMap::new();
    for row in rows {
        groups.entry(row.model.as_str()).or_default().push(row);
    }
    groups.sort_keys();

    groups
        .into_iter()
        .map(|(model, rows)| {
            let llm_times: Vec<f64> = rows.iter().map(|r| r.llm_time).collect();
            ModelPerformance {
                model: model.to_string(),
                queries_executed: rows.len(),
                mean_sql_time: round_to(mean(rows.iter().map(|r| r.sql_time)), 2),
                mean_llm_time: round_to(mean(llm_times.iter().copied()), 2),
                stdev_llm_time: sample_stdev(&llm_times).map(|s| round_to(s, 2)),
                mean_tokens: round_to(mean(rows.iter().map(|r| r.total_tokens as f64)), 2),
                mean_datasets_equality: round_to(mean(rows.iter().map(|r| r.source_rows_equality)), 2),
                mean_cost_eur: round_to(
                    mean(rows.iter().map(|r| r.cost_input_eur + r.cost_output_eur)),
                    6,
                ),
            }
        })
        .collect()
}

fn question_performance(rows: &[SummaryRow]) -> Vec<QuestionPerformance> {
    let mut groups: IndexMap<&str, Vec<&SummaryRow>> = IndexMap::new();
    for row in rows {
        groups.entry(row.question.as_str()).or_default().push(row);
    }
    groups.sort_by(|a, _, b, _| cmp_question(a, b));

    groups
        .into_iter()
        .map(|(question, rows)| {
            let llm_times: Vec<f64> = rows.iter().map(|r| r.llm_time).collect();
            QuestionPerformance {
                question: question.to_string(),
                mean_llm_time: round_to(mean(llm_times.iter().copied()), 2),
                stdev_llm_time: sample_stdev(&llm_times).map(|s| round_to(s, 2)),
                mean_rows_equality: round_to(mean(rows.iter().map(|r| r.rows_equality)), 2),
                mean_columns_equality: round_to(mean(rows.iter().map(|r| r.columns_equality)), 2),
                mean_datasets_equality: round_to(mean(rows.iter().map(|r| r.source_rows_equality)), 2),
            }
        })
        .collect()
}

/// Min-method ranks on quality (descending), time and price (ascending)
fn combined_ranking(per_model: &[ModelPerformance]) -> Vec<CombinedRank> {
    let quality: Vec<f64> = per_model.iter().map(|m| m.mean_datasets_equality).collect();
    let time: Vec<f64> = per_model.iter().map(|m| m.mean_llm_time).collect();
    let price: Vec<f64> = per_model.iter().map(|m| m.mean_cost_eur).collect();

    let mut ranked: Vec<(CombinedRank, [usize; 3])> = per_model
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let ranks = [
                min_rank(&quality, quality[i], true),
                min_rank(&time, time[i], false),
                min_rank(&price, price[i], false),
            ];
            let display = |rank: usize, value: f64| {
                if rank <= MAX_DISPLAYED_RANK {
                    format!("{} ({})", rank, format_float(value))
                } else {
                    String::new()
                }
            };
            let row = CombinedRank {
                model: m.model.clone(),
                rank_quality: display(ranks[0], quality[i]),
                rank_time: display(ranks[1], time[i]),
                rank_price: display(ranks[2], price[i]),
            };
            let sort_key = ranks.map(|r| if r <= MAX_DISPLAYED_RANK { r } else { usize::MAX });
            (row, sort_key)
        })
        .collect();

    ranked.sort_by_key(|(_, key)| *key);
    ranked.into_iter().map(|(row, _)| row).collect()
}

/// 1 + number of values strictly better than `value`
fn min_rank(values: &[f64], value: f64, higher_is_better: bool) -> usize {
    1 + values
        .iter()
        .filter(|&&v| if higher_is_better { v > value } else { v < value })
        .count()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values.iter().copied());
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Numeric question labels sort numerically, before any others
fn cmp_question(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Floats always show a fractional part, as `1.0` rather than `1`
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_else(|| "nan".to_string())
}

/// Markdown pipe table: numeric columns right-aligned, text left-aligned
struct PipeTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl PipeTable {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn is_numeric_column(&self, index: usize) -> bool {
        let mut cells = self
            .rows
            .iter()
            .filter_map(|r| r.get(index))
            .filter(|c| !c.is_empty())
            .peekable();
        cells.peek().is_some() && cells.all(|c| c.parse::<f64>().is_ok())
    }

    fn render(&self) -> String {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let numeric: Vec<bool> = (0..self.headers.len()).map(|i| self.is_numeric_column(i)).collect();

        let format_row = |cells: &[String]| {
            let parts: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, &w)| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    if numeric[i] {
                        format!(" {:>w$} ", cell, w = w)
                    } else {
                        format!(" {:<w$} ", cell, w = w)
                    }
                })
                .collect();
            format!("|{}|", parts.join("|"))
        };

        let separator: Vec<String> = widths
            .iter()
            .zip(&numeric)
            .map(|(&w, &is_numeric)| {
                if is_numeric {
                    format!("{}:", "-".repeat(w + 1))
                } else {
                    format!(":{}", "-".repeat(w + 1))
                }
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format_row(&self.headers));
        lines.push(format!("|{}|", separator.join("|")));
        for row in &self.rows {
            lines.push(format_row(row));
        }
        lines.join("\n")
    }
}

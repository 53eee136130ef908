//! Result set comparison between a baseline and an LLM-generated candidate
//!
//! Column names and order produced by generated SQL are unreliable, so the
//! candidate's columns are matched to the baseline by the content of their
//! first row. Rows are then compared as sets of tuples, ignoring row order
//! and duplicates.

use crate::normalize::{normalize_numeric_columns, round_to};
use crate::table::{Cell, Table};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Row counts above which row tuples are built in parallel
const PARALLEL_ROW_THRESHOLD: usize = 10_000;

/// Similarity metrics between a baseline and a candidate result set
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    /// Candidate rows / baseline rows, 0.0 when the candidate has more rows
    pub row_ratio: f64,
    /// Aligned candidate columns / baseline columns, 0.0 when the candidate has more
    pub column_ratio: f64,
    /// Share of distinct baseline rows found in the candidate
    pub baseline_coverage: f64,
    /// Share of distinct candidate rows found in the baseline
    pub candidate_coverage: f64,
}

impl ComparisonOutcome {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_exact_match(&self) -> bool {
        self.row_ratio == 1.0
            && self.column_ratio == 1.0
            && self.baseline_coverage == 1.0
            && self.candidate_coverage == 1.0
    }

    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (
            self.row_ratio,
            self.column_ratio,
            self.baseline_coverage,
            self.candidate_coverage,
        )
    }
}

/// Structural problems that make a comparison impossible
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComparisonError {
    #[error("{table} column '{column}' has {found} values, expected {expected}")]
    RaggedTable {
        table: &'static str,
        column: String,
        found: usize,
        expected: usize,
    },
}

/// A failed comparison, tagged with the question it belongs to
#[derive(Error, Debug, Clone, PartialEq)]
#[error("question {question}: {error}")]
pub struct ComparisonFailure {
    pub question: String,
    pub error: ComparisonError,
}

/// Compare a candidate result set against its baseline.
///
/// Never fails: absent tables or an empty baseline yield the zero outcome,
/// and structural failures are logged against `question` and also reported
/// as the zero outcome. Numeric columns of both tables are rounded in place.
pub fn compare(
    baseline: Option<&mut Table>,
    candidate: Option<&mut Table>,
    question: &str,
) -> ComparisonOutcome {
    match try_compare(baseline, candidate, question) {
        Ok(outcome) => outcome,
        Err(failure) => {
            log::warn!("Comparison failed for {}", failure);
            ComparisonOutcome::zero()
        }
    }
}

/// Same as [`compare`] but surfaces structural failures to the caller
pub fn try_compare(
    baseline: Option<&mut Table>,
    candidate: Option<&mut Table>,
    question: &str,
) -> std::result::Result<ComparisonOutcome, ComparisonFailure> {
    let (Some(baseline), Some(candidate)) = (baseline, candidate) else {
        log::debug!("Question {}: missing baseline or candidate, nothing to compare", question);
        return Ok(ComparisonOutcome::zero());
    };

    if baseline.is_empty() {
        log::debug!("Question {}: empty baseline, nothing to compare", question);
        return Ok(ComparisonOutcome::zero());
    }

    compare_tables(baseline, candidate).map_err(|error| ComparisonFailure {
        question: question.to_string(),
        error,
    })
}

fn compare_tables(
    baseline: &mut Table,
    candidate: &mut Table,
) -> std::result::Result<ComparisonOutcome, ComparisonError> {
    check_rectangular(baseline, "baseline")?;
    check_rectangular(candidate, "candidate")?;

    normalize_numeric_columns(baseline, candidate);

    let aligned = align_columns_by_first_row(baseline, candidate);

    let baseline_rows = row_set(baseline);
    let candidate_rows = row_set(&aligned);
    let shared = baseline_rows.intersection(&candidate_rows).count();

    Ok(ComparisonOutcome {
        row_ratio: bounded_ratio(candidate.row_count(), baseline.row_count()),
        column_ratio: bounded_ratio(aligned.column_count(), baseline.column_count()),
        baseline_coverage: coverage(shared, baseline_rows.len()),
        candidate_coverage: coverage(shared, candidate_rows.len()),
    })
}

fn check_rectangular(table: &Table, label: &'static str) -> std::result::Result<(), ComparisonError> {
    match table.ragged_column() {
        Some((column, found, expected)) => Err(ComparisonError::RaggedTable {
            table: label,
            column: column.to_string(),
            found,
            expected,
        }),
        None => Ok(()),
    }
}

/// Reorder the candidate's columns to follow the baseline, matching columns
/// by their first-row value.
///
/// For each baseline column, the first not-yet-claimed candidate column
/// (left to right) whose first cell equals the baseline's first cell is
/// claimed. There is no backtracking: columns sharing a first-row value can
/// be paired wrongly, and baseline columns without a match are dropped from
/// the result. When either table has no rows the candidate is returned as is.
pub fn align_columns_by_first_row(baseline: &Table, candidate: &Table) -> Table {
    let (Some(baseline_first), Some(candidate_first)) = (baseline.first_row(), candidate.first_row())
    else {
        return candidate.clone();
    };

    let mut claimed = vec![false; candidate_first.len()];
    let mut order = Vec::with_capacity(baseline_first.len());

    for value in &baseline_first {
        let found = candidate_first
            .iter()
            .enumerate()
            .find(|(i, candidate_value)| !claimed[*i] && *candidate_value == value);

        if let Some((index, _)) = found {
            claimed[index] = true;
            order.push(index);
        }
    }

    log::debug!(
        "Aligned {} of {} baseline column(s) by first-row value",
        order.len(),
        baseline_first.len()
    );

    candidate.select(&order)
}

/// Distinct rows of a table as column-ordered tuples
fn row_set(table: &Table) -> HashSet<Vec<Cell>> {
    let build_row = |index: usize| -> Vec<Cell> {
        table
            .columns
            .iter()
            .map(|column| column.values[index].clone())
            .collect()
    };

    let rows = table.row_count();
    if rows >= PARALLEL_ROW_THRESHOLD {
        (0..rows).into_par_iter().map(build_row).collect()
    } else {
        (0..rows).map(build_row).collect()
    }
}

fn bounded_ratio(candidate: usize, baseline: usize) -> f64 {
    if baseline == 0 || candidate > baseline {
        return 0.0;
    }
    round2(candidate as f64 / baseline as f64)
}

fn coverage(shared: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(shared as f64 / total as f64)
}

fn round2(value: f64) -> f64 {
    round_to(value, 2).unwrap_or(value)
}

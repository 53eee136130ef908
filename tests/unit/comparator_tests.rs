//! Unit tests for result set comparison

use crate::common::assertions::assert_outcome;
use sqlbench::{compare, try_compare, Cell, ComparisonError, Column, Table};

fn products(rows: usize) -> Table {
    Table::from_rows(
        &["id", "name", "price"],
        (1..=rows)
            .map(|i| {
                vec![
                    Cell::Int(i as i64),
                    Cell::Text(format!("product-{}", i)),
                    Cell::Float(i as f64 * 10.0 + 0.5),
                ]
            })
            .collect(),
    )
}

#[test]
fn test_empty_baseline_scores_zero_for_any_candidate() {
    let candidates = [None, Some(Table::default()), Some(products(3))];

    for candidate in candidates {
        let mut baseline = Table::from_rows(&["id"], vec![]);
        let mut candidate = candidate;
        let outcome = compare(Some(&mut baseline), candidate.as_mut(), "p1");
        assert_outcome(&outcome, (0.0, 0.0, 0.0, 0.0));
    }
}

#[test]
fn test_identical_tables_match_fully() {
    let mut baseline = products(5);
    let mut candidate = products(5);

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "p2");
    assert_outcome(&outcome, (1.0, 1.0, 1.0, 1.0));
    assert!(outcome.is_exact_match());
}

#[test]
fn test_candidate_missing_one_row() {
    let mut baseline = products(4);
    let mut candidate = Table::from_rows(
        &["id", "name", "price"],
        (0..3).filter_map(|i| baseline.row(i)).collect(),
    );

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "p3");
    assert_outcome(&outcome, (0.75, 1.0, 0.75, 1.0));
}

#[test]
fn test_oversized_candidate_has_zero_row_ratio() {
    let mut baseline = products(2);
    let mut candidate = products(3);

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "p4");
    assert_eq!(outcome.row_ratio, 0.0);
    assert_eq!(outcome.column_ratio, 1.0);
    assert_eq!(outcome.baseline_coverage, 1.0);
    assert_eq!(outcome.candidate_coverage, 0.67);
}

#[test]
fn test_column_order_does_not_change_metrics() {
    let mut baseline = products(6);
    let mut straight = products(4);
    let unpermuted = compare(Some(&mut baseline.clone()), Some(&mut straight), "p5");

    let source = products(4);
    let mut permuted = source.select(&[2, 0, 1]);
    let outcome = compare(Some(&mut baseline), Some(&mut permuted), "p5");

    assert_eq!(permuted.column_names(), vec!["price", "id", "name"]);
    assert_eq!(outcome, unpermuted);
    assert_outcome(&outcome, (0.67, 1.0, 0.67, 1.0));
}

#[test]
fn test_precision_differences_are_rounded_away() {
    let mut baseline = Table::from_rows(&["v"], vec![vec![Cell::Float(10.0)]]);
    let mut candidate = Table::from_rows(&["v"], vec![vec![Cell::Float(10.00000001)]]);

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "p6");
    assert_outcome(&outcome, (1.0, 1.0, 1.0, 1.0));
}

#[test]
fn test_swapped_columns_realigned_by_first_row() {
    let mut baseline = Table::from_rows(
        &["id", "name"],
        vec![
            vec![Cell::Int(1), Cell::from("a")],
            vec![Cell::Int(2), Cell::from("b")],
        ],
    );
    let mut candidate = Table::from_rows(
        &["name", "id"],
        vec![
            vec![Cell::from("a"), Cell::Int(1)],
            vec![Cell::from("b"), Cell::Int(2)],
        ],
    );

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "scenario-1");
    assert_outcome(&outcome, (1.0, 1.0, 1.0, 1.0));
}

#[test]
fn test_candidate_with_two_extra_rows() {
    let mut baseline = products(10);
    let mut candidate = products(12);

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "scenario-2");
    assert_outcome(&outcome, (0.0, 1.0, 1.0, 0.83));
}

#[test]
fn test_row_order_is_ignored() {
    let mut baseline = products(3);
    let source = products(3);
    let mut reversed = Table::from_rows(
        &["id", "name", "price"],
        (0..3).rev().filter_map(|i| source.row(i)).collect(),
    );

    // First rows differ, so alignment has nothing to anchor on
    let outcome = compare(Some(&mut baseline), Some(&mut reversed), "reversed");
    assert_eq!(outcome.row_ratio, 1.0);
    assert_eq!(outcome.column_ratio, 0.0);
}

#[test]
fn test_duplicate_rows_count_once_for_coverage() {
    let mut baseline = Table::from_rows(
        &["country"],
        vec![vec!["FR".into()], vec!["DE".into()]],
    );
    let mut candidate = Table::from_rows(
        &["country"],
        vec![vec!["FR".into()], vec!["FR".into()]],
    );

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "dups");
    assert_outcome(&outcome, (1.0, 1.0, 0.5, 1.0));
}

#[test]
fn test_integer_and_float_columns_compare_equal() {
    let mut baseline = Table::from_rows(&["total"], vec![vec![Cell::Int(42)], vec![Cell::Int(7)]]);
    let mut candidate = Table::from_rows(
        &["total"],
        vec![vec![Cell::Float(42.0)], vec![Cell::Float(7.0)]],
    );

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "numeric");
    assert!(outcome.is_exact_match());
}

#[test]
fn test_unmatched_candidate_column_lowers_column_ratio() {
    let mut baseline = Table::from_rows(
        &["id", "name"],
        vec![vec![Cell::Int(1), "a".into()], vec![Cell::Int(2), "b".into()]],
    );
    let mut candidate = Table::from_rows(
        &["id", "label"],
        vec![vec![Cell::Int(1), "A".into()], vec![Cell::Int(2), "B".into()]],
    );

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "partial");
    assert_eq!(outcome.row_ratio, 1.0);
    assert_eq!(outcome.column_ratio, 0.5);
    assert_eq!(outcome.baseline_coverage, 0.0);
    assert_eq!(outcome.candidate_coverage, 0.0);
}

#[test]
fn test_ragged_candidate_is_reported() {
    let mut baseline = products(2);
    let mut candidate = Table::new(vec![
        Column::new("id", vec![Cell::Int(1), Cell::Int(2)]),
        Column::new("name", vec![Cell::from("product-1")]),
    ]);

    let failure = try_compare(Some(&mut baseline), Some(&mut candidate), "ragged").unwrap_err();
    assert_eq!(failure.question, "ragged");
    assert!(matches!(failure.error, ComparisonError::RaggedTable { table: "candidate", .. }));

    let outcome = compare(Some(&mut baseline), Some(&mut candidate), "ragged");
    assert_outcome(&outcome, (0.0, 0.0, 0.0, 0.0));
}

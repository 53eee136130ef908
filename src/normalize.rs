//! Numeric precision alignment between two result sets
//!
//! Generated SQL often produces the same figures as the reference query with
//! a different decimal representation (`19.99` vs `19.990000000000002`, or a
//! `DECIMAL(10,2)` against a `DOUBLE`). Before comparing rows, every numeric
//! column shared by name is rounded to the smallest precision either side
//! actually carries.

use crate::table::{Cell, Column, Table};
use std::collections::HashSet;

/// Number of digits after the decimal point in the shortest representation
/// of `value`. Values without a fractional part report zero.
pub fn decimal_places(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let repr = value.to_string();
    match repr.split_once('.') {
        Some((_, fraction)) => fraction.len() as u32,
        None => 0,
    }
}

/// Round half away from zero to `digits` decimal places.
///
/// Returns `None` when scaling would leave the finite range; callers keep
/// the original value in that case.
pub fn round_to(value: f64, digits: u32) -> Option<f64> {
    let exponent = i32::try_from(digits).ok()?;
    let factor = 10f64.powi(exponent);
    if !factor.is_finite() {
        return None;
    }
    let scaled = value * factor;
    if !scaled.is_finite() {
        return None;
    }
    Some(scaled.round() / factor)
}

/// Smallest fractional precision across the non-null values of a column.
/// Returns `None` for non-numeric columns; an all-null column yields 0.
pub fn column_precision(column: &Column) -> Option<u32> {
    if !column.is_numeric() {
        return None;
    }

    let precision = column
        .values
        .iter()
        .filter_map(|v| match v {
            Cell::Int(_) => Some(0),
            Cell::Float(f) => Some(decimal_places(*f)),
            _ => None,
        })
        .min()
        .unwrap_or(0);

    Some(precision)
}

fn round_column(column: &mut Column, digits: u32) {
    for value in column.values.iter_mut() {
        if let Cell::Float(f) = value {
            if let Some(rounded) = round_to(*f, digits) {
                *f = rounded;
            }
        }
    }
}

/// Round every numeric column present in both tables to their shared
/// minimum precision. Tables are modified in place; row and column counts
/// and order are preserved. Columns are matched by name, first occurrence.
pub fn normalize_numeric_columns(left: &mut Table, right: &mut Table) {
    let mut seen = HashSet::new();
    let names: Vec<String> = left
        .columns
        .iter()
        .map(|c| c.name.clone())
        .filter(|name| seen.insert(name.clone()))
        .collect();

    for name in names {
        let left_precision = left.column(&name).and_then(column_precision);
        let right_precision = right.column(&name).and_then(column_precision);

        let (Some(lp), Some(rp)) = (left_precision, right_precision) else {
            continue;
        };
        let shared = lp.min(rp);

        log::debug!("Rounding column '{}' to {} decimal place(s)", name, shared);

        if let Some(column) = left.column_mut(&name) {
            round_column(column, shared);
        }
        if let Some(column) = right.column_mut(&name) {
            round_column(column, shared);
        }
    }
}

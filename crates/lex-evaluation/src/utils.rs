//! Shared utilities for the evaluation harness.
//!
//! This module contains the helpers that move data between polars frames
//! and the dense matrices consumed by the classifier, plus small label
//! statistics used by several strategies.

use crate::error::{EvaluationError, Result, ResultExt};
use crate::types::Label;
use polars::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Read a column as `f64` values, treating both null and NaN as absent.
///
/// Booleans and integers are widened; any other dtype is rejected.
pub fn numeric_values(df: &DataFrame, col_name: &str) -> Result<Vec<Option<f64>>> {
    let series = df.column(col_name)?.as_materialized_series();
    if !is_numeric_dtype(series.dtype()) && !matches!(series.dtype(), DataType::Boolean) {
        return Err(EvaluationError::InvalidData(format!(
            "column '{}' has non-numeric type {:?}",
            col_name,
            series.dtype()
        )));
    }

    let floats = series
        .strict_cast(&DataType::Float64)
        .context(format!("casting column '{}' to Float64", col_name))?;
    Ok(floats
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Get the column names of a frame in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Frame / Matrix Conversion
// =============================================================================

/// Build a row-major matrix from every column of a frame.
///
/// Fails if any value is absent; the classifier only accepts complete rows.
pub fn frame_to_matrix(df: &DataFrame) -> Result<Vec<Vec<f64>>> {
    let n_rows = df.height();
    let mut matrix = vec![Vec::with_capacity(df.width()); n_rows];

    for col_name in column_names(df) {
        let values = numeric_values(df, &col_name)?;
        for (row_idx, (row, value)) in matrix.iter_mut().zip(values).enumerate() {
            match value {
                Some(v) => row.push(v),
                None => {
                    return Err(EvaluationError::InvalidData(format!(
                        "column '{}' has a missing value at row {}",
                        col_name, row_idx
                    )));
                }
            }
        }
    }

    Ok(matrix)
}

/// Build a row-major matrix that keeps absent values as `None`.
pub fn frame_to_optional_matrix(df: &DataFrame) -> Result<Vec<Vec<Option<f64>>>> {
    let n_rows = df.height();
    let mut matrix = vec![Vec::with_capacity(df.width()); n_rows];

    for col_name in column_names(df) {
        let values = numeric_values(df, &col_name)?;
        for (row, value) in matrix.iter_mut().zip(values) {
            row.push(value);
        }
    }

    Ok(matrix)
}

/// Select rows of a frame by position, in the given order.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        PlSmallStr::from_static("idx"),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let floats = series.cast(&DataType::Float64)?;
    let filled: Vec<Option<f64>> = floats
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();

    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Label Utilities
// =============================================================================

/// Most frequent label. Ties go to the lowest label.
pub fn majority_label(labels: &[Label]) -> Option<Label> {
    let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    // BTreeMap iterates in ascending label order; keep the first maximum.
    counts
        .into_iter()
        .fold(None, |best: Option<(Label, usize)>, (label, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((label, count)),
        })
        .map(|(label, _)| label)
}

/// Number of distinct labels.
pub fn distinct_labels(labels: &[Label]) -> usize {
    let mut sorted = labels.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_numeric_values_treats_nan_as_missing() {
        let df = df![
            "x" => [Some(1.0), None, Some(f64::NAN), Some(4.0)],
        ]
        .unwrap();

        let values = numeric_values(&df, "x").unwrap();
        assert_eq!(values, vec![Some(1.0), None, None, Some(4.0)]);
    }

    #[test]
    fn test_numeric_values_widens_integers() {
        let df = df![
            "x" => [Some(1i64), None, Some(3i64)],
        ]
        .unwrap();

        let values = numeric_values(&df, "x").unwrap();
        assert_eq!(values, vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_numeric_values_rejects_strings() {
        let df = df![
            "name" => ["a", "b"],
        ]
        .unwrap();

        let err = numeric_values(&df, "name").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_frame_to_matrix_is_row_major() {
        let df = df![
            "a" => [1.0, 2.0, 3.0],
            "b" => [10.0, 20.0, 30.0],
        ]
        .unwrap();

        let matrix = frame_to_matrix(&df).unwrap();
        assert_eq!(matrix, vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]]);
    }

    #[test]
    fn test_frame_to_matrix_rejects_nulls() {
        let df = df![
            "a" => [Some(1.0), None],
        ]
        .unwrap();

        assert!(frame_to_matrix(&df).is_err());
        let optional = frame_to_optional_matrix(&df).unwrap();
        assert_eq!(optional, vec![vec![Some(1.0)], vec![None]]);
    }

    #[test]
    fn test_take_rows_preserves_requested_order() {
        let df = df![
            "a" => [0.0, 1.0, 2.0, 3.0],
        ]
        .unwrap();

        let taken = take_rows(&df, &[3, 0, 2]).unwrap();
        let values = numeric_values(&taken, "a").unwrap();
        assert_eq!(values, vec![Some(3.0), Some(0.0), Some(2.0)]);
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1.0), None, Some(3.0)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.get(0).unwrap().try_extract::<f64>().unwrap(), 1.0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
        assert_eq!(filled.get(2).unwrap().try_extract::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_majority_label() {
        assert_eq!(majority_label(&[0, 1, 1, 0, 1]), Some(1));
        assert_eq!(majority_label(&[1, 1, 0]), Some(1));
        assert_eq!(majority_label(&[]), None);
    }

    #[test]
    fn test_majority_label_tie_goes_to_lowest() {
        assert_eq!(majority_label(&[1, 0, 1, 0]), Some(0));
        assert_eq!(majority_label(&[1, -1]), Some(-1));
    }

    #[test]
    fn test_distinct_labels() {
        assert_eq!(distinct_labels(&[1, 1, 1]), 1);
        assert_eq!(distinct_labels(&[0, 1, 0]), 2);
        assert_eq!(distinct_labels(&[]), 0);
    }
}

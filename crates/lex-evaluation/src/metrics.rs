//! Classification metrics.

use crate::error::{EvaluationError, Result};
use crate::types::Label;

/// Fraction of positions where `predicted` equals `truth`.
///
/// Returns 0.0 for empty inputs.
///
/// # Errors
///
/// Returns [`EvaluationError::LengthMismatch`] if the slices have different
/// lengths.
pub fn accuracy(truth: &[Label], predicted: &[Label]) -> Result<f64> {
    if truth.len() != predicted.len() {
        return Err(EvaluationError::LengthMismatch {
            predicted: predicted.len(),
            truth: truth.len(),
        });
    }
    if truth.is_empty() {
        return Ok(0.0);
    }

    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / truth.len() as f64)
}

//! Classifier contract and the bundled random forest.
//!
//! The harness only talks to models through [`Classifier`]: `fit` on a dense
//! row-major matrix, `predict` labels for another matrix, and
//! `clone_unfitted` to obtain a fresh estimator with the same parameters
//! (used when a strategy retrains on a reduced feature set).

mod forest;
mod tree;

pub use forest::RandomForestClassifier;

use crate::error::{EvaluationError, Result};
use crate::types::Label;
use crate::utils::distinct_labels;
use std::fmt;

/// A supervised classifier over dense `f64` feature rows.
pub trait Classifier: Send + fmt::Debug {
    /// Fit the model, replacing any previous state.
    fn fit(&mut self, x: &[Vec<f64>], y: &[Label]) -> Result<()>;

    /// Predict one label per row.
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<Label>>;

    /// Create a boxed estimator configured identically to `self` but with no
    /// trained state.
    fn clone_unfitted(&self) -> Box<dyn Classifier>;

    /// Human readable name for logs
    fn name(&self) -> &str {
        "classifier"
    }

    fn is_fitted(&self) -> bool;
}

/// Check a training set and return its feature count.
///
/// Fails with [`EvaluationError::Training`] when the set is empty, has no
/// feature columns, has ragged rows, contains non-finite values, has fewer
/// labels than rows, or carries a single class.
pub fn validate_training_set(x: &[Vec<f64>], y: &[Label]) -> Result<usize> {
    if x.is_empty() {
        return Err(EvaluationError::Training(
            "training set is empty".to_string(),
        ));
    }
    if x.len() != y.len() {
        return Err(EvaluationError::Training(format!(
            "{} feature rows but {} labels",
            x.len(),
            y.len()
        )));
    }

    let n_features = x[0].len();
    if n_features == 0 {
        return Err(EvaluationError::Training(
            "training set has no feature columns".to_string(),
        ));
    }
    if let Some(row_idx) = x.iter().position(|row| row.len() != n_features) {
        return Err(EvaluationError::Training(format!(
            "row {} has {} features, expected {}",
            row_idx,
            x[row_idx].len(),
            n_features
        )));
    }
    if x.iter().flatten().any(|v| !v.is_finite()) {
        return Err(EvaluationError::Training(
            "training set contains missing or non-finite values".to_string(),
        ));
    }

    let n_classes = distinct_labels(y);
    if n_classes < 2 {
        return Err(EvaluationError::Training(format!(
            "need at least 2 classes, found {}",
            n_classes
        )));
    }

    Ok(n_features)
}

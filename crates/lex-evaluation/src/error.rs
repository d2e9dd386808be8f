//! Custom error types for the evaluation harness.
//!
//! This module provides the error hierarchy using `thiserror` for the three
//! harness phases (split, fit, evaluate) and the per-strategy failures.
//!
//! Errors are serializable so that a failed run can be reported as JSON by
//! the CLI, using the same `{code, message}` shape for every variant.

use crate::types::{AccuracyRecords, StrategyId};
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Phases of the harness, in the order they must be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Partitioning the dataset into train/test/missing.
    Load,
    /// Fitting the baseline classifier.
    Train,
    /// Running the six remediation strategies.
    Evaluate,
}

impl Phase {
    /// Returns the name of the harness method that runs this phase.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Train => "train",
            Self::Evaluate => "evaluate",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.method_name())
    }
}

/// The main error type for the evaluation harness.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// Fewer complete rows than the configured train sample size.
    #[error("Insufficient data: need {required} complete rows for training, found {available}")]
    InsufficientData { required: usize, available: usize },

    /// The table has no feature columns besides the target.
    #[error("Dataset needs a target column and at least one feature column, found {width} column(s)")]
    NoTargetColumn { width: usize },

    /// The classifier could not be trained.
    #[error("Training failed: {0}")]
    Training(String),

    /// Prediction and truth vectors differ in length.
    #[error("Length mismatch: {predicted} predictions for {truth} true labels")]
    LengthMismatch { predicted: usize, truth: usize },

    /// A phase was invoked before the phase it depends on.
    #[error("Harness not initialized: call {required}() before {attempted}()")]
    NotInitialized { attempted: Phase, required: Phase },

    /// Input data does not satisfy the schema.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The classifier could not produce predictions.
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// Imputation failed for a column.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    Imputation { column: String, reason: String },

    /// A strategy failed; `completed` holds the records of the strategies
    /// that finished before it.
    #[error("Strategy {strategy} failed: {source}")]
    StrategyFailed {
        strategy: StrategyId,
        completed: Box<AccuracyRecords>,
        #[source]
        source: Box<EvaluationError>,
    },

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EvaluationError>,
    },
}

impl EvaluationError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EvaluationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get a stable error code for machine consumption.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::NoTargetColumn { .. } => "NO_TARGET_COLUMN",
            Self::Training(_) => "TRAINING_ERROR",
            Self::LengthMismatch { .. } => "LENGTH_MISMATCH",
            Self::NotInitialized { .. } => "NOT_INITIALIZED",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::Prediction(_) => "PREDICTION_ERROR",
            Self::Imputation { .. } => "IMPUTATION_FAILED",
            Self::StrategyFailed { .. } => "STRATEGY_FAILED",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// The strategy that failed, if this error came out of the evaluate phase.
    pub fn failed_strategy(&self) -> Option<StrategyId> {
        match self {
            Self::StrategyFailed { strategy, .. } => Some(*strategy),
            Self::WithContext { source, .. } => source.failed_strategy(),
            _ => None,
        }
    }

    /// Records of the strategies that completed before a strategy failure.
    pub fn partial_results(&self) -> Option<&AccuracyRecords> {
        match self {
            Self::StrategyFailed { completed, .. } => Some(completed),
            Self::WithContext { source, .. } => source.partial_results(),
            _ => None,
        }
    }
}

impl Serialize for EvaluationError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EvaluationError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, EvaluationError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EvaluationError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            EvaluationError::NoTargetColumn { width: 1 }.error_code(),
            "NO_TARGET_COLUMN"
        );
        assert_eq!(
            EvaluationError::InsufficientData {
                required: 3000,
                available: 10
            }
            .error_code(),
            "INSUFFICIENT_DATA"
        );
    }

    #[test]
    fn test_not_initialized_message_names_phases() {
        let error = EvaluationError::NotInitialized {
            attempted: Phase::Evaluate,
            required: Phase::Train,
        };
        assert_eq!(
            error.to_string(),
            "Harness not initialized: call train() before evaluate()"
        );
    }

    #[test]
    fn test_strategy_failed_exposes_partial_results() {
        let mut completed = AccuracyRecords::default();
        completed.insert(StrategyId::Abstention, 0.9, 0.0);

        let error = EvaluationError::StrategyFailed {
            strategy: StrategyId::FeatureOmission,
            completed: Box::new(completed),
            source: Box::new(EvaluationError::Training("no feature columns".to_string())),
        };

        assert_eq!(error.failed_strategy(), Some(StrategyId::FeatureOmission));
        let partial = error.partial_results().unwrap();
        assert_eq!(partial.len(), 1);
        assert!(error.to_string().contains("Strategy C failed"));
    }

    #[test]
    fn test_error_serialization() {
        let error = EvaluationError::LengthMismatch {
            predicted: 3,
            truth: 4,
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("LENGTH_MISMATCH"));
        assert!(json.contains("3 predictions for 4 true labels"));
    }

    #[test]
    fn test_with_context() {
        let error = EvaluationError::Training("empty".to_string()).with_context("During fit");
        assert!(error.to_string().contains("During fit"));
        assert_eq!(error.error_code(), "TRAINING_ERROR"); // Keeps the inner code
    }

    #[test]
    fn test_polars_error_context() {
        let df = polars::prelude::DataFrame::empty();
        let error = df.column("missing").context("Reading features").unwrap_err();
        assert_eq!(error.error_code(), "POLARS_ERROR");
        assert!(error.to_string().starts_with("Reading features: "));
    }
}

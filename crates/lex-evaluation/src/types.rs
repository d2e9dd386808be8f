//! Common types shared by the harness phases.
//!
//! - [`StrategyId`]: the six remediation strategies, in evaluation order
//! - [`StrategyOutcome`]: what one strategy run produces
//! - [`AccuracyRecords`]: the two accuracy mappings folded from the outcomes
//! - [`EvaluationReport`]: the full result of the evaluate phase

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Class label. Binary labels are 0 and 1; the abstention sentinel is negative.
pub type Label = i32;

/// The six remediation strategies, identified by the letters A to F.
///
/// The declaration order is the evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StrategyId {
    /// Missing rows are answered with a sentinel label that never matches.
    #[serde(rename = "A")]
    Abstention,
    /// Missing rows are answered with the majority label of the train partition.
    #[serde(rename = "B")]
    MajorityFallback,
    /// Columns with missing values are dropped and a fresh classifier is trained.
    #[serde(rename = "C")]
    FeatureOmission,
    /// Nulls are filled with the train mean of their column.
    #[serde(rename = "D")]
    MeanImputation,
    /// Nulls are filled with the train median of their column.
    #[serde(rename = "E")]
    MedianImputation,
    /// Nulls are filled from the nearest train rows.
    #[serde(rename = "F")]
    KnnImputation,
}

impl StrategyId {
    /// All strategies in evaluation order.
    pub const ALL: [StrategyId; 6] = [
        StrategyId::Abstention,
        StrategyId::MajorityFallback,
        StrategyId::FeatureOmission,
        StrategyId::MeanImputation,
        StrategyId::MedianImputation,
        StrategyId::KnnImputation,
    ];

    /// The single-letter identifier (`'A'` to `'F'`).
    pub fn code(&self) -> char {
        match self {
            Self::Abstention => 'A',
            Self::MajorityFallback => 'B',
            Self::FeatureOmission => 'C',
            Self::MeanImputation => 'D',
            Self::MedianImputation => 'E',
            Self::KnnImputation => 'F',
        }
    }

    /// Human-readable strategy name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Abstention => "Abstention",
            Self::MajorityFallback => "Majority fallback",
            Self::FeatureOmission => "Feature omission",
            Self::MeanImputation => "Mean imputation",
            Self::MedianImputation => "Median imputation",
            Self::KnnImputation => "KNN imputation",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Result of running a single strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOutcome {
    pub strategy: StrategyId,
    /// Accuracy over the test partition followed by the missing partition.
    pub combined_accuracy: f64,
    /// Accuracy over the missing partition only.
    pub missing_accuracy: f64,
    /// Predictions for test rows followed by missing rows.
    #[serde(skip)]
    pub combined_predictions: Vec<Label>,
    /// Predictions for missing rows.
    #[serde(skip)]
    pub missing_predictions: Vec<Label>,
}

/// The two accuracy mappings, keyed by strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecords {
    /// Accuracy over test ∪ missing rows.
    pub entire_test_set: BTreeMap<StrategyId, f64>,
    /// Accuracy over missing rows only.
    pub missing_values: BTreeMap<StrategyId, f64>,
}

impl AccuracyRecords {
    pub fn insert(&mut self, strategy: StrategyId, combined: f64, missing: f64) {
        self.entire_test_set.insert(strategy, combined);
        self.missing_values.insert(strategy, missing);
    }

    /// Number of strategies recorded.
    pub fn len(&self) -> usize {
        self.entire_test_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entire_test_set.is_empty()
    }

    /// Whether every strategy has an entry in both mappings.
    pub fn is_complete(&self) -> bool {
        StrategyId::ALL.iter().all(|id| {
            self.entire_test_set.contains_key(id) && self.missing_values.contains_key(id)
        })
    }
}

impl<'a> FromIterator<&'a StrategyOutcome> for AccuracyRecords {
    fn from_iter<I: IntoIterator<Item = &'a StrategyOutcome>>(iter: I) -> Self {
        iter.into_iter()
            .fold(AccuracyRecords::default(), |mut records, outcome| {
                records.insert(
                    outcome.strategy,
                    outcome.combined_accuracy,
                    outcome.missing_accuracy,
                );
                records
            })
    }
}

/// A strategy that failed while failures were being isolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: StrategyId,
    pub code: String,
    pub message: String,
}

/// Row counts of the three partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSizes {
    pub train: usize,
    pub test: usize,
    pub missing: usize,
}

/// Full result of an evaluate phase.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// The two accuracy mappings.
    #[serde(flatten)]
    pub accuracies: AccuracyRecords,

    /// Per-strategy outcomes in evaluation order (successful strategies only).
    pub outcomes: Vec<StrategyOutcome>,

    /// Strategies that failed while failures were isolated.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StrategyFailure>,

    pub partition_sizes: PartitionSizes,

    /// Feature columns that contain at least one null in the full dataset.
    pub missing_columns: Vec<String>,

    pub duration_ms: u64,

    pub completed_at: DateTime<Utc>,
}

impl EvaluationReport {
    /// Whether all six strategies produced results.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.accuracies.is_complete()
    }

    /// Look up the outcome of one strategy.
    pub fn outcome(&self, strategy: StrategyId) -> Option<&StrategyOutcome> {
        self.outcomes.iter().find(|o| o.strategy == strategy)
    }
}

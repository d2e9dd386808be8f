//! The six missing-value remediation strategies.
//!
//! Every strategy is a plain function over a read-only [`StrategyContext`]
//! and returns a [`StrategyOutcome`] with the predictions for the test rows
//! followed by the missing rows, scored against the true labels. Strategies
//! never mutate the split or the baseline model; any reconstruction works on
//! new frames.
//!
//! | ID | Missing-row predictions |
//! |----|-------------------------|
//! | A  | abstention sentinel for every row |
//! | B  | majority label of the train partition |
//! | C  | fresh classifier trained without the columns that have missing values |
//! | D  | baseline model on rows filled with train means |
//! | E  | baseline model on rows filled with train medians |
//! | F  | baseline model on rows filled from the nearest train rows |

use crate::config::EvaluationConfig;
use crate::error::{EvaluationError, Result};
use crate::imputers::{KNNImputer, StatisticalImputer};
use crate::metrics::accuracy;
use crate::model::{Classifier, validate_training_set};
use crate::split::DataSplit;
use crate::types::{Label, StrategyId, StrategyOutcome};
use crate::utils::{frame_to_matrix, majority_label};
use polars::prelude::*;
use tracing::debug;

/// Read-only inputs shared by all strategies.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub split: &'a DataSplit,
    /// Baseline classifier, already fitted on the train partition.
    pub model: &'a dyn Classifier,
    pub config: &'a EvaluationConfig,
}

pub type StrategyFn = fn(&StrategyContext<'_>) -> Result<StrategyOutcome>;

/// Strategy implementations indexed by `StrategyId as usize`.
pub const STRATEGY_TABLE: [(StrategyId, StrategyFn); 6] = [
    (StrategyId::Abstention, abstention),
    (StrategyId::MajorityFallback, majority_fallback),
    (StrategyId::FeatureOmission, feature_omission),
    (StrategyId::MeanImputation, mean_imputation),
    (StrategyId::MedianImputation, median_imputation),
    (StrategyId::KnnImputation, knn_imputation),
];

/// Run a single strategy.
pub fn run(strategy: StrategyId, ctx: &StrategyContext<'_>) -> Result<StrategyOutcome> {
    let (_, strategy_fn) = STRATEGY_TABLE[strategy as usize];
    strategy_fn(ctx)
}

/// A: every missing row gets the abstention label, which never matches.
pub fn abstention(ctx: &StrategyContext<'_>) -> Result<StrategyOutcome> {
    let test_predictions = predict_test(ctx)?;
    let missing_predictions = vec![ctx.config.abstention_label; ctx.split.missing.len()];
    score(
        StrategyId::Abstention,
        ctx.split,
        test_predictions,
        missing_predictions,
    )
}

/// B: every missing row gets the most frequent train label.
pub fn majority_fallback(ctx: &StrategyContext<'_>) -> Result<StrategyOutcome> {
    let majority = majority_label(&ctx.split.train.labels).ok_or_else(|| {
        EvaluationError::Training("train partition has no labels".to_string())
    })?;
    debug!("Majority train label: {}", majority);

    let test_predictions = predict_test(ctx)?;
    let missing_predictions = vec![majority; ctx.split.missing.len()];
    score(
        StrategyId::MajorityFallback,
        ctx.split,
        test_predictions,
        missing_predictions,
    )
}

/// C: drop the columns with missing values and retrain a fresh classifier.
pub fn feature_omission(ctx: &StrategyContext<'_>) -> Result<StrategyOutcome> {
    let reduced = ReducedPartitions::omit_missing_columns(ctx.split)?;
    debug!(
        "Retraining on {} of {} feature columns",
        reduced.retained_columns.len(),
        ctx.split.feature_names.len()
    );

    validate_training_set(&reduced.train, &ctx.split.train.labels)?;
    let mut model = ctx.model.clone_unfitted();
    model.fit(&reduced.train, &ctx.split.train.labels)?;

    let test_predictions = model.predict(&reduced.test)?;
    let missing_predictions = model.predict(&reduced.missing)?;
    score(
        StrategyId::FeatureOmission,
        ctx.split,
        test_predictions,
        missing_predictions,
    )
}

/// D: fill nulls with the train mean of each column.
pub fn mean_imputation(ctx: &StrategyContext<'_>) -> Result<StrategyOutcome> {
    let fitted = StatisticalImputer::mean()
        .fit(&ctx.split.train.features, &ctx.split.missing_columns)?;
    let imputed = fitted.transform(&ctx.split.missing.features)?;
    score_imputed(StrategyId::MeanImputation, ctx, &imputed)
}

/// E: fill nulls with the train median of each column.
pub fn median_imputation(ctx: &StrategyContext<'_>) -> Result<StrategyOutcome> {
    let fitted = StatisticalImputer::median()
        .fit(&ctx.split.train.features, &ctx.split.missing_columns)?;
    let imputed = fitted.transform(&ctx.split.missing.features)?;
    score_imputed(StrategyId::MedianImputation, ctx, &imputed)
}

/// F: fill nulls with the mean of the nearest train rows.
pub fn knn_imputation(ctx: &StrategyContext<'_>) -> Result<StrategyOutcome> {
    let fitted = KNNImputer::new(ctx.config.knn_neighbors).fit(&ctx.split.train.features)?;
    let imputed = fitted.transform(&ctx.split.missing.features)?;
    score_imputed(StrategyId::KnnImputation, ctx, &imputed)
}

/// Feature matrices of the three partitions with the missing-columns set
/// removed.
#[derive(Debug, Clone)]
pub struct ReducedPartitions {
    pub retained_columns: Vec<String>,
    pub train: Vec<Vec<f64>>,
    pub test: Vec<Vec<f64>>,
    pub missing: Vec<Vec<f64>>,
}

impl ReducedPartitions {
    /// Fails with [`EvaluationError::Training`] when every feature column has
    /// a missing value.
    pub fn omit_missing_columns(split: &DataSplit) -> Result<Self> {
        let retained_columns: Vec<String> = split
            .feature_names
            .iter()
            .filter(|name| !split.missing_columns.contains(name))
            .cloned()
            .collect();

        if retained_columns.is_empty() {
            return Err(EvaluationError::Training(
                "every feature column has missing values, none left to train on".to_string(),
            ));
        }

        let reduce = |df: &DataFrame| -> Result<Vec<Vec<f64>>> {
            frame_to_matrix(&df.select(retained_columns.iter().cloned())?)
        };

        Ok(Self {
            train: reduce(&split.train.features)?,
            test: reduce(&split.test.features)?,
            missing: reduce(&split.missing.features)?,
            retained_columns,
        })
    }
}

fn predict_test(ctx: &StrategyContext<'_>) -> Result<Vec<Label>> {
    ctx.model.predict(&ctx.split.test.matrix()?)
}

fn score_imputed(
    strategy: StrategyId,
    ctx: &StrategyContext<'_>,
    imputed_missing: &DataFrame,
) -> Result<StrategyOutcome> {
    let test_predictions = predict_test(ctx)?;
    let missing_predictions = ctx.model.predict(&frame_to_matrix(imputed_missing)?)?;
    score(strategy, ctx.split, test_predictions, missing_predictions)
}

/// Score test predictions followed by missing predictions against a truth
/// vector built for this strategy alone.
fn score(
    strategy: StrategyId,
    split: &DataSplit,
    test_predictions: Vec<Label>,
    missing_predictions: Vec<Label>,
) -> Result<StrategyOutcome> {
    let truth: Vec<Label> = split
        .test
        .labels
        .iter()
        .chain(&split.missing.labels)
        .copied()
        .collect();

    let mut combined_predictions = test_predictions;
    combined_predictions.extend_from_slice(&missing_predictions);

    let combined_accuracy = accuracy(&truth, &combined_predictions)?;
    let missing_accuracy = accuracy(&split.missing.labels, &missing_predictions)?;

    debug!(
        "Strategy {} ({}): combined={:.4}, missing={:.4}",
        strategy,
        strategy.display_name(),
        combined_accuracy,
        missing_accuracy
    );

    Ok(StrategyOutcome {
        strategy,
        combined_accuracy,
        missing_accuracy,
        combined_predictions,
        missing_predictions,
    })
}

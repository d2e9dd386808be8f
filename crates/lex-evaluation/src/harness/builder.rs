//! The evaluation harness and its builder.
//!
//! The harness runs three phases in order: `load` splits the dataset,
//! `train` fits the baseline classifier on the train partition, and
//! `evaluate` runs the six remediation strategies against that model.

use crate::config::{ConfigValidationError, EvaluationConfig, FailurePolicy};
use crate::error::{EvaluationError, Phase, Result};
use crate::harness::progress::{EvaluationStage, ProgressReporter, ProgressUpdate};
use crate::model::{Classifier, RandomForestClassifier, validate_training_set};
use crate::split::{DataSplit, Splitter};
use crate::strategies::{self, StrategyContext};
use crate::types::{
    AccuracyRecords, EvaluationReport, PartitionSizes, StrategyFailure, StrategyId,
    StrategyOutcome,
};
use chrono::Utc;
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Evaluates missing-value remediation strategies against one baseline
/// classifier.
///
/// Use [`EvaluationHarness::builder()`] to create a harness.
///
/// # Example
///
/// ```rust,ignore
/// use lex_evaluation::{EvaluationConfig, EvaluationHarness};
///
/// // All phases at once
/// let report = EvaluationHarness::builder()
///     .config(EvaluationConfig::builder().random_seed(0).build()?)
///     .build()?
///     .run(&df)?;
///
/// // Phase by phase
/// let mut harness = EvaluationHarness::builder().build()?;
/// harness.load(&df)?;
/// harness.train()?;
/// let report = harness.evaluate()?;
/// println!("{:?}", report.accuracies.missing_values);
/// ```
pub struct EvaluationHarness {
    config: EvaluationConfig,
    /// Unfitted prototype; every fit starts from a fresh clone of it.
    classifier: Box<dyn Classifier>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    split: Option<DataSplit>,
    model: Option<Box<dyn Classifier>>,
}

// A harness can be moved onto a worker thread between phases
static_assertions::assert_impl_all!(EvaluationHarness: Send);

impl EvaluationHarness {
    /// Create a new harness builder.
    pub fn builder() -> EvaluationHarnessBuilder {
        EvaluationHarnessBuilder::default()
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// The partitions produced by the last `load`.
    pub fn split(&self) -> Option<&DataSplit> {
        self.split.as_ref()
    }

    /// The baseline classifier produced by the last `train`.
    pub fn model(&self) -> Option<&dyn Classifier> {
        self.model.as_deref()
    }

    /// Run all three phases and report completion or failure.
    pub fn run(&mut self, df: &DataFrame) -> Result<EvaluationReport> {
        match self.run_internal(df) {
            Ok(report) => {
                self.report_progress(ProgressUpdate::complete("Evaluation completed"));
                Ok(report)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Evaluation error: {}", e);
                Err(e)
            }
        }
    }

    fn run_internal(&mut self, df: &DataFrame) -> Result<EvaluationReport> {
        self.load(df)?;
        self.train()?;
        self.evaluate()
    }

    /// Split the dataset into train, test and missing partitions.
    ///
    /// Loading again replaces the partitions and discards any trained model.
    pub fn load(&mut self, df: &DataFrame) -> Result<PartitionSizes> {
        info!("Loading dataset: {} rows x {} columns", df.height(), df.width());
        self.report_progress(ProgressUpdate::new(
            EvaluationStage::Loading,
            0.0,
            "Splitting dataset...",
        ));

        self.model = None;
        self.split = None;
        let split = Splitter::split(df, &self.config)?;
        let sizes = split.sizes();
        self.split = Some(split);

        self.report_progress(ProgressUpdate::new(
            EvaluationStage::Loading,
            1.0,
            format!(
                "Split into {} train, {} test and {} missing rows",
                sizes.train, sizes.test, sizes.missing
            ),
        ));
        Ok(sizes)
    }

    /// Fit the baseline classifier on the train partition.
    pub fn train(&mut self) -> Result<()> {
        let split = self.split.as_ref().ok_or(EvaluationError::NotInitialized {
            attempted: Phase::Train,
            required: Phase::Load,
        })?;

        info!(
            "Training {} on {} rows",
            self.classifier.name(),
            split.train.len()
        );
        self.report_progress(ProgressUpdate::new(
            EvaluationStage::Training,
            0.0,
            format!("Training {}...", self.classifier.name()),
        ));

        let x_train = split.train.matrix()?;
        validate_training_set(&x_train, &split.train.labels)?;
        let mut model = self.classifier.clone_unfitted();
        model.fit(&x_train, &split.train.labels)?;
        self.model = Some(model);

        self.report_progress(ProgressUpdate::new(
            EvaluationStage::Training,
            1.0,
            "Baseline classifier trained",
        ));
        Ok(())
    }

    /// Run strategies A to F and collect both accuracy mappings.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Abort`] the first failing strategy stops the
    /// run with [`EvaluationError::StrategyFailed`], which carries the
    /// records of the strategies that completed before it.
    pub fn evaluate(&self) -> Result<EvaluationReport> {
        let split = self.split.as_ref().ok_or(EvaluationError::NotInitialized {
            attempted: Phase::Evaluate,
            required: Phase::Load,
        })?;
        let model = self.model.as_deref().ok_or(EvaluationError::NotInitialized {
            attempted: Phase::Evaluate,
            required: Phase::Train,
        })?;

        let start_time = Instant::now();
        info!("Evaluating {} strategies", StrategyId::ALL.len());

        let ctx = StrategyContext {
            split,
            model,
            config: &self.config,
        };

        let mut outcomes: Vec<StrategyOutcome> = Vec::with_capacity(StrategyId::ALL.len());
        let mut failures: Vec<StrategyFailure> = Vec::new();

        for (position, strategy) in StrategyId::ALL.into_iter().enumerate() {
            self.report_progress(ProgressUpdate::with_items(
                EvaluationStage::Evaluating,
                format!("Strategy {}", strategy),
                position,
                StrategyId::ALL.len(),
                format!("Evaluating {}...", strategy.display_name()),
            ));

            match strategies::run(strategy, &ctx) {
                Ok(outcome) => {
                    info!(
                        "Strategy {} ({}) succeeded: entire test set {:.4}, missing values {:.4}",
                        strategy,
                        strategy.display_name(),
                        outcome.combined_accuracy,
                        outcome.missing_accuracy
                    );
                    outcomes.push(outcome);
                }
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(EvaluationError::StrategyFailed {
                            strategy,
                            completed: Box::new(outcomes.iter().collect()),
                            source: Box::new(e),
                        });
                    }
                    FailurePolicy::Isolate => {
                        warn!("Strategy {} failed and was skipped: {}", strategy, e);
                        failures.push(StrategyFailure {
                            strategy,
                            code: e.error_code().to_string(),
                            message: e.to_string(),
                        });
                    }
                },
            }
        }

        let accuracies: AccuracyRecords = outcomes.iter().collect();
        let duration_ms = start_time.elapsed().as_millis() as u64;
        debug!(
            "Evaluation finished in {}ms ({} succeeded, {} failed)",
            duration_ms,
            outcomes.len(),
            failures.len()
        );

        self.report_progress(ProgressUpdate::new(
            EvaluationStage::Evaluating,
            1.0,
            format!("{} of {} strategies evaluated", outcomes.len(), StrategyId::ALL.len()),
        ));

        Ok(EvaluationReport {
            accuracies,
            outcomes,
            failures,
            partition_sizes: split.sizes(),
            missing_columns: split.missing_columns.clone(),
            duration_ms,
            completed_at: Utc::now(),
        })
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for [`EvaluationHarness`].
#[derive(Default)]
pub struct EvaluationHarnessBuilder {
    config: Option<EvaluationConfig>,
    classifier: Option<Box<dyn Classifier>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(EvaluationHarnessBuilder: Send);

impl EvaluationHarnessBuilder {
    /// Set the harness configuration.
    pub fn config(mut self, config: EvaluationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom classifier instead of the seeded random forest.
    ///
    /// The classifier is treated as a prototype: `train` and the
    /// feature-omission strategy fit fresh copies from
    /// [`Classifier::clone_unfitted`].
    pub fn classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let harness = EvaluationHarness::builder()
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(callback));
        self
    }

    /// Build the harness.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<EvaluationHarness, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let classifier = self
            .classifier
            .unwrap_or_else(|| Box::new(RandomForestClassifier::from_config(&config)));

        Ok(EvaluationHarness {
            config,
            classifier,
            progress_reporter: self.progress_reporter,
            split: None,
            model: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Label;
    use std::sync::Mutex;

    /// Predicts 1 when the first feature is at least 0.5.
    #[derive(Debug, Default)]
    struct FirstFeatureStub {
        fitted: bool,
    }

    impl Classifier for FirstFeatureStub {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[Label]) -> Result<()> {
            self.fitted = true;
            Ok(())
        }

        fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<Label>> {
            Ok(x.iter().map(|row| Label::from(row[0] >= 0.5)).collect())
        }

        fn clone_unfitted(&self) -> Box<dyn Classifier> {
            Box::new(Self::default())
        }

        fn name(&self) -> &str {
            "first_feature_stub"
        }

        fn is_fitted(&self) -> bool {
            self.fitted
        }
    }

    fn sample_frame() -> DataFrame {
        df![
            "score" => [0.9, 0.1, 0.8, 0.2, 0.7, 0.3, 0.6, 0.4],
            "f1" => [0.9, 0.1, 0.8, 0.2, 0.7, 0.3, 0.6, 0.4],
            "f2" => [Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(6.0), None, None],
        ]
        .unwrap()
    }

    fn stub_harness(policy: FailurePolicy) -> EvaluationHarness {
        let config = EvaluationConfig::builder()
            .train_size(4)
            .knn_neighbors(2)
            .failure_policy(policy)
            .build()
            .unwrap();
        EvaluationHarness::builder()
            .config(config)
            .classifier(Box::new(FirstFeatureStub::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_default_uses_random_forest() {
        let harness = EvaluationHarness::builder().build().unwrap();
        assert_eq!(harness.classifier.name(), "random_forest");
        assert!(harness.split().is_none());
        assert!(harness.model().is_none());
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let config = EvaluationConfig {
            knn_neighbors: 0,
            ..EvaluationConfig::default()
        };
        assert!(EvaluationHarness::builder().config(config).build().is_err());
    }

    #[test]
    fn test_train_before_load_fails() {
        let mut harness = stub_harness(FailurePolicy::Abort);
        let err = harness.train().unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::NotInitialized {
                attempted: Phase::Train,
                required: Phase::Load
            }
        ));
    }

    #[test]
    fn test_evaluate_before_train_fails() {
        let mut harness = stub_harness(FailurePolicy::Abort);
        harness.load(&sample_frame()).unwrap();

        let err = harness.evaluate().unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::NotInitialized {
                attempted: Phase::Evaluate,
                required: Phase::Train
            }
        ));
    }

    #[test]
    fn test_train_rejects_single_class_partition() {
        let df = df![
            "score" => [0.9, 0.8, 0.7, 0.95],
            "f1" => [1.0, 2.0, 3.0, 4.0],
        ]
        .unwrap();
        let config = EvaluationConfig::builder().train_size(3).build().unwrap();
        let mut harness = EvaluationHarness::builder()
            .config(config)
            .classifier(Box::new(FirstFeatureStub::default()))
            .build()
            .unwrap();

        harness.load(&df).unwrap();
        let err = harness.train().unwrap_err();
        assert_eq!(err.error_code(), "TRAINING_ERROR");
        assert!(harness.model().is_none());
    }

    #[test]
    fn test_reload_discards_model() {
        let mut harness = stub_harness(FailurePolicy::Abort);
        harness.load(&sample_frame()).unwrap();
        harness.train().unwrap();
        assert!(harness.model().is_some_and(|m| m.is_fitted()));

        harness.load(&sample_frame()).unwrap();
        assert!(harness.model().is_none());
    }

    #[test]
    fn test_run_produces_all_strategies() {
        let mut harness = stub_harness(FailurePolicy::Abort);
        let report = harness.run(&sample_frame()).unwrap();

        assert!(report.is_complete());
        assert_eq!(report.outcomes.len(), 6);
        assert_eq!(
            report.partition_sizes,
            PartitionSizes {
                train: 4,
                test: 2,
                missing: 2
            }
        );
        assert_eq!(report.missing_columns, vec!["f2".to_string()]);
        assert_eq!(report.accuracies.missing_values[&StrategyId::Abstention], 0.0);
    }

    #[test]
    fn test_progress_reports_every_stage() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let config = EvaluationConfig::builder()
            .train_size(4)
            .knn_neighbors(2)
            .build()
            .unwrap();
        let mut harness = EvaluationHarness::builder()
            .config(config)
            .classifier(Box::new(FirstFeatureStub::default()))
            .on_progress(move |update| {
                stages_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap();

        harness.run(&sample_frame()).unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&EvaluationStage::Loading));
        assert!(stages.contains(&EvaluationStage::Training));
        assert_eq!(
            stages
                .iter()
                .filter(|s| **s == EvaluationStage::Evaluating)
                .count(),
            7
        );
        assert_eq!(stages.last(), Some(&EvaluationStage::Complete));
    }

    #[test]
    fn test_run_failure_reports_failed_stage() {
        let failed = Arc::new(Mutex::new(false));
        let failed_clone = failed.clone();

        let mut harness = EvaluationHarness::builder()
            .on_progress(move |update| {
                if update.stage == EvaluationStage::Failed {
                    *failed_clone.lock().unwrap() = true;
                }
            })
            .build()
            .unwrap();

        // Default train size is far larger than the frame
        let err = harness.run(&sample_frame()).unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
        assert!(*failed.lock().unwrap());
    }
}

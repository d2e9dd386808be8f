//! Missing-Value Remediation Evaluation Library
//!
//! Measures how a classifier's accuracy degrades when test-time rows have
//! missing feature values, and compares six ways of handling those rows.
//!
//! # Overview
//!
//! An [`EvaluationHarness`] runs three phases:
//!
//! - **Split**: column 0 is a continuous score turned into a binary label;
//!   rows with any missing feature go to the `missing` partition, and a
//!   fixed-size random sample of complete rows becomes `train`. The other
//!   complete rows are `test`.
//! - **Fit**: one baseline classifier (a seeded random forest by default) is
//!   trained on `train`.
//! - **Evaluate**: strategies A to F each rebuild the missing rows their own
//!   way and are scored twice, over test plus missing rows and over missing
//!   rows alone.
//!
//! | ID | Strategy |
//! |----|----------|
//! | A  | Abstention (sentinel label, always wrong) |
//! | B  | Majority class of the train labels |
//! | C  | Drop columns with missing values, retrain |
//! | D  | Mean imputation |
//! | E  | Median imputation |
//! | F  | KNN imputation |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_evaluation::{EvaluationConfig, EvaluationHarness, FailurePolicy};
//! use polars::prelude::*;
//!
//! let df = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .try_into_reader_with_file_path(Some("data.csv".into()))?
//!     .finish()?;
//!
//! let config = EvaluationConfig::builder()
//!     .threshold(0.5)
//!     .random_seed(0)
//!     .failure_policy(FailurePolicy::Isolate)
//!     .build()?;
//!
//! let report = EvaluationHarness::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&df)?;
//!
//! for (strategy, accuracy) in &report.accuracies.missing_values {
//!     println!("{}: {:.4}", strategy, accuracy);
//! }
//! ```
//!
//! # Custom classifiers
//!
//! Any type implementing [`Classifier`] can replace the random forest via
//! [`EvaluationHarnessBuilder::classifier`].

pub mod config;
pub mod error;
pub mod harness;
pub mod imputers;
pub mod metrics;
pub mod model;
pub mod split;
pub mod strategies;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ConfigValidationError, EvaluationConfig, EvaluationConfigBuilder, FailurePolicy,
    ForestConfig, MaxFeatures,
};
pub use error::{EvaluationError, Phase, Result as EvaluationResult, ResultExt};
pub use harness::{
    EvaluationHarness, EvaluationHarnessBuilder, EvaluationStage, ProgressReporter, ProgressUpdate,
};
pub use imputers::{KNNImputer, StatisticalImputer};
pub use metrics::accuracy;
pub use model::{Classifier, RandomForestClassifier};
pub use split::{DataSplit, Partition, Splitter};
pub use strategies::{ReducedPartitions, StrategyContext};
pub use types::{
    AccuracyRecords, EvaluationReport, Label, PartitionSizes, StrategyFailure, StrategyId,
    StrategyOutcome,
};

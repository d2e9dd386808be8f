//! Evaluation harness orchestration.
//!
//! This module provides the [`EvaluationHarness`] that runs the split, fit
//! and evaluate phases, plus progress reporting for long runs.

mod builder;
pub mod progress;

pub use builder::{EvaluationHarness, EvaluationHarnessBuilder};
pub use progress::{EvaluationStage, ProgressReporter, ProgressUpdate};

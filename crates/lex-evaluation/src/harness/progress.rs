//! Progress reporting for the evaluation harness.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_evaluation::EvaluationHarness;
//!
//! let report = EvaluationHarness::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run(&df)?;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStage {
    /// Splitting the dataset into train, test and missing partitions
    Loading,
    /// Fitting the baseline classifier
    Training,
    /// Running the remediation strategies
    Evaluating,
    /// Run completed
    Complete,
    /// Run failed with an error
    Failed,
}

impl EvaluationStage {
    /// Stages that carry weight, in the order a run visits them.
    pub const RUN_ORDER: [EvaluationStage; 3] = [Self::Loading, Self::Training, Self::Evaluating];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Splitting Dataset",
            Self::Training => "Training Baseline",
            Self::Evaluating => "Evaluating Strategies",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run taken by this stage.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.2,
            Self::Training => 0.1,
            Self::Evaluating => 0.7,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            stage => Self::RUN_ORDER
                .iter()
                .take_while(|s| *s != stage)
                .map(EvaluationStage::weight)
                .sum(),
        }
    }
}

impl fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Progress update sent to a [`ProgressReporter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: EvaluationStage,

    /// Strategy being evaluated (e.g. "Strategy D")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: EvaluationStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    /// Creates a progress update for item `current` of `total` within a stage.
    pub fn with_items(
        stage: EvaluationStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            sub_stage: Some(sub_stage.into()),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Terminal update for a finished run.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(EvaluationStage::Complete, 1.0, message)
    }

    /// Terminal update for a run that stopped with an error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(EvaluationStage::Failed, 0.0, message)
    }
}

/// Receives progress updates during an evaluation run.
///
/// Any `Fn(ProgressUpdate)` closure that is `Send + Sync` is a reporter.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressReporter for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

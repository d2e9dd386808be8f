//! Configuration types for the evaluation harness.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic harness setup.

use crate::types::Label;
use serde::{Deserialize, Serialize};

/// Number of complete rows sampled into the train partition by default.
pub const DEFAULT_TRAIN_SIZE: usize = 3000;

/// Number of neighbors used by the KNN imputation strategy by default.
pub const DEFAULT_KNN_NEIGHBORS: usize = 30;

/// Label assigned to every missing row by the abstention strategy by default.
pub const DEFAULT_ABSTENTION_LABEL: Label = -1;

/// What to do when a strategy fails during the evaluate phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FailurePolicy {
    /// Stop at the first failing strategy and return its error, carrying the
    /// records of the strategies that already finished.
    #[default]
    Abort,
    /// Run every strategy; failed strategies are listed in the report and
    /// left out of both accuracy mappings.
    Isolate,
}

/// How many candidate features the random forest draws at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MaxFeatures {
    /// Square root of the feature count
    #[default]
    Sqrt,
    /// Base-2 logarithm of the feature count
    Log2,
    /// Every feature
    All,
    /// A fixed number of features (capped at the feature count)
    Fixed(usize),
}

impl MaxFeatures {
    /// Resolve against a feature count. Always at least 1 when `n_features > 0`.
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = match self {
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::Log2 => (n_features as f64).log2() as usize,
            Self::All => n_features,
            Self::Fixed(k) => *k,
        };
        n.clamp(1, n_features.max(1))
    }
}

/// Parameters of the random forest used as baseline classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees. Default: 100
    pub n_estimators: usize,

    /// Maximum tree depth (None = grow until pure). Default: None
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node. Default: 2
    pub min_samples_split: usize,

    /// Minimum samples required at a leaf. Default: 1
    pub min_samples_leaf: usize,

    /// Candidate features per split. Default: Sqrt
    pub max_features: MaxFeatures,

    /// Whether each tree is grown on a bootstrap sample. Default: true
    pub bootstrap: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::default(),
            bootstrap: true,
        }
    }
}

/// Configuration for the evaluation harness.
///
/// Use [`EvaluationConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_evaluation::config::{EvaluationConfig, FailurePolicy};
///
/// let config = EvaluationConfig::builder()
///     .threshold(0.5)
///     .random_seed(0)
///     .failure_policy(FailurePolicy::Isolate)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Target scores at or above this value are labelled 1, others 0.
    /// Default: 0.5
    pub threshold: f64,

    /// Seed for the train sample and the classifier.
    /// Default: 0
    pub random_seed: u64,

    /// Number of complete rows sampled into the train partition.
    /// Default: 3000
    pub train_size: usize,

    /// Number of neighbors for KNN imputation.
    /// Default: 30
    pub knn_neighbors: usize,

    /// Label the abstention strategy assigns to missing rows. Must not be 0 or 1.
    /// Default: -1
    pub abstention_label: Label,

    /// What to do when a strategy fails.
    /// Default: Abort
    pub failure_policy: FailurePolicy,

    /// Random forest parameters for the baseline and feature-omission classifiers.
    pub forest: ForestConfig,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            random_seed: 0,
            train_size: DEFAULT_TRAIN_SIZE,
            knn_neighbors: DEFAULT_KNN_NEIGHBORS,
            abstention_label: DEFAULT_ABSTENTION_LABEL,
            failure_policy: FailurePolicy::default(),
            forest: ForestConfig::default(),
        }
    }
}

impl EvaluationConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EvaluationConfigBuilder {
        EvaluationConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.threshold.is_finite() {
            return Err(ConfigValidationError::InvalidThreshold(self.threshold));
        }

        if self.train_size == 0 {
            return Err(ConfigValidationError::ZeroValue("train_size"));
        }

        if self.knn_neighbors == 0 {
            return Err(ConfigValidationError::ZeroValue("knn_neighbors"));
        }

        if matches!(self.abstention_label, 0 | 1) {
            return Err(ConfigValidationError::SentinelCollidesWithLabel(
                self.abstention_label,
            ));
        }

        let forest = &self.forest;
        if forest.n_estimators == 0 {
            return Err(ConfigValidationError::ZeroValue("n_estimators"));
        }
        if forest.max_depth == Some(0) {
            return Err(ConfigValidationError::ZeroValue("max_depth"));
        }
        if forest.min_samples_split < 2 {
            return Err(ConfigValidationError::InvalidMinSamplesSplit(
                forest.min_samples_split,
            ));
        }
        if forest.min_samples_leaf == 0 {
            return Err(ConfigValidationError::ZeroValue("min_samples_leaf"));
        }
        if forest.max_features == MaxFeatures::Fixed(0) {
            return Err(ConfigValidationError::ZeroValue("max_features"));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold: {0} (must be a finite number)")]
    InvalidThreshold(f64),

    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroValue(&'static str),

    #[error("Invalid abstention label: {0} (must differ from the class labels 0 and 1)")]
    SentinelCollidesWithLabel(Label),

    #[error("Invalid min_samples_split: {0} (must be at least 2)")]
    InvalidMinSamplesSplit(usize),
}

/// Builder for [`EvaluationConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EvaluationConfigBuilder {
    threshold: Option<f64>,
    random_seed: Option<u64>,
    train_size: Option<usize>,
    knn_neighbors: Option<usize>,
    abstention_label: Option<Label>,
    failure_policy: Option<FailurePolicy>,
    forest: Option<ForestConfig>,
    n_estimators: Option<usize>,
    max_depth: Option<usize>,
}

impl EvaluationConfigBuilder {
    /// Set the label threshold applied to the target score.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Set the random seed.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the number of complete rows sampled for training.
    pub fn train_size(mut self, size: usize) -> Self {
        self.train_size = Some(size);
        self
    }

    /// Set the number of neighbors for KNN imputation.
    pub fn knn_neighbors(mut self, k: usize) -> Self {
        self.knn_neighbors = Some(k);
        self
    }

    /// Set the sentinel label used by abstention.
    pub fn abstention_label(mut self, label: Label) -> Self {
        self.abstention_label = Some(label);
        self
    }

    /// Set the failure policy for the evaluate phase.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    /// Replace the whole forest configuration.
    pub fn forest(mut self, forest: ForestConfig) -> Self {
        self.forest = Some(forest);
        self
    }

    /// Set the number of trees in the forest.
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = Some(n);
        self
    }

    /// Limit the depth of each tree.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EvaluationConfig` or an error if validation fails.
    pub fn build(self) -> Result<EvaluationConfig, ConfigValidationError> {
        let mut forest = self.forest.unwrap_or_default();
        if let Some(n) = self.n_estimators {
            forest.n_estimators = n;
        }
        if let Some(depth) = self.max_depth {
            forest.max_depth = Some(depth);
        }

        let config = EvaluationConfig {
            threshold: self.threshold.unwrap_or(0.5),
            random_seed: self.random_seed.unwrap_or(0),
            train_size: self.train_size.unwrap_or(DEFAULT_TRAIN_SIZE),
            knn_neighbors: self.knn_neighbors.unwrap_or(DEFAULT_KNN_NEIGHBORS),
            abstention_label: self.abstention_label.unwrap_or(DEFAULT_ABSTENTION_LABEL),
            failure_policy: self.failure_policy.unwrap_or_default(),
            forest,
        };

        config.validate()?;
        Ok(config)
    }
}

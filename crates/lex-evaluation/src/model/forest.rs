//! Seeded random forest classifier.

use super::tree::{DecisionTree, TreeParams, majority_class};
use super::{Classifier, validate_training_set};
use crate::config::{EvaluationConfig, ForestConfig};
use crate::error::{EvaluationError, Result};
use crate::types::Label;
use rand::prelude::*;
use tracing::debug;

/// Bootstrap-aggregated CART trees with per-split feature sampling.
///
/// Tree `i` draws its bootstrap sample and candidate features from a
/// `StdRng` seeded with `seed + i`, so a forest is fully determined by its
/// configuration, its seed and the training data.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    config: ForestConfig,
    seed: u64,
    classes: Vec<Label>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    pub fn new(config: ForestConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            classes: Vec::new(),
            n_features: 0,
            trees: Vec::new(),
        }
    }

    /// Build an unfitted forest from the harness configuration.
    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self::new(config.forest.clone(), config.random_seed)
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Sorted distinct labels seen during fit.
    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        TreeParams {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: self.config.max_features.resolve(n_features),
        }
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[Label]) -> Result<()> {
        let n_features = validate_training_set(x, y)?;

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        // Position of each label in the sorted class list
        let y_idx: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();

        let params = self.tree_params(n_features);
        let n_samples = x.len();

        let trees: Vec<DecisionTree> = (0..self.config.n_estimators)
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(tree_idx as u64));
                let sample: Vec<usize> = if self.config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                DecisionTree::grow(x, &y_idx, classes.len(), sample, &params, &mut rng)
            })
            .collect();

        debug!(
            "Random forest fitted: {} trees, {} rows, {} features, {} classes (max depth {})",
            trees.len(),
            n_samples,
            n_features,
            classes.len(),
            trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
        );

        self.classes = classes;
        self.n_features = n_features;
        self.trees = trees;
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<Label>> {
        if !self.is_fitted() {
            return Err(EvaluationError::Prediction(
                "random forest has not been fitted".to_string(),
            ));
        }

        x.iter()
            .enumerate()
            .map(|(row_idx, row)| {
                if row.len() != self.n_features {
                    return Err(EvaluationError::Prediction(format!(
                        "row {} has {} features, model was fitted on {}",
                        row_idx,
                        row.len(),
                        self.n_features
                    )));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(EvaluationError::Prediction(format!(
                        "row {} contains a missing or non-finite value",
                        row_idx
                    )));
                }

                let mut votes = vec![0usize; self.classes.len()];
                for tree in &self.trees {
                    votes[tree.predict_row(row)] += 1;
                }
                Ok(self.classes[majority_class(&votes)])
            })
            .collect()
    }

    fn clone_unfitted(&self) -> Box<dyn Classifier> {
        Box::new(Self::new(self.config.clone(), self.seed))
    }

    fn name(&self) -> &str {
        "random_forest"
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}

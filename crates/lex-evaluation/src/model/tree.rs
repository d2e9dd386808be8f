//! CART decision tree grown with Gini impurity.
//!
//! Trees work on class indices (positions in the sorted class list held by
//! the forest) and are only built through [`DecisionTree::grow`].

use rand::rngs::StdRng;
use rand::seq::index;

/// Growth limits shared by every tree of a forest.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Candidate features drawn at each node (already resolved, >= 1)
    pub max_features: usize,
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted decision tree stored as a node arena, root at index 0.
#[derive(Debug, Clone)]
pub(crate) struct DecisionTree {
    nodes: Vec<TreeNode>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `sample` (repeats allowed).
    pub fn grow(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        sample: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            params,
            rng,
            nodes: Vec::new(),
        };
        builder.build(sample, 0);
        Self {
            nodes: builder.nodes,
        }
    }

    /// Class index predicted for one row.
    pub fn predict_row(&self, row: &[f64]) -> usize {
        let mut node_idx = 0;
        loop {
            match &self.nodes[node_idx] {
                TreeNode::Leaf { class } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node_idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth_from(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + depth_from(nodes, *left).max(depth_from(nodes, *right))
                }
            }
        }
        depth_from(&self.nodes, 0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    params: &'a TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&indices);
        let total = indices.len();

        let should_stop = self.params.max_depth.is_some_and(|d| depth >= d)
            || total < self.params.min_samples_split
            || total < 2 * self.params.min_samples_leaf
            || counts.iter().filter(|&&c| c > 0).count() <= 1;

        let split = if should_stop {
            None
        } else {
            self.find_best_split(&indices)
        };

        let Some(split) = split else {
            return self.push(TreeNode::Leaf {
                class: majority_class(&counts),
            });
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&idx| self.x[idx][split.feature] <= split.threshold);

        // Reserve the slot so the parent precedes its children
        let node_idx = self.push(TreeNode::Leaf { class: 0 });
        let left = self.build(left_indices, depth + 1);
        let right = self.build(right_indices, depth + 1);
        self.nodes[node_idx] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn push(&mut self, node: TreeNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &idx in indices {
            counts[self.y[idx]] += 1;
        }
        counts
    }

    /// Sweep features in sorted order, keeping running class counts on the
    /// left side.
    ///
    /// Features are visited in random order until `max_features` of them
    /// have been evaluated. Features that are constant on this node do not
    /// count, so a node with mixed labels only becomes a leaf when every
    /// feature is constant on it.
    fn find_best_split(&mut self, indices: &[usize]) -> Option<BestSplit> {
        let n_features = self.x[indices[0]].len();
        let order = index::sample(&mut *self.rng, n_features, n_features);
        let max_features = self.params.max_features.min(n_features);

        let total = indices.len();
        let parent_counts = self.class_counts(indices);
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();
        let mut evaluated = 0;

        for feature in order.iter() {
            if evaluated == max_features {
                break;
            }
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));
            if self.x[sorted[0]][feature] >= self.x[sorted[total - 1]][feature] {
                continue;
            }
            evaluated += 1;

            let mut left_counts = vec![0usize; self.n_classes];
            for pos in 0..total - 1 {
                left_counts[self.y[sorted[pos]]] += 1;

                let current = self.x[sorted[pos]][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if current >= next {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = total - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_counts: Vec<usize> = parent_counts
                    .iter()
                    .zip(&left_counts)
                    .map(|(p, l)| p - l)
                    .collect();
                let impurity = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / total as f64;

                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    let mut threshold = (current + next) / 2.0;
                    if threshold >= next {
                        threshold = current;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn gini(class_counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total_f = total as f64;
    1.0 - class_counts
        .iter()
        .map(|&c| (c as f64 / total_f).powi(2))
        .sum::<f64>()
}

/// Index of the largest count; ties go to the lowest index.
pub(crate) fn majority_class(counts: &[usize]) -> usize {
    counts
        .iter()
        .enumerate()
        .fold((0, 0), |(best_idx, best_count), (idx, &count)| {
            if count > best_count {
                (idx, count)
            } else {
                (best_idx, best_count)
            }
        })
        .0
}

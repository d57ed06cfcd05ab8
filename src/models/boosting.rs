//! Least-squares gradient boosting over depth-limited regression trees.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::mean;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Reduction in squared error achieved by the split
    gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on `rows[i] -> targets[i]`, adding per-feature gains into `gains`.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], params: &TreeParams, gains: &mut [f64]) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let indices: Vec<usize> = (0..rows.len()).collect();
        if !indices.is_empty() {
            tree.grow(rows, targets, &indices, 0, params, gains);
        }
        tree
    }

    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        depth: usize,
        params: &TreeParams,
        gains: &mut [f64],
    ) -> usize {
        let value = indices.iter().map(|&i| targets[i]).sum::<f64>() / indices.len() as f64;
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { value });

        if depth >= params.max_depth || indices.len() < params.min_samples_split {
            return node_id;
        }

        let Some(split) = best_split(rows, targets, indices, params.min_samples_leaf) else {
            return node_id;
        };

        gains[split.feature] += split.gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| rows[i][split.feature] <= split.threshold);

        let left = self.grow(rows, targets, &left_idx, depth + 1, params, gains);
        let right = self.grow(rows, targets, &right_idx, depth + 1, params, gains);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = row.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if x <= *threshold { *left } else { *right };
                }
                None => return f64::NAN,
            }
        }
    }

    /// Every split reads a feature below `n_features` and points strictly
    /// forward to nodes that exist, so prediction always reaches a leaf.
    pub fn is_well_formed(&self, n_features: usize) -> bool {
        let len = self.nodes.len();
        len > 0
            && self.nodes.iter().enumerate().all(|(id, node)| match node {
                Node::Leaf { .. } => true,
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => *feature < n_features && (id < *left && *left < len) && (id < *right && *right < len),
            })
    }
}

/// Best split over all features. Features are scanned in parallel; equal gains
/// resolve to the lowest feature index.
fn best_split(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n_features = rows.first().map(Vec::len).unwrap_or(0);

    let per_feature: Vec<Option<SplitCandidate>> = (0..n_features)
        .into_par_iter()
        .map(|feature| best_split_for_feature(rows, targets, indices, feature, min_leaf))
        .collect();

    per_feature
        .into_iter()
        .flatten()
        .fold(None, |best: Option<SplitCandidate>, cand| match best {
            Some(b) if b.gain >= cand.gain => Some(b),
            _ => Some(cand),
        })
}

fn best_split_for_feature(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    feature: usize,
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = indices.len();
    let min_leaf = min_leaf.max(1);
    if n < 2 * min_leaf {
        return None;
    }

    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));

    let total: f64 = sorted.iter().map(|&i| targets[i]).sum();
    let parent_score = total * total / n as f64;

    let mut left_sum = 0.0;
    let mut best: Option<SplitCandidate> = None;

    for k in 1..n {
        left_sum += targets[sorted[k - 1]];

        if k < min_leaf || n - k < min_leaf {
            continue;
        }

        let lo = rows[sorted[k - 1]][feature];
        let hi = rows[sorted[k]][feature];
        if lo >= hi || !lo.is_finite() || !hi.is_finite() {
            continue;
        }

        let right_sum = total - left_sum;
        let gain = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64
            - parent_score;

        if gain <= 1e-12 {
            continue;
        }
        if best.is_none_or(|b| gain > b.gain) {
            let mid = lo + (hi - lo) / 2.0;
            let threshold = if mid < hi { mid } else { lo };
            best = Some(SplitCandidate {
                feature,
                threshold,
                gain,
            });
        }
    }

    best
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    init: f64,
    learning_rate: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    /// Fit the ensemble and return it with normalised feature importances.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], params: &BoostingParams) -> (Self, Vec<f64>) {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        let init = mean(targets);
        let mut predictions = vec![init; targets.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut importances = vec![0.0; n_features];
        let mut contributing_trees = 0usize;

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();

            let mut gains = vec![0.0; n_features];
            let tree = RegressionTree::fit(rows, &residuals, &params.tree, &mut gains);

            for (pred, row) in predictions.iter_mut().zip(rows) {
                *pred += params.learning_rate * tree.predict(row);
            }

            let total_gain: f64 = gains.iter().sum();
            if total_gain > 0.0 {
                for (acc, g) in importances.iter_mut().zip(&gains) {
                    *acc += g / total_gain;
                }
                contributing_trees += 1;
            }
            trees.push(tree);
        }

        if contributing_trees > 0 {
            for imp in importances.iter_mut() {
                *imp /= contributing_trees as f64;
            }
        }

        (
            Self {
                init,
                learning_rate: params.learning_rate,
                n_features,
                trees,
            },
            importances,
        )
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// True when every tree is well formed for the declared width.
    pub fn is_consistent(&self) -> bool {
        self.trees
            .iter()
            .all(|t| t.is_well_formed(self.n_features))
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.init
            + self.learning_rate * self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: BoostingParams = BoostingParams {
        n_estimators: 100,
        learning_rate: 0.1,
        tree: TreeParams {
            max_depth: 5,
            min_samples_split: 5,
            min_samples_leaf: 3,
        },
    };

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // Target depends on feature 1 only: a step at 0.5.
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 7) as f64, i as f64 / 40.0])
            .collect();
        let targets = rows
            .iter()
            .map(|r| if r[1] < 0.5 { 1.0 } else { 2.0 })
            .collect();
        (rows, targets)
    }

    #[test]
    fn single_tree_finds_the_step() {
        let (rows, targets) = step_data();
        let mut gains = vec![0.0; 2];
        let tree = RegressionTree::fit(&rows, &targets, &PARAMS.tree, &mut gains);
        assert!((tree.predict(&[3.0, 0.1]) - 1.0).abs() < 1e-9);
        assert!((tree.predict(&[3.0, 0.9]) - 2.0).abs() < 1e-9);
        assert!(gains[1] > 0.0);
        assert_eq!(gains[0], 0.0);
    }

    #[test]
    fn boosting_converges_and_ranks_features() {
        let (rows, targets) = step_data();
        let (model, importances) = GradientBoostedTrees::fit(&rows, &targets, &PARAMS);
        assert_eq!(model.n_trees(), 100);
        assert!(model.is_consistent());
        assert!((model.predict(&[0.0, 0.2]) - 1.0).abs() < 0.01);
        assert!((model.predict(&[0.0, 0.8]) - 2.0).abs() < 0.01);
        assert!(importances[1] > 0.99);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn min_leaf_blocks_tiny_splits() {
        let rows: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let targets = vec![0.0, 0.0, 0.0, 0.0, 10.0];
        let mut gains = vec![0.0];
        let tree = RegressionTree::fit(&rows, &targets, &PARAMS.tree, &mut gains);
        // Any split of 5 samples leaves a side with fewer than 3.
        assert_eq!(tree.nodes.len(), 1);
        assert!((tree.predict(&[4.0]) - 2.0).abs() < 1e-12);
    }

    fn rewire_children(model: &mut GradientBoostedTrees, to: impl Fn(usize) -> usize) {
        for tree in &mut model.trees {
            for (id, node) in tree.nodes.iter_mut().enumerate() {
                if let Node::Split { left, right, .. } = node {
                    *left = to(id);
                    *right = to(id);
                }
            }
        }
    }

    #[test]
    fn dangling_or_cyclic_children_are_inconsistent() {
        let (rows, targets) = step_data();
        let (model, _) = GradientBoostedTrees::fit(&rows, &targets, &PARAMS);

        let mut dangling = model.clone();
        rewire_children(&mut dangling, |_| 9999);
        assert!(!dangling.is_consistent());
        assert!(dangling.predict(&[0.0, 0.2]).is_nan());

        let mut self_loop = model.clone();
        rewire_children(&mut self_loop, |id| id);
        assert!(!self_loop.is_consistent());

        let mut backwards = model;
        rewire_children(&mut backwards, |_| 0);
        assert!(!backwards.is_consistent());
    }

    #[test]
    fn empty_tree_is_not_well_formed() {
        let tree = RegressionTree { nodes: Vec::new() };
        assert!(!tree.is_well_formed(1));
        assert!(tree.predict(&[1.0]).is_nan());
    }

    #[test]
    fn constant_target_stays_flat() {
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64]).collect();
        let targets = vec![1.3; 12];
        let (model, importances) = GradientBoostedTrees::fit(&rows, &targets, &PARAMS);
        assert!((model.predict(&[100.0]) - 1.3).abs() < 1e-12);
        assert_eq!(importances, vec![0.0]);
    }
}

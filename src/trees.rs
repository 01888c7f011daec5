//! CART regression trees and the two ensembles built from them.
//!
//! Splits minimise the summed squared error of the children. Candidate thresholds are the
//! midpoints between consecutive distinct values of a feature, found with one sorted sweep
//! per feature so a node costs `O(n log n)` per feature.

use log::debug;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{EmissionsError, Result};
use crate::model::Regressor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
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

/// Tree growth limits.
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl TreeParams {
    pub fn with_depth(max_depth: usize) -> Self {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Unnormalised impurity decrease per feature.
    impurity_decrease: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    decrease: f64,
}

impl RegressionTree {
    /// Grows a tree on the rows of `x` named by `indices` (repeats allowed, as in a bootstrap sample).
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>, params: TreeParams) -> Self {
        let mut tree = RegressionTree {
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; x.ncols()],
        };
        if indices.is_empty() {
            tree.nodes.push(Node::Leaf { value: 0.0 });
        } else {
            tree.grow(x, y, indices, 0, &params);
        }
        tree
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Importances of this tree normalised to sum to one (all zeros for a single leaf).
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total > 0.0 {
            self.impurity_decrease.iter().map(|d| d / total).collect()
        } else {
            vec![0.0; self.impurity_decrease.len()]
        }
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    i = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn grow(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let id = self.nodes.len();
        if indices.is_empty() {
            self.nodes.push(Node::Leaf { value: 0.0 });
            return id;
        }
        let value = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;
        self.nodes.push(Node::Leaf { value });

        if depth >= params.max_depth || indices.len() < params.min_samples_split {
            return id;
        }
        let Some(split) = best_split(x, y, &indices, params) else {
            return id;
        };

        self.impurity_decrease[split.feature] += split.decrease;
        let left = self.grow(x, y, split.left, depth + 1, params);
        let right = self.grow(x, y, split.right, depth + 1, params);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }
}

impl Regressor for RegressionTree {
    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.axis_iter(Axis(0)).map(|row| self.predict_row(row)).collect()
    }
}

fn sse(sum: f64, sum_sq: f64, n: f64) -> f64 {
    (sum_sq - sum * sum / n).max(0.0)
}

fn best_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    indices: &[usize],
    params: &TreeParams,
) -> Option<BestSplit> {
    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let parent = sse(total_sum, total_sq, n as f64);
    if parent <= 1e-12 {
        return None;
    }

    let mut best: Option<(usize, f64, f64)> = None;
    let mut order = indices.to_vec();
    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let (mut left_sum, mut left_sq) = (0.0, 0.0);
        for pos in 0..n - 1 {
            let yi = y[order[pos]];
            left_sum += yi;
            left_sq += yi * yi;

            let here = x[[order[pos], feature]];
            let next = x[[order[pos + 1], feature]];
            if here == next {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }
            let children = sse(left_sum, left_sq, n_left as f64)
                + sse(total_sum - left_sum, total_sq - left_sq, n_right as f64);
            let decrease = parent - children;
            if decrease > 1e-12 && best.map_or(true, |(_, _, d)| decrease > d) {
                // the midpoint of adjacent floats can round up to `next`
                let mid = (here + next) / 2.0;
                let threshold = if mid >= next { here } else { mid };
                best = Some((feature, threshold, decrease));
            }
        }
    }

    let (feature, threshold, decrease) = best?;
    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.iter().partition(|&&i| x[[i, feature]] <= threshold);
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some(BestSplit { feature, threshold, left, right, decrease })
}

/// Bagged regression trees; every split considers all features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_estimators: usize,
        max_depth: usize,
        seed: u64,
    ) -> Result<Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(EmissionsError::InsufficientData { required: 1, actual: 0 });
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let params = TreeParams::with_depth(max_depth);
        let trees: Vec<RegressionTree> = (0..n_estimators.max(1))
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(x, y, sample, params)
            })
            .collect();
        debug!(
            "Random forest: {} trees, {} nodes total",
            trees.len(),
            trees.iter().map(RegressionTree::n_nodes).sum::<usize>()
        );
        Ok(RandomForest { trees, n_features: x.ncols() })
    }

    /// Mean of the per-tree normalised importances, renormalised to sum to one.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (a, v) in acc.iter_mut().zip(tree.feature_importances()) {
                *a += v;
            }
        }
        let total: f64 = acc.iter().sum();
        if total > 0.0 {
            acc.iter_mut().for_each(|a| *a /= total);
        }
        acc
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl Regressor for RandomForest {
    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        let n_trees = self.trees.len() as f64;
        x.axis_iter(Axis(0))
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect()
    }
}

/// Gradient boosting on squared error: each round fits a shallow tree to the residuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl GradientBoosting {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_estimators: usize,
        learning_rate: f64,
        max_depth: usize,
    ) -> Result<Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(EmissionsError::InsufficientData { required: 1, actual: 0 });
        }
        let base = y.mean().unwrap_or(0.0);
        let params = TreeParams::with_depth(max_depth);
        let mut current = Array1::from_elem(n, base);
        let mut trees = Vec::with_capacity(n_estimators);

        for _ in 0..n_estimators {
            let residual = Array1::from_shape_fn(n, |i| y[i] - current[i]);
            let tree = RegressionTree::fit(x, &residual, (0..n).collect(), params);
            let step = tree.predict(x);
            current.scaled_add(learning_rate, &step);
            trees.push(tree);
        }

        Ok(GradientBoosting {
            base,
            learning_rate,
            trees,
            n_features: x.ncols(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl Regressor for GradientBoosting {
    fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.axis_iter(Axis(0))
            .map(|row| {
                self.base
                    + self.learning_rate
                        * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect()
    }
}

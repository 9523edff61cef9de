//! Random forest of gini decision trees with bootstrap sampling and random
//! feature subsets per split. Importance is the mean decrease in impurity,
//! normalized per tree, averaged, and normalized again to sum to 1.

use super::{FeatureImportanceRanking, ProbabilityModel};
use crate::config::ForestConfig;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Minimum impurity decrease for a split to be kept
const MIN_DECREASE: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        /// Fraction of positive samples reaching this leaf
        p: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

/// Gini impurity of a binary node: 1 − p² − (1−p)².
fn gini(positives: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let p = positives / n;
    2.0 * p * (1.0 - p)
}

fn best_split(
    x: &Array2<f64>,
    y: &Array1<u8>,
    rows: &[usize],
    positives: usize,
    mtry: usize,
    rng: &mut StdRng,
) -> Option<Split> {
    let n = rows.len() as f64;
    let total_pos = positives as f64;
    let parent = n * gini(total_pos, n);
    let mut best: Option<Split> = None;
    let mut pairs: Vec<(f64, u8)> = Vec::with_capacity(rows.len());

    for feature in index::sample(rng, x.ncols(), mtry).into_iter() {
        pairs.clear();
        pairs.extend(rows.iter().map(|&r| (x[[r, feature]], y[r])));
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut left_pos = 0.0;
        for i in 0..pairs.len() - 1 {
            if pairs[i].1 == 1 {
                left_pos += 1.0;
            }
            let (value, next) = (pairs[i].0, pairs[i + 1].0);
            if next <= value {
                continue;
            }
            let nl = (i + 1) as f64;
            let nr = n - nl;
            let child = nl * gini(left_pos, nl) + nr * gini(total_pos - left_pos, nr);
            let decrease = parent - child;
            let floor = best.as_ref().map_or(MIN_DECREASE, |b| b.decrease);
            if decrease > floor {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    decrease,
                });
            }
        }
    }
    best
}

impl DecisionTree {
    /// Grow one tree on `sample` (row indices, repeats allowed). Returns the
    /// tree and its raw per-feature impurity decrease.
    fn grow(
        x: &Array2<f64>,
        y: &Array1<u8>,
        sample: Vec<usize>,
        config: &ForestConfig,
        mtry: usize,
        rng: &mut StdRng,
    ) -> (Self, Vec<f64>) {
        let mut importance = vec![0.0; x.ncols()];
        let mut nodes = vec![Node::Leaf { p: 0.0 }];
        let mut stack = vec![(0usize, sample, 0usize)];

        while let Some((slot, rows, depth)) = stack.pop() {
            let n = rows.len();
            let positives = rows.iter().filter(|&&r| y[r] == 1).count();
            let p = if n == 0 { 0.0 } else { positives as f64 / n as f64 };
            let stop = positives == 0
                || positives == n
                || n < config.min_samples_split.max(2)
                || config.max_depth.map_or(false, |m| depth >= m);
            if stop {
                nodes[slot] = Node::Leaf { p };
                continue;
            }
            let Some(split) = best_split(x, y, &rows, positives, mtry, rng) else {
                nodes[slot] = Node::Leaf { p };
                continue;
            };
            importance[split.feature] += split.decrease;
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&r| x[[r, split.feature]] <= split.threshold);
            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { p });
            nodes.push(Node::Leaf { p });
            nodes[slot] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            stack.push((right, right_rows, depth + 1));
            stack.push((left, left_rows, depth + 1));
        }
        (Self { nodes }, importance)
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { p } => return *p,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    feature_names: Vec<String>,
    trees: Vec<DecisionTree>,
    importances: Vec<f64>,
}

fn normalize(values: &mut [f64]) -> bool {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
        true
    } else {
        false
    }
}

impl RandomForest {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<u8>,
        feature_names: Vec<String>,
        config: &ForestConfig,
    ) -> Result<Self> {
        if feature_names.len() != x.ncols() || y.len() != x.nrows() {
            return Err(PipelineError::Schema(format!(
                "forest input is {}x{} with {} labels and {} names",
                x.nrows(),
                x.ncols(),
                y.len(),
                feature_names.len()
            )));
        }
        if x.ncols() == 0 {
            return Err(PipelineError::Schema("forest input has no features".into()));
        }
        if !y.iter().any(|&l| l == 1) {
            return Err(PipelineError::EmptyClass { label: 1 });
        }
        if !y.iter().any(|&l| l != 1) {
            return Err(PipelineError::EmptyClass { label: 0 });
        }

        let d = x.ncols();
        let n = x.nrows();
        let mtry = config
            .max_features
            .unwrap_or_else(|| (d as f64).sqrt() as usize)
            .clamp(1, d);

        let mut trees = Vec::with_capacity(config.n_trees);
        let mut importances = vec![0.0; d];
        for t in 0..config.n_trees {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let (tree, mut imp) = DecisionTree::grow(x, y, sample, config, mtry, &mut rng);
            if normalize(&mut imp) {
                for (acc, v) in importances.iter_mut().zip(&imp) {
                    *acc += v;
                }
            }
            trees.push(tree);
        }
        if !normalize(&mut importances) {
            // no tree found a useful split: nothing distinguishes the features
            importances = vec![1.0 / d as f64; d];
        }
        debug!(trees = trees.len(), features = d, mtry, "forest fitted");
        Ok(Self {
            feature_names,
            trees,
            importances,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn ranking(&self) -> FeatureImportanceRanking {
        FeatureImportanceRanking::new(
            self.feature_names
                .iter()
                .cloned()
                .zip(self.importances.iter().copied())
                .collect(),
        )
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl ProbabilityModel for RandomForest {
    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn predict_proba(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(features)).sum();
        (sum / self.trees.len() as f64).clamp(0.0, 1.0)
    }
}

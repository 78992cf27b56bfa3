//! CART decision tree used standalone by boosting and bagged by the forest

use crate::error::{AnalystError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Split quality measure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Variance reduction (regression)
    Variance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Binary decision tree with midpoint thresholds.
///
/// `max_features` limits each split to a random feature subset (used by the
/// forest); boosting and standalone trees scan every feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub seed: u64,
    root: Option<Node>,
}

impl DecisionTree {
    pub fn new_classifier() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            seed: 0,
            root: None,
        }
    }

    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::Variance,
            ..Self::new_classifier()
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(AnalystError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(AnalystError::TrainingError(
                "cannot fit a tree on zero rows".to_string(),
            ));
        }

        let indices: Vec<usize> = (0..x.nrows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.root = Some(self.build(x, y, &indices, 0, &mut rng));
        Ok(self)
    }

    fn build(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> Node {
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let depth_reached = self.max_depth.map_or(false, |d| depth >= d);
        if depth_reached
            || indices.len() < self.min_samples_split
            || Self::is_pure(&y_subset)
        {
            return Node::Leaf {
                value: self.leaf_value(&y_subset),
            };
        }

        let Some((feature, threshold)) = self.best_split(x, y, indices, rng) else {
            return Node::Leaf {
                value: self.leaf_value(&y_subset),
            };
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature]] <= threshold);

        if left_idx.len() < self.min_samples_leaf || right_idx.len() < self.min_samples_leaf {
            return Node::Leaf {
                value: self.leaf_value(&y_subset),
            };
        }

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(x, y, &left_idx, depth + 1, rng)),
            right: Box::new(self.build(x, y, &right_idx, depth + 1, rng)),
        }
    }

    /// Scan candidate features for the threshold with the largest impurity
    /// gain, accumulating split statistics incrementally.
    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let candidates: Vec<usize> = match self.max_features {
            Some(k) if k < n_features => {
                let mut all: Vec<usize> = (0..n_features).collect();
                all.shuffle(rng);
                all.truncate(k.max(1));
                all
            }
            _ => (0..n_features).collect(),
        };

        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.impurity(&y_subset);
        let n = indices.len() as f64;

        let mut best: Option<(usize, f64, f64)> = None;

        for &feature in &candidates {
            let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for window in values.windows(2) {
                let threshold = (window[0] + window[1]) / 2.0;

                let mut left = SplitSide::default();
                let mut right = SplitSide::default();
                for &i in indices {
                    let side = if x[[i, feature]] <= threshold {
                        &mut left
                    } else {
                        &mut right
                    };
                    side.add(y[i]);
                }

                if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left.count as f64 * left.impurity(self.criterion)
                    + right.count as f64 * right.impurity(self.criterion))
                    / n;
                let gain = parent_impurity - weighted;

                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, threshold, gain));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    fn impurity(&self, y: &[f64]) -> f64 {
        let mut side = SplitSide::default();
        for &v in y {
            side.add(v);
        }
        side.impurity(self.criterion)
    }

    fn is_pure(y: &[f64]) -> bool {
        y.windows(2).all(|w| (w[0] - w[1]).abs() < 1e-12)
    }

    fn leaf_value(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        match self.criterion {
            Criterion::Gini => {
                let mut counts: HashMap<i64, usize> = HashMap::new();
                for &v in y {
                    *counts.entry(v.round() as i64).or_insert(0) += 1;
                }
                counts
                    .into_iter()
                    .max_by_key(|&(_, count)| count)
                    .map(|(class, _)| class as f64)
                    .unwrap_or(0.0)
            }
            Criterion::Variance => y.iter().sum::<f64>() / y.len() as f64,
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(AnalystError::ModelNotFitted)?;
        Ok(Array1::from_iter((0..x.nrows()).map(|i| {
            let mut node = root;
            loop {
                match node {
                    Node::Leaf { value } => return *value,
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        node = if x[[i, *feature]] <= *threshold {
                            left.as_ref()
                        } else {
                            right.as_ref()
                        };
                    }
                }
            }
        })))
    }
}

/// Incremental statistics for one side of a candidate split
#[derive(Default)]
struct SplitSide {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: HashMap<i64, usize>,
}

impl SplitSide {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sq_sum += value * value;
        *self.class_counts.entry(value.round() as i64).or_insert(0) += 1;
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                let mut gini = 1.0;
                for &c in self.class_counts.values() {
                    let p = c as f64 / n;
                    gini -= p * p;
                }
                gini
            }
            Criterion::Variance => self.sq_sum / n - (self.sum / n).powi(2),
        }
    }
}

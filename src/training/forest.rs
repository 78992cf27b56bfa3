//! Bootstrap-aggregated decision trees

use super::tree::DecisionTree;
use crate::error::{AnalystError, Result};
use ndarray::{Array1, Array2};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Random forest. Trees train in parallel on bootstrap samples, each split
/// drawing from a sqrt-sized random feature subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub random_state: u64,
    is_classification: bool,
    trees: Vec<DecisionTree>,
    classes: Vec<f64>,
}

impl RandomForest {
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_leaf: 1,
            random_state: 0,
            is_classification: true,
            trees: Vec::new(),
            classes: Vec::new(),
        }
    }

    pub fn new_regressor(n_estimators: usize) -> Self {
        Self {
            is_classification: false,
            ..Self::new_classifier(n_estimators)
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(AnalystError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(AnalystError::TrainingError(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }

        if self.is_classification {
            let mut classes: Vec<f64> = y.to_vec();
            classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            classes.dedup();
            self.classes = classes;
        }

        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);
        let base_seed = self.random_state;

        let trees: Result<Vec<DecisionTree>> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() % n_samples as u64) as usize)
                    .collect();

                let x_boot = x.select(ndarray::Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_iter(sample_indices.iter().map(|&i| y[i]));

                let mut tree = if self.is_classification {
                    DecisionTree::new_classifier()
                } else {
                    DecisionTree::new_regressor()
                };
                if let Some(depth) = self.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                tree = tree
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_seed(seed);

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        Ok(self)
    }

    fn tree_predictions(&self, x: &Array2<f64>) -> Result<Vec<Array1<f64>>> {
        if self.trees.is_empty() {
            return Err(AnalystError::ModelNotFitted);
        }
        self.trees.par_iter().map(|tree| tree.predict(x)).collect()
    }

    /// Majority vote (classification) or mean (regression) over trees
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let all = self.tree_predictions(x)?;
        let n_samples = x.nrows();

        let predictions = if self.is_classification {
            (0..n_samples)
                .map(|i| {
                    let mut votes: HashMap<i64, usize> = HashMap::new();
                    for preds in &all {
                        *votes.entry(preds[i].round() as i64).or_insert(0) += 1;
                    }
                    votes
                        .into_iter()
                        .max_by_key(|&(_, count)| count)
                        .map(|(class, _)| class as f64)
                        .unwrap_or(0.0)
                })
                .collect()
        } else {
            (0..n_samples)
                .map(|i| all.iter().map(|p| p[i]).sum::<f64>() / all.len() as f64)
                .collect()
        };

        Ok(Array1::from_vec(predictions))
    }

    /// Vote frequencies as class probabilities, columns in sorted class order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_classification {
            return Err(AnalystError::TrainingError(
                "predict_proba requires a classification forest".to_string(),
            ));
        }
        let all = self.tree_predictions(x)?;
        let n_samples = x.nrows();
        let n_classes = self.classes.len();

        let mut proba = Array2::zeros((n_samples, n_classes));
        for i in 0..n_samples {
            for preds in &all {
                let label = preds[i].round() as i64;
                if let Some(idx) = self
                    .classes
                    .iter()
                    .position(|&c| c.round() as i64 == label)
                {
                    proba[[i, idx]] += 1.0;
                }
            }
            let row_sum: f64 = proba.row(i).sum();
            if row_sum > 0.0 {
                for j in 0..n_classes {
                    proba[[i, j]] /= row_sum;
                }
            }
        }

        Ok(proba)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2]
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut forest = RandomForest::new_classifier(20).with_random_state(42);
        forest.fit(&x, &y).unwrap();
        let pred = forest.predict(&x).unwrap();

        let accuracy = pred
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (*p - *t).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy >= 0.8, "accuracy too low: {accuracy}");
    }

    #[test]
    fn test_regressor_tracks_target() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let mut forest = RandomForest::new_regressor(20).with_random_state(42);
        forest.fit(&x, &y).unwrap();
        let pred = forest.predict(&x).unwrap();

        let mse: f64 = pred
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 2.0, "mse too high: {mse}");
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let x = array![[0.0], [0.1], [1.0], [1.1]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut forest = RandomForest::new_classifier(15).with_random_state(7);
        forest.fit(&x, &y).unwrap();
        let proba = forest.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 2);
        for i in 0..proba.nrows() {
            assert!((proba.row(i).sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let x = array![[0.0], [0.3], [0.7], [1.0], [1.4], [2.0]];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut a = RandomForest::new_classifier(10).with_random_state(11);
        let mut b = RandomForest::new_classifier(10).with_random_state(11);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_regression_proba_errors() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0];
        let mut forest = RandomForest::new_regressor(5);
        forest.fit(&x, &y).unwrap();
        assert!(forest.predict_proba(&x).is_err());
    }
}

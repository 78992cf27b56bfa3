//! Gradient-boosted decision trees

use super::tree::DecisionTree;
use crate::error::{AnalystError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Boosting hyperparameters shared by regressor and classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's contribution
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Row fraction drawn (without replacement) per round
    pub subsample: f64,
    /// Column fraction drawn per round
    pub colsample: f64,
    pub random_state: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            subsample: 1.0,
            colsample: 1.0,
            random_state: 42,
        }
    }
}

fn draw_indices(n: usize, fraction: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let size = ((n as f64) * fraction).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(size.clamp(1, n));
    indices.sort_unstable();
    indices
}

/// One boosted stage: a shallow tree plus the column subset it was fit on
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stage {
    tree: DecisionTree,
    columns: Vec<usize>,
}

/// Shared residual-fitting loop. `next_residuals` maps the current raw
/// scores to per-row pseudo-residuals; each round fits one shallow tree on a
/// row/column subsample and folds it into `raw_scores` with shrinkage.
fn boost_stages(
    x: &Array2<f64>,
    config: &BoostingConfig,
    rng: &mut Xoshiro256PlusPlus,
    mut next_residuals: impl FnMut(&Array1<f64>) -> Array1<f64>,
    raw_scores: &mut Array1<f64>,
) -> Result<Vec<Stage>> {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    let mut stages = Vec::with_capacity(config.n_estimators);

    for _ in 0..config.n_estimators {
        let residuals = next_residuals(raw_scores);

        let rows = draw_indices(n_samples, config.subsample, rng);
        let columns = draw_indices(n_features, config.colsample, rng);

        let x_rows = x.select(ndarray::Axis(0), &rows);
        let x_sub = x_rows.select(ndarray::Axis(1), &columns);
        let y_sub: Array1<f64> = Array1::from_iter(rows.iter().map(|&i| residuals[i]));

        let mut tree = DecisionTree::new_regressor().with_max_depth(config.max_depth);
        tree.fit(&x_sub, &y_sub)?;

        // Update raw scores over all rows so the next residuals see this stage
        let x_all = x.select(ndarray::Axis(1), &columns);
        let tree_pred = tree.predict(&x_all)?;
        for i in 0..n_samples {
            raw_scores[i] += config.learning_rate * tree_pred[i];
        }

        stages.push(Stage { tree, columns });
    }

    Ok(stages)
}

fn apply_stages(
    x: &Array2<f64>,
    stages: &[Stage],
    init: f64,
    learning_rate: f64,
) -> Result<Array1<f64>> {
    let n = x.nrows();
    let mut scores = Array1::from_elem(n, init);
    for stage in stages {
        let x_sub = x.select(ndarray::Axis(1), &stage.columns);
        let pred = stage.tree.predict(&x_sub)?;
        for i in 0..n {
            scores[i] += learning_rate * pred[i];
        }
    }
    Ok(scores)
}

/// Gradient boosting for regression: squared loss, mean-initialized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    config: BoostingConfig,
    initial_prediction: f64,
    stages: Vec<Stage>,
}

impl GradientBoostingRegressor {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            initial_prediction: 0.0,
            stages: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(AnalystError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        self.initial_prediction = y.mean().unwrap_or(0.0);
        let mut raw = Array1::from_elem(x.nrows(), self.initial_prediction);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        let y_own = y.clone();
        self.stages = boost_stages(
            x,
            &self.config,
            &mut rng,
            move |scores| &y_own - scores,
            &mut raw,
        )?;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.stages.is_empty() {
            return Err(AnalystError::ModelNotFitted);
        }
        apply_stages(x, &self.stages, self.initial_prediction, self.config.learning_rate)
    }
}

/// One binary booster: log-odds initialized, logistic-loss residuals
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryBooster {
    initial_log_odds: f64,
    stages: Vec<Stage>,
}

impl BinaryBooster {
    fn fit(
        x: &Array2<f64>,
        indicator: &Array1<f64>,
        config: &BoostingConfig,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Result<Self> {
        let p = indicator.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        let initial_log_odds = (p / (1.0 - p)).ln();
        let mut raw = Array1::from_elem(x.nrows(), initial_log_odds);

        let y_own = indicator.clone();
        let stages = boost_stages(
            x,
            config,
            rng,
            move |scores| {
                let probs = scores.mapv(|lo| 1.0 / (1.0 + (-lo).exp()));
                &y_own - &probs
            },
            &mut raw,
        )?;

        Ok(Self {
            initial_log_odds,
            stages,
        })
    }

    fn scores(&self, x: &Array2<f64>, learning_rate: f64) -> Result<Array1<f64>> {
        let log_odds = apply_stages(x, &self.stages, self.initial_log_odds, learning_rate)?;
        Ok(log_odds.mapv(|lo| 1.0 / (1.0 + (-lo).exp())))
    }
}

/// Gradient boosting for classification. Binary targets get one booster on
/// the log-odds; more classes get one-vs-rest boosters with normalized
/// scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: BoostingConfig,
    classes: Vec<f64>,
    boosters: Vec<BinaryBooster>,
}

impl GradientBoostingClassifier {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            boosters: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(AnalystError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();
        if classes.len() < 2 {
            return Err(AnalystError::TrainingError(
                "target has a single class".to_string(),
            ));
        }

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        self.boosters.clear();

        if classes.len() == 2 {
            let positive = classes[1];
            let indicator = y.mapv(|v| if v == positive { 1.0 } else { 0.0 });
            self.boosters
                .push(BinaryBooster::fit(x, &indicator, &self.config, &mut rng)?);
        } else {
            for &class in &classes {
                let indicator = y.mapv(|v| if v == class { 1.0 } else { 0.0 });
                self.boosters
                    .push(BinaryBooster::fit(x, &indicator, &self.config, &mut rng)?);
            }
        }

        self.classes = classes;
        Ok(self)
    }

    /// Class probabilities, one column per class in sorted class order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.boosters.is_empty() {
            return Err(AnalystError::ModelNotFitted);
        }
        let n = x.nrows();
        let k = self.classes.len();

        if k == 2 {
            let p = self.boosters[0].scores(x, self.config.learning_rate)?;
            let mut out = Array2::zeros((n, 2));
            for (i, &pi) in p.iter().enumerate() {
                out[[i, 0]] = 1.0 - pi;
                out[[i, 1]] = pi;
            }
            return Ok(out);
        }

        let mut out = Array2::zeros((n, k));
        for (c, booster) in self.boosters.iter().enumerate() {
            let p = booster.scores(x, self.config.learning_rate)?;
            for (i, &pi) in p.iter().enumerate() {
                out[[i, c]] = pi;
            }
        }
        for i in 0..n {
            let row_sum: f64 = out.row(i).sum();
            if row_sum > 0.0 {
                for c in 0..k {
                    out[[i, c]] /= row_sum;
                }
            }
        }
        Ok(out)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(Array1::from_iter((0..x.nrows()).map(|i| {
            let row = proba.row(i);
            let best = row
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            self.classes[best]
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn regression_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((80, 2), |(i, j)| (i as f64) * 0.1 + j as f64);
        let y = Array1::from_iter(
            x.rows()
                .into_iter()
                .map(|row| row[0] * 2.0 + row[1] * 0.5 + 1.0),
        );
        (x, y)
    }

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((80, 2), |(i, j)| (i as f64) * 0.1 + j as f64 * 0.3);
        let y = Array1::from_iter(
            x.rows()
                .into_iter()
                .map(|row| if row[0] + row[1] > 4.5 { 1.0 } else { 0.0 }),
        );
        (x, y)
    }

    #[test]
    fn test_regressor_beats_mean_predictor() {
        let (x, y) = regression_data();
        let config = BoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        };

        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();

        let mse: f64 = y
            .iter()
            .zip(pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        let y_mean = y.mean().unwrap();
        let var: f64 = y.iter().map(|t| (t - y_mean).powi(2)).sum::<f64>() / y.len() as f64;
        assert!(mse < var, "mse {mse} should beat variance {var}");
    }

    #[test]
    fn test_classifier_binary() {
        let (x, y) = classification_data();
        let config = BoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            ..Default::default()
        };

        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();
        let pred = model.predict(&x).unwrap();

        let accuracy = pred
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (*p - *t).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy > 0.8, "accuracy too low: {accuracy}");

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 2);
        for i in 0..proba.nrows() {
            assert!((proba.row(i).sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_classifier_multiclass() {
        // Three bands over one feature
        let x = Array2::from_shape_fn((60, 1), |(i, _)| i as f64 * 0.1);
        let y = Array1::from_iter((0..60).map(|i| {
            if i < 20 {
                0.0
            } else if i < 40 {
                1.0
            } else {
                2.0
            }
        }));

        let config = BoostingConfig {
            n_estimators: 15,
            max_depth: 2,
            ..Default::default()
        };
        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 3);

        let pred = model.predict(&x).unwrap();
        let accuracy = pred
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (*p - *t).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy > 0.8, "accuracy too low: {accuracy}");
    }

    #[test]
    fn test_subsampling_still_fits() {
        let (x, y) = regression_data();
        let config = BoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            subsample: 0.9,
            colsample: 0.9,
            random_state: 42,
            ..Default::default()
        };
        let mut model = GradientBoostingRegressor::new(config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap().len(), 80);
    }
}

//! The fixed candidate rosters and the fitted-model dispatch enum

use super::boosting::{BoostingConfig, GradientBoostingClassifier, GradientBoostingRegressor};
use super::forest::RandomForest;
use super::linear::{LassoRegression, LinearRegression, LogisticRegression, RidgeRegression};
use crate::detect::ProblemType;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A named estimator with its fixed hyperparameter configuration.
/// Rosters are declared per problem type and immutable for a run.
#[derive(Debug, Clone)]
pub struct ModelCandidate {
    pub name: &'static str,
    kind: CandidateKind,
}

#[derive(Debug, Clone)]
enum CandidateKind {
    LinearRegression,
    Ridge { alpha: f64 },
    Lasso { alpha: f64 },
    RandomForestRegressor { n_estimators: usize, seed: u64 },
    GradientBoostingRegressor(BoostingConfig),
    LogisticRegression { max_iter: usize },
    RandomForestClassifier { n_estimators: usize, seed: u64 },
    GradientBoostingClassifier(BoostingConfig),
}

fn boosting_defaults(seed: u64) -> BoostingConfig {
    BoostingConfig {
        n_estimators: 300,
        learning_rate: 0.05,
        max_depth: 6,
        subsample: 0.9,
        colsample: 0.9,
        random_state: seed,
    }
}

/// The candidate roster for a problem type, in training order.
pub fn roster(problem_type: ProblemType) -> Vec<ModelCandidate> {
    match problem_type {
        ProblemType::Regression => vec![
            ModelCandidate {
                name: "LinearRegression",
                kind: CandidateKind::LinearRegression,
            },
            ModelCandidate {
                name: "Ridge",
                kind: CandidateKind::Ridge { alpha: 1.0 },
            },
            ModelCandidate {
                name: "Lasso",
                kind: CandidateKind::Lasso { alpha: 0.001 },
            },
            ModelCandidate {
                name: "RandomForestRegressor",
                kind: CandidateKind::RandomForestRegressor {
                    n_estimators: 200,
                    seed: 42,
                },
            },
            ModelCandidate {
                name: "GradientBoostingRegressor",
                kind: CandidateKind::GradientBoostingRegressor(boosting_defaults(42)),
            },
        ],
        ProblemType::Classification => vec![
            ModelCandidate {
                name: "LogisticRegression",
                kind: CandidateKind::LogisticRegression { max_iter: 200 },
            },
            ModelCandidate {
                name: "RandomForestClassifier",
                kind: CandidateKind::RandomForestClassifier {
                    n_estimators: 300,
                    seed: 42,
                },
            },
            ModelCandidate {
                name: "GradientBoostingClassifier",
                kind: CandidateKind::GradientBoostingClassifier(boosting_defaults(42)),
            },
        ],
    }
}

impl ModelCandidate {
    /// Fit this candidate on a preprocessed training matrix.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FittedModel> {
        let fitted = match &self.kind {
            CandidateKind::LinearRegression => {
                let mut model = LinearRegression::new();
                model.fit(x, y)?;
                FittedModel::LinearRegression(model)
            }
            CandidateKind::Ridge { alpha } => {
                let mut model = RidgeRegression::new(*alpha);
                model.fit(x, y)?;
                FittedModel::Ridge(model)
            }
            CandidateKind::Lasso { alpha } => {
                let mut model = LassoRegression::new(*alpha);
                model.fit(x, y)?;
                FittedModel::Lasso(model)
            }
            CandidateKind::RandomForestRegressor { n_estimators, seed } => {
                let mut model =
                    RandomForest::new_regressor(*n_estimators).with_random_state(*seed);
                model.fit(x, y)?;
                FittedModel::RandomForestRegressor(model)
            }
            CandidateKind::GradientBoostingRegressor(config) => {
                let mut model = GradientBoostingRegressor::new(config.clone());
                model.fit(x, y)?;
                FittedModel::GradientBoostingRegressor(model)
            }
            CandidateKind::LogisticRegression { max_iter } => {
                let mut model = LogisticRegression::new().with_max_iter(*max_iter);
                model.fit(x, y)?;
                FittedModel::LogisticRegression(model)
            }
            CandidateKind::RandomForestClassifier { n_estimators, seed } => {
                let mut model =
                    RandomForest::new_classifier(*n_estimators).with_random_state(*seed);
                model.fit(x, y)?;
                FittedModel::RandomForestClassifier(model)
            }
            CandidateKind::GradientBoostingClassifier(config) => {
                let mut model = GradientBoostingClassifier::new(config.clone());
                model.fit(x, y)?;
                FittedModel::GradientBoostingClassifier(model)
            }
        };
        Ok(fitted)
    }
}

/// A fitted estimator from the roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedModel {
    LinearRegression(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
    RandomForestRegressor(RandomForest),
    GradientBoostingRegressor(GradientBoostingRegressor),
    LogisticRegression(LogisticRegression),
    RandomForestClassifier(RandomForest),
    GradientBoostingClassifier(GradientBoostingClassifier),
}

impl FittedModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedModel::LinearRegression(m) => m.predict(x),
            FittedModel::Ridge(m) => m.predict(x),
            FittedModel::Lasso(m) => m.predict(x),
            FittedModel::RandomForestRegressor(m) => m.predict(x),
            FittedModel::GradientBoostingRegressor(m) => m.predict(x),
            FittedModel::LogisticRegression(m) => m.predict(x),
            FittedModel::RandomForestClassifier(m) => m.predict(x),
            FittedModel::GradientBoostingClassifier(m) => m.predict(x),
        }
    }

    /// Class probabilities where the model supports them (columns in sorted
    /// class order); None for regression models.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Option<Result<Array2<f64>>> {
        match self {
            FittedModel::LogisticRegression(m) => Some(m.predict_proba(x)),
            FittedModel::RandomForestClassifier(m) => Some(m.predict_proba(x)),
            FittedModel::GradientBoostingClassifier(m) => Some(m.predict_proba(x)),
            _ => None,
        }
    }
}

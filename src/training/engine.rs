//! The fit/score loop: split, preprocess, train the roster, pick the best

use super::candidates::{roster, FittedModel};
use super::metrics;
use crate::detect::{is_numeric_dtype, ProblemType};
use crate::error::{AnalystError, Result};
use crate::preprocessing::FeaturePreprocessor;
use ndarray::Array1;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What to do when a roster candidate fails to fit or predict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Fail the whole run on the first candidate error (original behavior)
    Abort,
    /// Log the failure, drop the candidate, continue with the rest
    Skip,
}

/// Trainer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Fraction of rows held out for scoring
    pub test_fraction: f64,
    /// Seed for the shuffle split
    pub seed: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

/// Leaderboard entry for one trained candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelScore {
    pub name: String,
    pub metrics: HashMap<String, f64>,
    pub training_time_secs: f64,
}

/// The composition of a fitted preprocessor and a fitted model over one
/// training split. Owned by the run that created it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedPipeline {
    pub preprocessor: FeaturePreprocessor,
    pub model: FittedModel,
    /// Original class labels for classification targets, in encoded order;
    /// None for regression.
    pub class_labels: Option<Vec<String>>,
}

impl TrainedPipeline {
    /// Predictions in encoded space (class indices for classification)
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.preprocessor.transform(df)?;
        self.model.predict(&x)
    }

    /// Predictions decoded to original class labels (classification only)
    pub fn predict_labels(&self, df: &DataFrame) -> Result<Vec<String>> {
        let labels = self.class_labels.as_ref().ok_or_else(|| {
            AnalystError::TrainingError(
                "predict_labels requires a classification pipeline".to_string(),
            )
        })?;
        let encoded = self.predict(df)?;
        Ok(encoded
            .iter()
            .map(|v| {
                let idx = (v.round() as usize).min(labels.len().saturating_sub(1));
                labels[idx].clone()
            })
            .collect())
    }
}

/// The winning candidate of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestModel {
    pub name: String,
    pub pipeline: TrainedPipeline,
    pub metrics: HashMap<String, f64>,
}

/// Everything the trainer hands back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub best: BestModel,
    /// One entry per trained candidate, in training order
    pub leaderboard: Vec<ModelScore>,
}

/// Fits the candidate roster for a problem type and scores each candidate on
/// a held-out split. Candidates train strictly one after another.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trainer {
    pub config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Train every roster candidate and select the best by the problem
    /// type's selection metric (R2 or F1_weighted, strict improvement only).
    pub fn fit_and_score(
        &self,
        df: &DataFrame,
        target: &str,
        problem_type: ProblemType,
    ) -> Result<TrainOutcome> {
        let features = df.drop(target).map_err(|_| {
            AnalystError::ColumnNotFound(target.to_string())
        })?;

        let (train_idx, test_idx) = self.split_indices(df.height());
        let train_features = take_rows(&features, &train_idx)?;
        let test_features = take_rows(&features, &test_idx)?;

        let (y_all, class_labels) = encode_target(df, target, problem_type)?;
        let y_train = Array1::from_iter(train_idx.iter().map(|&i| y_all[i as usize]));
        let y_test = Array1::from_iter(test_idx.iter().map(|&i| y_all[i as usize]));

        info!(
            rows = df.height(),
            train = train_idx.len(),
            test = test_idx.len(),
            problem = %problem_type,
            "training roster"
        );

        let preprocessor = FeaturePreprocessor::fit(&train_features)?;
        let x_train = preprocessor.transform(&train_features)?;
        let x_test = preprocessor.transform(&test_features)?;

        let binary = class_labels.as_ref().map_or(false, |c| c.len() == 2);
        let selection_metric = match problem_type {
            ProblemType::Regression => "R2",
            ProblemType::Classification => "F1_weighted",
        };

        let mut leaderboard: Vec<ModelScore> = Vec::new();
        let mut best: Option<BestModel> = None;
        let mut best_value = f64::NEG_INFINITY;

        for candidate in roster(problem_type) {
            let start = Instant::now();

            let outcome = candidate
                .fit(&x_train, &y_train)
                .and_then(|model| {
                    let y_pred = model.predict(&x_test)?;
                    Ok((model, y_pred))
                });

            let (model, y_pred) = match outcome {
                Ok(pair) => pair,
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(AnalystError::TrainingError(format!(
                            "{} failed: {e}",
                            candidate.name
                        )));
                    }
                    FailurePolicy::Skip => {
                        warn!(model = candidate.name, error = %e, "candidate skipped");
                        continue;
                    }
                },
            };

            let mut scores =
                evaluate(problem_type, &y_test, &y_pred);

            // ROC-AUC only for binary targets with usable probabilities;
            // anything going wrong here just omits the metric
            if binary {
                if let Some(Ok(proba)) = model.predict_proba(&x_test) {
                    if proba.ncols() == 2 {
                        let positive_scores = proba.column(1).to_owned();
                        if let Some(auc) = metrics::roc_auc_binary(&y_test, &positive_scores) {
                            scores.insert("ROC_AUC".to_string(), auc);
                        }
                    }
                }
            }

            let elapsed = start.elapsed().as_secs_f64();
            let value = scores.get(selection_metric).copied().unwrap_or(f64::MIN);
            debug!(model = candidate.name, metric = selection_metric, value, "scored");

            // First candidate seeds best regardless of score; afterwards
            // strict improvement only, so ties keep the earlier model
            if best.is_none() || value > best_value {
                best = Some(BestModel {
                    name: candidate.name.to_string(),
                    pipeline: TrainedPipeline {
                        preprocessor: preprocessor.clone(),
                        model,
                        class_labels: class_labels.clone(),
                    },
                    metrics: scores.clone(),
                });
                best_value = value;
            }

            leaderboard.push(ModelScore {
                name: candidate.name.to_string(),
                metrics: scores,
                training_time_secs: elapsed,
            });
        }

        let best = best.ok_or_else(|| {
            AnalystError::TrainingError("every roster candidate failed".to_string())
        })?;

        info!(best = %best.name, "roster complete");

        Ok(TrainOutcome { best, leaderboard })
    }

    /// Seeded shuffle split; no stratification.
    fn split_indices(&self, n_rows: usize) -> (Vec<IdxSize>, Vec<IdxSize>) {
        let mut indices: Vec<IdxSize> = (0..n_rows as IdxSize).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);

        let test_size = ((n_rows as f64) * self.config.test_fraction) as usize;
        let test_size = test_size.min(n_rows.saturating_sub(1));
        let test = indices[..test_size].to_vec();
        let train = indices[test_size..].to_vec();
        (train, test)
    }
}

fn take_rows(df: &DataFrame, indices: &[IdxSize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec("idx".into(), indices.to_vec());
    Ok(df.take(&idx)?)
}

/// Target column as f64 labels. Regression casts straight to floats;
/// classification encodes the sorted distinct values as 0..k and returns the
/// label list for decoding. Missing target values are a training error.
fn encode_target(
    df: &DataFrame,
    target: &str,
    problem_type: ProblemType,
) -> Result<(Vec<f64>, Option<Vec<String>>)> {
    let column = df
        .column(target)
        .map_err(|_| AnalystError::ColumnNotFound(target.to_string()))?;

    if column.null_count() > 0 {
        return Err(AnalystError::TrainingError(format!(
            "target column '{target}' has missing values"
        )));
    }

    match problem_type {
        ProblemType::Regression => {
            let casted = column.cast(&DataType::Float64)?;
            let values: Vec<f64> = casted
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok((values, None))
        }
        ProblemType::Classification => {
            // Numeric class labels sort numerically, everything else
            // lexically; either way the encoding is deterministic
            if is_numeric_dtype(column.dtype()) {
                let casted = column.cast(&DataType::Float64)?;
                let raw: Vec<f64> = casted
                    .f64()?
                    .into_iter()
                    .map(|v| v.unwrap_or(0.0))
                    .collect();

                let mut distinct = raw.clone();
                distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                distinct.dedup();

                let values: Vec<f64> = raw
                    .iter()
                    .map(|v| {
                        distinct
                            .iter()
                            .position(|d| d == v)
                            .unwrap_or(0) as f64
                    })
                    .collect();
                let labels = distinct.into_iter().map(format_class).collect();
                Ok((values, Some(labels)))
            } else {
                let casted = column.cast(&DataType::String)?;
                let raw: Vec<String> = casted
                    .as_materialized_series()
                    .str()?
                    .into_iter()
                    .map(|v| v.unwrap_or_default().to_string())
                    .collect();

                let mut labels: Vec<String> = raw.clone();
                labels.sort();
                labels.dedup();

                let values: Vec<f64> = raw
                    .iter()
                    .map(|v| labels.binary_search(v).unwrap_or(0) as f64)
                    .collect();
                Ok((values, Some(labels)))
            }
        }
    }
}

fn format_class(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Held-out metrics for one candidate
fn evaluate(
    problem_type: ProblemType,
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
) -> HashMap<String, f64> {
    let mut scores = HashMap::new();
    match problem_type {
        ProblemType::Regression => {
            scores.insert("RMSE".to_string(), metrics::rmse(y_true, y_pred));
            scores.insert("R2".to_string(), metrics::r2(y_true, y_pred));
        }
        ProblemType::Classification => {
            scores.insert(
                "F1_weighted".to_string(),
                metrics::f1_weighted(y_true, y_pred),
            );
        }
    }
    scores
}

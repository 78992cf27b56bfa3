//! Model training and evaluation
//!
//! Native implementations of the roster model families:
//! - Linear models (OLS, Ridge, Lasso, Logistic)
//! - Decision trees and bagged random forests
//! - Gradient-boosted trees
//!
//! plus the metrics they are scored with and the engine that runs the
//! split → fit → score → select loop.

pub mod metrics;

mod boosting;
mod candidates;
mod engine;
mod forest;
mod linear;
mod tree;

pub use boosting::{BoostingConfig, GradientBoostingClassifier, GradientBoostingRegressor};
pub use candidates::{roster, FittedModel, ModelCandidate};
pub use engine::{
    BestModel, FailurePolicy, ModelScore, TrainOutcome, TrainedPipeline, Trainer, TrainerConfig,
};
pub use forest::RandomForest;
pub use linear::{LassoRegression, LinearRegression, LogisticRegression, RidgeRegression};
pub use tree::{Criterion, DecisionTree};

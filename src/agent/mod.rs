//! The fixed-sequence orchestrator
//!
//! Runs clean → profile → detect → train in order and packages the results.
//! There is no planning or reflection behind the plan: its steps are a
//! constant list of stage identifiers, and the goal string is metadata only.

use crate::data::clean;
use crate::detect::{ProblemType, ProblemTypeDetector};
use crate::error::Result;
use crate::profiling::{profile_overview, DatasetOverview};
use crate::training::{BestModel, FailurePolicy, ModelScore, Trainer, TrainerConfig};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// The stage identifiers every run walks through, in order
pub const PLAN_STEPS: [&str; 6] = [
    "clean_data",
    "profile",
    "determine_problem_type",
    "train_models",
    "select_best",
    "summarize",
];

/// Static run plan: the caller's goal plus the fixed stage list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub steps: Vec<String>,
}

impl Plan {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            steps: PLAN_STEPS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Orchestrator configuration. All knobs are explicit; nothing is read from
/// the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub goal: String,
    /// Distinct-value cutoff for treating numeric targets as classes
    pub max_numeric_classes: usize,
    pub test_fraction: f64,
    pub seed: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let trainer = TrainerConfig::default();
        Self {
            goal: "Find the best model and explain key drivers.".to_string(),
            max_numeric_classes: ProblemTypeDetector::default().max_numeric_classes,
            test_fraction: trainer.test_fraction,
            seed: trainer.seed,
            failure_policy: trainer.failure_policy,
        }
    }
}

/// Aggregate result of one agent invocation; immutable once built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub plan: Plan,
    pub problem_type: ProblemType,
    pub best: BestModel,
    pub leaderboard: Vec<ModelScore>,
    pub overview: DatasetOverview,
}

impl RunResult {
    pub fn best_model_name(&self) -> &str {
        &self.best.name
    }

    pub fn best_metrics(&self) -> &HashMap<String, f64> {
        &self.best.metrics
    }

    /// Plain-text rendering of the run for terminals and logs
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Analysis Run ===\n\n");
        out.push_str(&format!("Goal:         {}\n", self.plan.goal));
        out.push_str(&format!("Problem type: {}\n", self.problem_type));
        out.push_str(&format!(
            "Dataset:      {} rows x {} columns\n",
            self.overview.rows, self.overview.cols
        ));

        if !self.overview.missing.is_empty() {
            out.push_str("\n--- Missing Values ---\n");
            for stat in &self.overview.missing {
                out.push_str(&format!(
                    "  {:<20} {:>6}  ({:.1}%)\n",
                    stat.column,
                    stat.count,
                    stat.fraction * 100.0
                ));
            }
        }

        out.push_str("\n--- Leaderboard ---\n");
        for score in &self.leaderboard {
            let mut parts: Vec<(&String, &f64)> = score.metrics.iter().collect();
            parts.sort_by(|a, b| a.0.cmp(b.0));
            let rendered: Vec<String> = parts
                .iter()
                .map(|(name, value)| format!("{name}={value:.4}"))
                .collect();
            out.push_str(&format!(
                "  {:<28} {}  [{:.2}s]\n",
                score.name,
                rendered.join("  "),
                score.training_time_secs
            ));
        }

        out.push_str(&format!("\nBest model: {}\n", self.best.name));
        out
    }
}

/// Runs the pipeline stages in fixed sequence. Any stage error propagates as
/// a whole-run failure; no partial result is returned.
#[derive(Debug, Clone, Default)]
pub struct AnalystAgent {
    config: AgentConfig,
}

impl AnalystAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    pub fn with_goal(goal: impl Into<String>) -> Self {
        Self::new(AgentConfig {
            goal: goal.into(),
            ..AgentConfig::default()
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Execute clean → profile → detect → train and package the results.
    pub fn run(&self, df: &DataFrame, target: &str) -> Result<RunResult> {
        info!(target_column = target, goal = %self.config.goal, "starting analysis run");

        let df = clean(df)?;

        let overview = profile_overview(&df)?;

        let detector = ProblemTypeDetector::new()
            .with_max_numeric_classes(self.config.max_numeric_classes);
        let problem_type = detector.detect(&df, target)?;
        info!(%problem_type, "problem type detected");

        let trainer = Trainer::new(TrainerConfig {
            test_fraction: self.config.test_fraction,
            seed: self.config.seed,
            failure_policy: self.config.failure_policy,
        });
        let outcome = trainer.fit_and_score(&df, target, problem_type)?;

        Ok(RunResult {
            plan: Plan::new(self.config.goal.clone()),
            problem_type,
            best: outcome.best,
            leaderboard: outcome.leaderboard,
            overview,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled_frame(n: usize) -> DataFrame {
        let age: Vec<i64> = (0..n).map(|i| 20 + (i as i64 * 7) % 45).collect();
        let city: Vec<&str> = (0..n)
            .map(|i| match i % 3 {
                0 => "tokyo",
                1 => "osaka",
                _ => "kyoto",
            })
            .collect();
        let label: Vec<i64> = (0..n).map(|i| ((20 + (i as i64 * 7) % 45) > 40) as i64).collect();
        DataFrame::new(vec![
            Column::new("age".into(), age),
            Column::new("city".into(), city),
            Column::new("label".into(), label),
        ])
        .unwrap()
    }

    #[test]
    fn test_plan_has_fixed_steps() {
        let plan = Plan::new("anything");
        assert_eq!(plan.steps.len(), 6);
        assert_eq!(plan.steps[0], "clean_data");
        assert_eq!(plan.steps[5], "summarize");
    }

    #[test]
    fn test_run_classification() {
        let df = labelled_frame(90);
        let agent = AnalystAgent::default();
        let result = agent.run(&df, "label").unwrap();

        assert_eq!(result.problem_type, ProblemType::Classification);
        assert_eq!(result.leaderboard.len(), 3);
        assert!(result
            .leaderboard
            .iter()
            .any(|s| s.name == result.best_model_name()));
        assert!(result.best_metrics().contains_key("F1_weighted"));
    }

    #[test]
    fn test_goal_is_metadata_only() {
        let df = labelled_frame(90);
        let a = AnalystAgent::with_goal("goal one").run(&df, "label").unwrap();
        let b = AnalystAgent::with_goal("goal two").run(&df, "label").unwrap();
        assert_eq!(a.best.name, b.best.name);
        assert_eq!(a.plan.goal, "goal one");
        assert_eq!(b.plan.goal, "goal two");
    }

    #[test]
    fn test_summary_mentions_best_model() {
        let df = labelled_frame(90);
        let result = AnalystAgent::default().run(&df, "label").unwrap();
        let summary = result.summary();
        assert!(summary.contains("Leaderboard"));
        assert!(summary.contains(result.best_model_name()));
    }

    #[test]
    fn test_missing_target_fails_whole_run() {
        let df = labelled_frame(30);
        let err = AnalystAgent::default().run(&df, "nope").unwrap_err();
        assert!(matches!(err, crate::AnalystError::ColumnNotFound(_)));
    }

    #[test]
    fn test_result_serializes() {
        let df = labelled_frame(90);
        let result = AnalystAgent::default().run(&df, "label").unwrap();
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("leaderboard"));
        assert!(json.contains("problem_type"));
    }
}

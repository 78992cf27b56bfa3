//! Integration tests: full pipeline from raw table to run result

use autoanalyst::agent::{AgentConfig, AnalystAgent};
use autoanalyst::data::{clean, load_table};
use autoanalyst::detect::ProblemType;
use autoanalyst::training::FailurePolicy;
use polars::prelude::*;
use std::io::Write;

/// 100 rows of {age: integer, city: string, label: 0/1} with a learnable
/// relation between features and label
fn people_frame() -> DataFrame {
    let n = 100;
    let mut age = Vec::with_capacity(n);
    let mut city = Vec::with_capacity(n);
    let mut label = Vec::with_capacity(n);

    for i in 0..n {
        let a = 18 + (i * 37) % 50;
        let c = match i % 4 {
            0 => "paris",
            1 => "lyon",
            2 => "brest",
            _ => "nice",
        };
        age.push(a as i64);
        city.push(c);
        label.push((a > 42) as i64);
    }

    df!(
        "age" => &age,
        "city" => &city,
        "label" => &label
    )
    .unwrap()
}

#[test]
fn test_classification_end_to_end() {
    let df = people_frame();
    let agent = AnalystAgent::default();
    let result = agent.run(&df, "label").unwrap();

    assert_eq!(result.problem_type, ProblemType::Classification);

    let names: Vec<&str> = result
        .leaderboard
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "LogisticRegression",
            "RandomForestClassifier",
            "GradientBoostingClassifier"
        ]
    );

    for score in &result.leaderboard {
        assert!(
            score.metrics.contains_key("F1_weighted"),
            "{} is missing F1_weighted",
            score.name
        );
    }

    // Best maximizes the selection metric; ties keep the first-trained model
    let best_f1 = result.best_metrics()["F1_weighted"];
    for score in &result.leaderboard {
        assert!(best_f1 >= score.metrics["F1_weighted"]);
    }
    assert!(names.contains(&result.best_model_name()));
}

#[test]
fn test_regression_end_to_end() {
    let df = people_frame();
    let agent = AnalystAgent::default();
    let result = agent.run(&df, "age").unwrap();

    assert_eq!(result.problem_type, ProblemType::Regression);

    let names: Vec<&str> = result
        .leaderboard
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "LinearRegression",
            "Ridge",
            "Lasso",
            "RandomForestRegressor",
            "GradientBoostingRegressor"
        ]
    );

    for score in &result.leaderboard {
        assert!(score.metrics.contains_key("RMSE"));
        assert!(score.metrics.contains_key("R2"));
    }

    let best_r2 = result.best_metrics()["R2"];
    for score in &result.leaderboard {
        assert!(best_r2 >= score.metrics["R2"]);
    }
}

#[test]
fn test_binary_target_gets_roc_auc() {
    let df = people_frame();
    let result = AnalystAgent::default().run(&df, "label").unwrap();

    // All roster classifiers expose probabilities, so the binary target
    // yields ROC_AUC everywhere
    for score in &result.leaderboard {
        assert!(
            score.metrics.contains_key("ROC_AUC"),
            "{} is missing ROC_AUC",
            score.name
        );
        let auc = score.metrics["ROC_AUC"];
        assert!((0.0..=1.0).contains(&auc));
    }
}

#[test]
fn test_multiclass_target_omits_roc_auc() {
    let n = 90;
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let noise: Vec<f64> = (0..n).map(|i| (i as f64 * 0.7).sin()).collect();
    let group: Vec<i64> = (0..n).map(|i| (i / 30) as i64).collect();
    let df = df!("x" => &x, "noise" => &noise, "group" => &group).unwrap();

    let result = AnalystAgent::default().run(&df, "group").unwrap();
    assert_eq!(result.problem_type, ProblemType::Classification);
    for score in &result.leaderboard {
        assert!(score.metrics.contains_key("F1_weighted"));
        assert!(!score.metrics.contains_key("ROC_AUC"));
    }
}

#[test]
fn test_csv_to_result() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "  size ,kind,price").unwrap();
    for i in 0..60 {
        let size = 20 + (i * 13) % 80;
        let kind = if i % 2 == 0 { "flat" } else { "house" };
        let price = size * 1000 + if i % 2 == 0 { 0 } else { 15000 };
        writeln!(file, "{size},{kind},{price}").unwrap();
    }

    let df = load_table(file.path()).unwrap();
    let df = clean(&df).unwrap();
    // Header whitespace is gone after cleaning
    assert!(df.column("size").is_ok());

    let result = AnalystAgent::default().run(&df, "price").unwrap();
    assert_eq!(result.problem_type, ProblemType::Regression);
    assert_eq!(result.leaderboard.len(), 5);

    // Price is a clean linear function of size and kind; the best model
    // should capture most of the variance
    assert!(result.best_metrics()["R2"] > 0.8);
}

#[test]
fn test_unseen_category_in_test_split_is_tolerated() {
    // One category appears exactly once; wherever the split puts it, the
    // run must not fail
    let n = 50;
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let city: Vec<String> = (0..n)
        .map(|i| {
            if i == 17 {
                "only_once".to_string()
            } else {
                format!("common_{}", i % 3)
            }
        })
        .collect();
    let y: Vec<f64> = (0..n).map(|i| i as f64 * 2.0 + 1.0).collect();
    let df = df!("x" => &x, "city" => &city, "y" => &y).unwrap();

    let result = AnalystAgent::default().run(&df, "y").unwrap();
    assert_eq!(result.leaderboard.len(), 5);
}

#[test]
fn test_failure_policy_abort_vs_skip() {
    // A single-class target is unfittable for the logistic and boosted
    // candidates but fine for the forest (every tree is one leaf)
    let n = 40;
    let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let y: Vec<i64> = vec![1; n];
    let df = df!("x" => &x, "y" => &y).unwrap();

    // Abort: the run dies on the first failing candidate
    let config = AgentConfig {
        failure_policy: FailurePolicy::Abort,
        ..AgentConfig::default()
    };
    assert!(AnalystAgent::new(config).run(&df, "y").is_err());

    // Skip: failing candidates are dropped, the survivor wins
    let config = AgentConfig {
        failure_policy: FailurePolicy::Skip,
        ..AgentConfig::default()
    };
    let result = AnalystAgent::new(config).run(&df, "y").unwrap();
    let names: Vec<&str> = result
        .leaderboard
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, vec!["RandomForestClassifier"]);
    assert_eq!(result.best_model_name(), "RandomForestClassifier");
}

#[test]
fn test_overview_reports_missing_values() {
    let df = df!(
        "a" => &[Some(1.0f64), None, Some(3.0), Some(4.0), None, Some(6.0)],
        "b" => &[Some("x"), Some("y"), None, Some("x"), Some("y"), Some("x")],
        "y" => &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]
    )
    .unwrap();

    let overview = autoanalyst::profiling::profile_overview(&df).unwrap();
    assert_eq!(overview.missing.len(), 2);
    assert_eq!(overview.missing[0].column, "a");
    assert_eq!(overview.missing[0].count, 2);
}

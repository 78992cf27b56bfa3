//! Command-line interface: load a table, run the pipeline, print the result

use clap::Parser;
use colored::*;
use std::path::PathBuf;

use crate::agent::{AgentConfig, AnalystAgent};
use crate::data::load_table;
use crate::training::FailurePolicy;

#[derive(Parser)]
#[command(name = "autoanalyst")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Profile a tabular dataset, train a model roster, report the best")]
pub struct Cli {
    /// Input data file (CSV, TSV, JSON, Parquet, or XLSX)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Target column name
    #[arg(short, long)]
    pub target: String,

    /// Free-text goal recorded in the run plan
    #[arg(short, long, default_value = "Find the best model and explain key drivers.")]
    pub goal: String,

    /// Distinct-value cutoff for treating numeric targets as classes
    #[arg(long, default_value = "10")]
    pub max_classes: usize,

    /// Held-out fraction for scoring
    #[arg(long, default_value = "0.2")]
    pub test_fraction: f64,

    /// Random seed for the train/test shuffle
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Skip candidates that fail instead of aborting the run
    #[arg(long)]
    pub skip_failures: bool,

    /// Write the full run result as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let df = load_table(&cli.data)?;

    let config = AgentConfig {
        goal: cli.goal.clone(),
        max_numeric_classes: cli.max_classes,
        test_fraction: cli.test_fraction,
        seed: cli.seed,
        failure_policy: if cli.skip_failures {
            FailurePolicy::Skip
        } else {
            FailurePolicy::Abort
        },
    };

    let agent = AnalystAgent::new(config);
    let result = agent.run(&df, &cli.target)?;

    println!();
    println!(
        "  {} {}",
        "dataset".dimmed(),
        format!("{} rows x {} cols", result.overview.rows, result.overview.cols).white()
    );
    println!(
        "  {} {}",
        "problem".dimmed(),
        result.problem_type.to_string().white()
    );
    println!();

    for score in &result.leaderboard {
        let marker = if score.name == result.best_model_name() {
            "*".green()
        } else {
            " ".normal()
        };
        let mut parts: Vec<(&String, &f64)> = score.metrics.iter().collect();
        parts.sort_by(|a, b| a.0.cmp(b.0));
        let rendered: Vec<String> = parts
            .iter()
            .map(|(name, value)| format!("{name}={value:.4}"))
            .collect();
        println!(
            "  {} {:<28} {}",
            marker,
            score.name,
            rendered.join("  ").dimmed()
        );
    }

    println!();
    println!(
        "  {} {}",
        "best".dimmed(),
        result.best_model_name().green().bold()
    );

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json)?;
        println!("  {} {}", "saved".dimmed(), path.display());
    }

    Ok(())
}

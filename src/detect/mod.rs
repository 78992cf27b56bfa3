//! Problem-type detection for a (dataset, target) pair

use crate::error::{AnalystError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of supervised task implied by the target column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemType {
    Regression,
    Classification,
}

impl std::fmt::Display for ProblemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemType::Regression => write!(f, "regression"),
            ProblemType::Classification => write!(f, "classification"),
        }
    }
}

/// Inspects the target column to decide regression vs classification.
///
/// Numeric targets with at most `max_numeric_classes` distinct non-null
/// values are treated as classification (0/1 flags, small ordinal scales);
/// numeric targets above that are regression. Non-numeric targets are always
/// classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemTypeDetector {
    /// Distinct-value cutoff for low-cardinality numeric targets
    pub max_numeric_classes: usize,
}

impl Default for ProblemTypeDetector {
    fn default() -> Self {
        Self {
            max_numeric_classes: 10,
        }
    }
}

impl ProblemTypeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_numeric_classes(mut self, max: usize) -> Self {
        self.max_numeric_classes = max;
        self
    }

    /// Decide the problem type for `target` in `df`.
    pub fn detect(&self, df: &DataFrame, target: &str) -> Result<ProblemType> {
        let column = df
            .column(target)
            .map_err(|_| AnalystError::ColumnNotFound(target.to_string()))?;

        if !is_numeric_dtype(column.dtype()) {
            return Ok(ProblemType::Classification);
        }

        let distinct = column.as_materialized_series().n_unique()?;
        // n_unique counts the null bucket; distinct values are non-null only
        let distinct = if column.null_count() > 0 {
            distinct.saturating_sub(1)
        } else {
            distinct
        };

        if distinct <= self.max_numeric_classes {
            Ok(ProblemType::Classification)
        } else {
            Ok(ProblemType::Regression)
        }
    }
}

/// Whether a dtype counts as numeric for detection and feature partitioning.
/// Booleans, strings, and temporal types do not.
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

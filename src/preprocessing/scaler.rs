//! Standardization of numeric columns

use crate::error::{AnalystError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Training statistics for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScaleParams {
    mean: f64,
    std: f64,
}

/// Z-score scaler over a set of named numeric columns.
///
/// `fit` records each column's training mean and standard deviation;
/// `column_values` maps a column of any split through those statistics.
/// Zero-variance columns scale with divisor 1, and nulls land on the
/// training mean (0 after scaling).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: HashMap<String, ScaleParams>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record mean/std of each named column from training data.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for name in columns {
            let column = df
                .column(name)
                .map_err(|_| AnalystError::ColumnNotFound(name.clone()))?;
            let casted = column
                .cast(&DataType::Float64)
                .map_err(|e| AnalystError::PreprocessingError(e.to_string()))?;
            let ca = casted
                .f64()
                .map_err(|e| AnalystError::PreprocessingError(e.to_string()))?;

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(1).unwrap_or(0.0);
            self.params.insert(
                name.clone(),
                ScaleParams {
                    mean,
                    std: if std == 0.0 { 1.0 } else { std },
                },
            );
        }
        Ok(self)
    }

    /// Standardized values of one column. Requires a prior `fit` covering it.
    pub fn column_values(&self, df: &DataFrame, name: &str) -> Result<Vec<f64>> {
        let params = self
            .params
            .get(name)
            .ok_or(AnalystError::ModelNotFitted)?;

        let column = df
            .column(name)
            .map_err(|_| AnalystError::ColumnNotFound(name.to_string()))?;
        let casted = column
            .cast(&DataType::Float64)
            .map_err(|e| AnalystError::PreprocessingError(e.to_string()))?;
        let ca = casted
            .f64()
            .map_err(|e| AnalystError::PreprocessingError(e.to_string()))?;

        Ok(ca
            .into_iter()
            .map(|opt| (opt.unwrap_or(params.mean) - params.mean) / params.std)
            .collect())
    }

    /// Columns this scaler was fit on
    pub fn is_fitted_for(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }
}

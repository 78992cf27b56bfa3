//! Column-wise preprocessing pipeline: schema partition, fit-once, matrix out

use super::{OneHotEncoder, StandardScaler};
use crate::detect::is_numeric_dtype;
use crate::error::{AnalystError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// The fit-once, apply-many transformation turning raw feature columns into
/// a numeric matrix.
///
/// Numeric columns (by dtype) are standardized with training statistics;
/// every other column is one-hot encoded with its training category set.
/// A branch with no columns is simply absent. Apply never re-fits: held-out
/// rows see training means/stds and training categories only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    numeric_columns: Vec<String>,
    categorical_columns: Vec<String>,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl FeaturePreprocessor {
    /// Partition the feature columns of `df` by dtype and fit both branches.
    pub fn fit(df: &DataFrame) -> Result<Self> {
        let mut numeric_columns = Vec::new();
        let mut categorical_columns = Vec::new();

        for col in df.get_columns() {
            let name = col.name().to_string();
            if is_numeric_dtype(col.dtype()) {
                numeric_columns.push(name);
            } else {
                categorical_columns.push(name);
            }
        }

        let mut scaler = StandardScaler::new();
        scaler.fit(df, &numeric_columns)?;

        let mut encoder = OneHotEncoder::new();
        encoder.fit(df, &categorical_columns)?;

        Ok(Self {
            numeric_columns,
            categorical_columns,
            scaler,
            encoder,
        })
    }

    /// Transform a split into a row-major feature matrix.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let n_rows = df.height();

        // Collect each output column as a contiguous Vec, then assemble
        let mut out_columns: Vec<Vec<f64>> = Vec::new();

        for name in &self.numeric_columns {
            out_columns.push(self.scaler.column_values(df, name)?);
        }

        for name in &self.categorical_columns {
            let n_cats = self
                .encoder
                .categories(name)
                .ok_or(AnalystError::ModelNotFitted)?
                .len();
            let rows = self.encoder.column_indicators(df, name)?;
            for j in 0..n_cats {
                out_columns.push(rows.iter().map(|r| r[j]).collect());
            }
        }

        let n_cols = out_columns.len();
        if n_cols == 0 {
            return Err(AnalystError::PreprocessingError(
                "no feature columns to transform".to_string(),
            ));
        }

        Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
            out_columns[c][r]
        }))
    }

    /// Names of the output matrix columns: numeric names first, then one
    /// `col=category` entry per indicator.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric_columns.clone();
        for col in &self.categorical_columns {
            if let Some(cats) = self.encoder.categories(col) {
                for cat in cats {
                    names.push(format!("{col}={cat}"));
                }
            }
        }
        names
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("age".into(), &[20i64, 30, 40, 50]),
            Column::new("city".into(), &["a", "b", "a", "b"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_partition() {
        let pre = FeaturePreprocessor::fit(&mixed_frame()).unwrap();
        assert_eq!(pre.numeric_columns(), &["age".to_string()]);
        assert_eq!(pre.categorical_columns(), &["city".to_string()]);
    }

    #[test]
    fn test_matrix_shape_and_names() {
        let df = mixed_frame();
        let pre = FeaturePreprocessor::fit(&df).unwrap();
        let x = pre.transform(&df).unwrap();
        assert_eq!(x.nrows(), 4);
        assert_eq!(x.ncols(), 3); // age + city=a + city=b
        assert_eq!(
            pre.feature_names(),
            vec!["age".to_string(), "city=a".to_string(), "city=b".to_string()]
        );
    }

    #[test]
    fn test_unseen_category_round_trip() {
        let train = mixed_frame();
        let test = DataFrame::new(vec![
            Column::new("age".into(), &[35i64]),
            Column::new("city".into(), &["nowhere"]),
        ])
        .unwrap();

        let pre = FeaturePreprocessor::fit(&train).unwrap();
        let x = pre.transform(&test).unwrap();
        // Indicator block is defined and all-zero, not an error
        assert_eq!(x[[0, 1]], 0.0);
        assert_eq!(x[[0, 2]], 0.0);
    }

    #[test]
    fn test_all_numeric_omits_categorical_branch() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[1.0f64, 2.0]),
            Column::new("b".into(), &[3.0f64, 4.0]),
        ])
        .unwrap();
        let pre = FeaturePreprocessor::fit(&df).unwrap();
        assert!(pre.categorical_columns().is_empty());
        assert_eq!(pre.transform(&df).unwrap().ncols(), 2);
    }

    #[test]
    fn test_all_categorical_omits_numeric_branch() {
        let df = DataFrame::new(vec![Column::new("c".into(), &["x", "y", "x"])]).unwrap();
        let pre = FeaturePreprocessor::fit(&df).unwrap();
        assert!(pre.numeric_columns().is_empty());
        assert_eq!(pre.transform(&df).unwrap().ncols(), 2);
    }
}

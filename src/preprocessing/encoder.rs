//! One-hot encoding of categorical columns

use crate::error::{AnalystError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One-hot encoder over a set of named categorical columns.
///
/// The category list of each column is frozen at fit time (sorted, so the
/// indicator layout is deterministic). Values unseen during fit, and nulls,
/// encode as an all-zero indicator block rather than failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: HashMap<String, Vec<String>>,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the distinct categories of each named column.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for name in columns {
            let values = string_values(df, name)?;
            let mut cats: Vec<String> = values.into_iter().flatten().collect();
            cats.sort();
            cats.dedup();
            self.categories.insert(name.clone(), cats);
        }
        Ok(self)
    }

    /// Categories recorded for a column, in indicator order.
    pub fn categories(&self, name: &str) -> Option<&[String]> {
        self.categories.get(name).map(|c| c.as_slice())
    }

    /// Indicator rows for one column: each row is a vector with a single 1.0
    /// at its category's position, or all zeros for unseen/missing values.
    pub fn column_indicators(&self, df: &DataFrame, name: &str) -> Result<Vec<Vec<f64>>> {
        let cats = self
            .categories
            .get(name)
            .ok_or(AnalystError::ModelNotFitted)?;

        let values = string_values(df, name)?;
        Ok(values
            .into_iter()
            .map(|opt| {
                let mut row = vec![0.0; cats.len()];
                if let Some(v) = opt {
                    if let Ok(idx) = cats.binary_search(&v) {
                        row[idx] = 1.0;
                    }
                }
                row
            })
            .collect())
    }
}

/// Stringified values of a column; bools, dates, and anything else that lands
/// on the categorical side are encoded through their string form.
fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| AnalystError::ColumnNotFound(name.to_string()))?;
    let casted = column
        .cast(&DataType::String)
        .map_err(|e| AnalystError::PreprocessingError(e.to_string()))?;
    let ca = casted
        .as_materialized_series()
        .str()
        .map_err(|e| AnalystError::PreprocessingError(e.to_string()))?;

    Ok(ca
        .into_iter()
        .map(|opt| opt.map(|s| s.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_sorted_and_deduped() {
        let df = DataFrame::new(vec![Column::new(
            "city".into(),
            &["Lyon", "Paris", "Lyon", "Brest"],
        )])
        .unwrap();

        let mut encoder = OneHotEncoder::new();
        encoder.fit(&df, &["city".to_string()]).unwrap();
        assert_eq!(
            encoder.categories("city").unwrap(),
            &["Brest".to_string(), "Lyon".to_string(), "Paris".to_string()]
        );
    }

    #[test]
    fn test_indicator_rows() {
        let df = DataFrame::new(vec![Column::new("c".into(), &["a", "b", "a"])]).unwrap();
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&df, &["c".to_string()]).unwrap();

        let rows = encoder.column_indicators(&df, "c").unwrap();
        assert_eq!(rows[0], vec![1.0, 0.0]);
        assert_eq!(rows[1], vec![0.0, 1.0]);
        assert_eq!(rows[2], vec![1.0, 0.0]);
    }

    #[test]
    fn test_unseen_category_encodes_as_zeros() {
        let train = DataFrame::new(vec![Column::new("c".into(), &["a", "b"])]).unwrap();
        let apply = DataFrame::new(vec![Column::new("c".into(), &["z"])]).unwrap();

        let mut encoder = OneHotEncoder::new();
        encoder.fit(&train, &["c".to_string()]).unwrap();
        let rows = encoder.column_indicators(&apply, "c").unwrap();
        assert_eq!(rows[0], vec![0.0, 0.0]);
    }

    #[test]
    fn test_null_encodes_as_zeros() {
        let train = DataFrame::new(vec![Column::new("c".into(), &["a", "b"])]).unwrap();
        let apply =
            DataFrame::new(vec![Column::new("c".into(), &[Some("a"), None])]).unwrap();

        let mut encoder = OneHotEncoder::new();
        encoder.fit(&train, &["c".to_string()]).unwrap();
        let rows = encoder.column_indicators(&apply, "c").unwrap();
        assert_eq!(rows[1], vec![0.0, 0.0]);
    }
}

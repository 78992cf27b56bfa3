//! Dataset profiling: shape, column types, missing-value summary

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-column dtype entry, in dataset column order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDtype {
    pub name: String,
    pub dtype: String,
}

/// Missing-value record for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissingStat {
    pub column: String,
    /// Number of null entries
    pub count: usize,
    /// count / row count
    pub fraction: f64,
}

/// Overview of a dataset produced by [`profile_overview`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub rows: usize,
    pub cols: usize,
    pub dtypes: Vec<ColumnDtype>,
    /// Columns with at least one missing value, by descending count.
    /// Empty when the dataset has no missing values at all.
    pub missing: Vec<MissingStat>,
}

/// Profile a dataset: row/column counts, per-column dtype names, and a
/// missing-value report covering every column with at least one null,
/// ordered by descending null count. Pure; the input is not touched.
pub fn profile_overview(df: &DataFrame) -> Result<DatasetOverview> {
    let rows = df.height();
    let cols = df.width();

    let dtypes: Vec<ColumnDtype> = df
        .get_columns()
        .iter()
        .map(|col| ColumnDtype {
            name: col.name().to_string(),
            dtype: col.dtype().to_string(),
        })
        .collect();

    let mut missing: Vec<MissingStat> = df
        .get_columns()
        .iter()
        .filter(|col| col.null_count() > 0)
        .map(|col| MissingStat {
            column: col.name().to_string(),
            count: col.null_count(),
            fraction: col.null_count() as f64 / rows.max(1) as f64,
        })
        .collect();

    // Stable sort keeps column order among equal counts
    missing.sort_by(|a, b| b.count.cmp(&a.count));

    Ok(DatasetOverview {
        rows,
        cols,
        dtypes,
        missing,
    })
}

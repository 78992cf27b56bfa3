//! Basic dataset cleaning: trimmed column names, no duplicate rows

use crate::error::Result;
use polars::prelude::*;

/// Clean a dataset: strip surrounding whitespace from column names and drop
/// exact-duplicate rows (first occurrence wins, row order preserved).
///
/// Returns a new DataFrame; the input is left untouched. Applying `clean`
/// to its own output is a no-op.
pub fn clean(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();

    let renames: Vec<(String, String)> = out
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| name.trim() != name.as_str())
        .map(|name| {
            let trimmed = name.trim().to_string();
            (name, trimmed)
        })
        .collect();

    for (old, new) in renames {
        out.rename(&old, new.into())?;
    }

    if out.height() == 0 {
        return Ok(out);
    }

    let out = out.unique_stable(None, UniqueKeepStrategy::First, None)?;
    Ok(out)
}

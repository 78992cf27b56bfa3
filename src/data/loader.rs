//! Table loading for the formats users actually upload

use crate::error::{AnalystError, Result};
use calamine::{open_workbook_auto, DataType as CellValue, Reader};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Load a tabular file into a DataFrame, dispatching on extension.
///
/// CSV/TSV, JSON, and Parquet go through polars with inferred schemas;
/// XLSX/XLS sheets are read cell-by-cell. Unknown extensions are attempted
/// as CSV.
pub fn load_table(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => load_delimited(path, b','),
        "tsv" => load_delimited(path, b'\t'),
        "json" | "jsonl" => {
            let file = open(path)?;
            JsonReader::new(file)
                .finish()
                .map_err(|e| AnalystError::LoadError(e.to_string()))
        }
        "parquet" | "pq" => {
            let file = open(path)?;
            ParquetReader::new(file)
                .finish()
                .map_err(|e| AnalystError::LoadError(e.to_string()))
        }
        "xlsx" | "xls" => load_spreadsheet(path),
        _ => load_delimited(path, b','),
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| AnalystError::LoadError(format!("{}: {e}", path.display())))
}

fn load_delimited(path: &Path, separator: u8) -> Result<DataFrame> {
    let file = open(path)?;

    let parse_opts = CsvParseOptions::default().with_separator(separator);
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .with_parse_options(parse_opts)
        .into_reader_with_file_handle(file)
        .finish()
        .map_err(|e| AnalystError::LoadError(e.to_string()))
}

/// Read the first worksheet of an Excel workbook.
///
/// A column becomes Float64 when every non-empty cell is numeric (bools count
/// as 0/1), otherwise String. Empty cells become nulls either way.
fn load_spreadsheet(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AnalystError::LoadError(format!("{}: {e}", path.display())))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalystError::LoadError("workbook has no sheets".to_string()))?
        .map_err(|e| AnalystError::LoadError(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| AnalystError::LoadError("sheet is empty".to_string()))?;

    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell.as_string().unwrap_or_default();
            if name.is_empty() {
                format!("column_{i}")
            } else {
                name
            }
        })
        .collect();

    let body: Vec<&[CellValue]> = rows.collect();

    let columns: Vec<Column> = names
        .iter()
        .enumerate()
        .map(|(col_idx, name)| {
            let cells = body.iter().map(|row| row.get(col_idx));

            let numeric = cells
                .clone()
                .all(|cell| cell.map_or(true, |c| c.is_empty() || c.as_f64().is_some()));

            if numeric {
                let values: Vec<Option<f64>> = cells
                    .map(|cell| cell.and_then(|c| c.as_f64()))
                    .collect();
                Column::new(name.as_str().into(), values)
            } else {
                let values: Vec<Option<String>> = cells
                    .map(|cell| {
                        cell.and_then(|c| if c.is_empty() { None } else { c.as_string() })
                    })
                    .collect();
                Column::new(name.as_str().into(), values)
            }
        })
        .collect();

    DataFrame::new(columns).map_err(|e| AnalystError::LoadError(e.to_string()))
}

//! Ingestion - raw tables with unknown column layouts
//!
//! A raw table is a plain polars `DataFrame`. Nothing here assumes column
//! names or dtypes; the schema layer decides what the columns mean.

pub mod csv_loader;
pub mod station_map;

pub use csv_loader::{load_csv, load_csv_str, read_csv, LoadReport};
pub use station_map::StationStateMap;

use crate::error::Result;
use polars::prelude::*;

/// Raw tabular input of unspecified layout.
pub type RawTable = DataFrame;

/// Column names in frame order.
pub fn column_names(df: &RawTable) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Read any column as optional strings, whatever its dtype.
pub fn column_strings(df: &RawTable, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?;
    let as_str = series.cast(&DataType::String)?;
    let values = as_str
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

/// True when the column is stored with an integer dtype.
pub fn is_integer_column(df: &RawTable, name: &str) -> bool {
    match df.column(name) {
        Ok(series) => matches!(
            series.dtype(),
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        ),
        Err(_) => false,
    }
}

/// Build a string-typed frame from column-major cells.
pub fn frame_from_columns(
    headers: &[String],
    columns: Vec<Vec<Option<String>>>,
) -> Result<RawTable> {
    let series: Vec<Series> = headers
        .iter()
        .zip(columns)
        .map(|(name, values)| Series::new(name, values))
        .collect();
    Ok(DataFrame::new(series)?)
}

/// Trim header names and suffix repeats (`name`, `name.1`, `name.2`).
pub fn dedupe_headers<I, S>(headers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut out = Vec::new();
    for raw in headers {
        let base = raw.as_ref().trim().to_string();
        let base = if base.is_empty() { "unnamed".to_string() } else { base };
        let count = seen.entry(base.clone()).or_insert(0);
        let name = if *count == 0 {
            base.clone()
        } else {
            format!("{}.{}", base, count)
        };
        *count += 1;
        out.push(name);
    }
    out
}

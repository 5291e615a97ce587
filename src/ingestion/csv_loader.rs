//! CSV Loader - tolerant reader for messy delimited files
//!
//! Every column comes back as `String`; the normalizers coerce values.
//! Malformed records are skipped rather than failing the load.

use super::{dedupe_headers, frame_from_columns, RawTable};
use crate::error::{QaError, Result};
use csv::ReaderBuilder;
use polars::prelude::DataFrame;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// What happened while reading one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

/// Load a CSV file; any unrecoverable failure yields an empty table.
pub fn load_csv(path: &Path) -> RawTable {
    match read_csv(path) {
        Ok((df, report)) => {
            debug!(
                "Loaded {} ({} rows, {} skipped)",
                path.display(),
                report.rows_loaded,
                report.rows_skipped
            );
            df
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            DataFrame::empty()
        }
    }
}

/// Strict variant of [`load_csv`] for callers that want to see the failure.
pub fn read_csv(path: &Path) -> Result<(RawTable, LoadReport)> {
    let file = std::fs::File::open(path)
        .map_err(|e| QaError::Load(format!("could not open {}: {}", path.display(), e)))?;
    read_frame(file)
}

/// Same as [`load_csv`] for in-memory text.
pub fn load_csv_str(text: &str) -> RawTable {
    match read_frame(text.as_bytes()) {
        Ok((df, _)) => df,
        Err(e) => {
            warn!("Failed to parse CSV text: {}", e);
            DataFrame::empty()
        }
    }
}

pub(crate) fn read_frame<R: Read>(reader: R) -> Result<(RawTable, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = dedupe_headers(rdr.headers()?.iter());
    if headers.is_empty() {
        return Ok((DataFrame::empty(), LoadReport::default()));
    }

    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    let mut report = LoadReport::default();

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("Skipping unreadable record: {}", e);
                report.rows_skipped += 1;
                continue;
            }
        };
        if record.len() > headers.len() {
            report.rows_skipped += 1;
            continue;
        }
        // blank lines come through as a single empty field
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        for (idx, column) in columns.iter_mut().enumerate() {
            let cell = record.get(idx).map(str::trim).unwrap_or("");
            column.push(if cell.is_empty() { None } else { Some(cell.to_string()) });
        }
        report.rows_loaded += 1;
    }

    if report.rows_skipped > 0 {
        warn!("Skipped {} malformed rows", report.rows_skipped);
    }

    Ok((frame_from_columns(&headers, columns)?, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::column_strings;
    use std::io::Write;

    #[test]
    fn test_skips_rows_with_extra_fields() {
        let text = "state,year,production\nKarnataka,2019,100\nKarnataka,2020,150,oops\nKerala,2020\n";
        let (df, report) = read_frame(text.as_bytes()).unwrap();

        assert_eq!(report.rows_loaded, 2);
        assert_eq!(report.rows_skipped, 1);
        assert_eq!(df.height(), 2);
        let production = column_strings(&df, "production").unwrap();
        assert_eq!(production, vec![Some("100".to_string()), None]);
    }

    #[test]
    fn test_missing_file_is_empty_table() {
        let df = load_csv(Path::new("/definitely/not/here.csv"));
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 0);
        assert!(matches!(
            read_csv(Path::new("/definitely/not/here.csv")),
            Err(QaError::Load(_))
        ));
    }

    #[test]
    fn test_load_from_disk_trims_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rain.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, " state , rainfall_mm").unwrap();
        writeln!(file, " Tamil Nadu , 812.4 ").unwrap();
        drop(file);

        let df = load_csv(&path);
        assert_eq!(df.get_column_names(), vec!["state", "rainfall_mm"]);
        assert_eq!(
            column_strings(&df, "state").unwrap(),
            vec![Some("Tamil Nadu".to_string())]
        );
    }
}

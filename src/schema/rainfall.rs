//! Rainfall normalizer
//!
//! Two source shapes are accepted:
//! - long form, one row per observation with an explicit rainfall column
//! - wide form, one `actual_rainfall_in_<station>_in_mm` column per station,
//!   reshaped to (station, period) pairs and averaged to one row per
//!   (state, year)

use super::keywords::{
    clean_header, first_text, is_station_column, mean_numbers, normalize_state, normalize_text,
    parse_number, parse_year, rainfall_field, read_columns,
};
use super::records::RainfallRecord;
use super::year::{extract_years, period_column};
use super::{CanonicalTable, ColumnMapping};
use crate::frames::melt_station_means;
use crate::ingestion::{column_names, RawTable, StationStateMap};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

pub const RAINFALL_SOURCE: &str = "rainfall";

lazy_static! {
    static ref STATION_PREFIX: Regex = Regex::new(r"(?i)actual_rainfall_in_").unwrap();
    static ref STATION_SUFFIX: Regex = Regex::new(r"(?i)_in_mm").unwrap();
}

/// Normalize with the built-in station list only.
pub fn normalize_rainfall(raw: &RawTable) -> CanonicalTable<RainfallRecord> {
    normalize_rainfall_with(raw, &StationStateMap::new())
}

/// Normalize using an external station → state table for wide layouts.
pub fn normalize_rainfall_with(
    raw: &RawTable,
    stations: &StationStateMap,
) -> CanonicalTable<RainfallRecord> {
    let names = column_names(raw);
    let station_cols: Vec<String> = names
        .iter()
        .filter(|n| is_station_column(n))
        .cloned()
        .collect();

    if station_cols.is_empty() {
        normalize_long(raw, &names)
    } else {
        info!("Wide rainfall layout detected ({} station columns)", station_cols.len());
        normalize_wide(raw, &names, &station_cols, stations)
    }
}

/// `actual_rainfall_in_karur_in_mm` → `karur`
pub fn station_name(column: &str) -> String {
    let stripped = STATION_PREFIX.replace_all(column, "");
    let stripped = STATION_SUFFIX.replace_all(&stripped, "");
    stripped.replace('_', " ").trim().to_string()
}

/// Years for each raw row, mined from id columns when no explicit year exists.
fn row_years(raw: &RawTable, id_cols: &[String], mapping: &mut ColumnMapping) -> Vec<Option<i32>> {
    let id_values = read_columns(raw, id_cols);

    if let Some(idx) = id_cols
        .iter()
        .position(|n| matches!(clean_header(n).as_str(), "year" | "yyyy"))
    {
        mapping.insert("year".to_string(), vec![id_cols[idx].clone()]);
        return id_values[idx]
            .iter()
            .map(|v| parse_year(v.as_deref()))
            .collect();
    }

    if let Some(idx) = period_column(id_cols) {
        if let Some(years) = extract_years(&id_values[idx]) {
            mapping.insert("year".to_string(), vec![id_cols[idx].clone()]);
            return years;
        }
    }

    for (name, values) in id_cols.iter().zip(&id_values) {
        if let Some(years) = extract_years(values) {
            debug!("Extracted years from fallback column '{}'", name);
            mapping.insert("year".to_string(), vec![name.clone()]);
            return years;
        }
    }

    vec![None; raw.height()]
}

fn normalize_wide(
    raw: &RawTable,
    names: &[String],
    station_cols: &[String],
    stations: &StationStateMap,
) -> CanonicalTable<RainfallRecord> {
    let id_cols: Vec<String> = names
        .iter()
        .filter(|n| !station_cols.contains(n))
        .cloned()
        .collect();

    let mut mapping = ColumnMapping::new();
    mapping.insert("rainfall_mm".to_string(), station_cols.to_vec());
    let years = row_years(raw, &id_cols, &mut mapping);

    let station_states: Vec<String> = station_cols
        .iter()
        .map(|c| normalize_state(Some(stations.attribute(&station_name(c)).as_str())))
        .collect();
    let readings: Vec<(String, Vec<Option<f64>>)> = station_cols
        .iter()
        .zip(read_columns(raw, station_cols))
        .map(|(name, cells)| {
            let values = cells.iter().map(|c| parse_number(c.as_deref())).collect();
            (name.clone(), values)
        })
        .collect();

    let records: Vec<RainfallRecord> = match melt_station_means(years, &readings, &station_states) {
        Ok(means) => means
            .into_iter()
            .map(|(state, year, rainfall_mm)| RainfallRecord {
                state,
                district: None,
                year: Some(year),
                month: None,
                rainfall_mm,
            })
            .collect(),
        Err(e) => {
            warn!("Wide rainfall aggregation failed: {}", e);
            Vec::new()
        }
    };

    info!("Aggregated wide rainfall to {} state-year rows", records.len());
    CanonicalTable::new(RAINFALL_SOURCE, mapping, records)
}

fn normalize_long(raw: &RawTable, names: &[String]) -> CanonicalTable<RainfallRecord> {
    let mut mapping = ColumnMapping::new();
    for name in names {
        let header = clean_header(name);
        match rainfall_field(&header) {
            Some(field) => mapping.entry(field.to_string()).or_default().push(name.clone()),
            // unmapped rain-like columns still feed the row-wise mean
            None if header.contains("rain") => mapping
                .entry("rainfall_mm".to_string())
                .or_default()
                .push(name.clone()),
            None => {}
        }
    }

    let columns_for = |field: &str| match mapping.get(field) {
        Some(cols) => read_columns(raw, cols),
        None => Vec::new(),
    };
    let state = columns_for("state");
    let district = columns_for("district");
    let month = columns_for("month");
    let rainfall = columns_for("rainfall_mm");

    let years: Vec<Option<i32>> = if mapping.contains_key("year") {
        let year = columns_for("year");
        (0..raw.height())
            .map(|row| {
                year.iter()
                    .find_map(|c| parse_year(c.get(row).and_then(|v| v.as_deref())))
            })
            .collect()
    } else {
        row_years(raw, names, &mut mapping)
    };

    let records: Vec<RainfallRecord> = (0..raw.height())
        .map(|row| RainfallRecord {
            state: normalize_state(first_text(&state, row)),
            district: normalize_text(first_text(&district, row)),
            year: years[row],
            month: normalize_text(first_text(&month, row)),
            rainfall_mm: mean_numbers(&rainfall, row),
        })
        .collect();

    info!("Normalized {} long-form rainfall rows", records.len());
    CanonicalTable::new(RAINFALL_SOURCE, mapping, records)
}

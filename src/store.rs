//! Canonical store
//!
//! Loads and normalizes the two local datasets and resolves which snapshot a
//! query runs against. Nothing is cached here; callers that want reuse hold
//! on to the tables they were given.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::frames::left_join_state_year_mean;
use crate::ingestion::{load_csv, StationStateMap};
use crate::schema::{
    normalize_production, normalize_rainfall_with, CanonicalRecord, CanonicalTable, ColumnMapping,
    ProductionRecord, RainfallRecord,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Source label of the degenerate default dataset.
pub const DEGENERATE_SOURCE: &str = "degenerate://default";

/// Degenerate default dataset: a single production row, used ONLY when the
/// production file is missing or unreadable. Never mixed into real data.
pub fn degenerate_production() -> CanonicalTable<ProductionRecord> {
    CanonicalTable::new(
        DEGENERATE_SOURCE,
        ColumnMapping::new(),
        vec![ProductionRecord {
            state: "State_X".to_string(),
            district: Some("D1".to_string()),
            year: Some(2020),
            crop: "wheat".to_string(),
            season: None,
            production: Some(1000.0),
            area: None,
        }],
    )
}

/// Degenerate default dataset for rainfall; see [`degenerate_production`].
pub fn degenerate_rainfall() -> CanonicalTable<RainfallRecord> {
    CanonicalTable::new(
        DEGENERATE_SOURCE,
        ColumnMapping::new(),
        vec![RainfallRecord {
            state: "State_X".to_string(),
            district: None,
            year: Some(2020),
            month: None,
            rainfall_mm: Some(800.0),
        }],
    )
}

/// Which snapshot a query should run against.
#[derive(Debug)]
pub enum TableSource<'a, R> {
    /// Caller-held snapshot (e.g. a session cache)
    Provided(&'a CanonicalTable<R>),
    /// Load from the configured local files
    Default,
}

impl<R> Clone for TableSource<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for TableSource<'_, R> {}

impl<'a, R> From<&'a CanonicalTable<R>> for TableSource<'a, R> {
    fn from(table: &'a CanonicalTable<R>) -> Self {
        TableSource::Provided(table)
    }
}

impl<'a, R> From<Option<&'a CanonicalTable<R>>> for TableSource<'a, R> {
    fn from(table: Option<&'a CanonicalTable<R>>) -> Self {
        match table {
            Some(t) => TableSource::Provided(t),
            None => TableSource::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataStore {
    config: EngineConfig,
}

impl DataStore {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn station_map(&self) -> StationStateMap {
        StationStateMap::load(&self.config.station_map_path())
    }

    pub fn load_production(&self) -> CanonicalTable<ProductionRecord> {
        let path = self.config.production_path();
        let raw = load_csv(&path);
        if raw.height() == 0 {
            warn!(
                "Production data unavailable at {}; using degenerate default dataset",
                path.display()
            );
            return degenerate_production();
        }
        let table = normalize_production(&raw).with_source(self.config.production_source());
        info!("Loaded {} production rows from {}", table.len(), table.source);
        table
    }

    pub fn load_rainfall(&self) -> CanonicalTable<RainfallRecord> {
        let path = self.config.rainfall_path();
        let raw = load_csv(&path);
        if raw.height() == 0 {
            warn!(
                "Rainfall data unavailable at {}; using degenerate default dataset",
                path.display()
            );
            return degenerate_rainfall();
        }
        let table = normalize_rainfall_with(&raw, &self.station_map())
            .with_source(self.config.rainfall_source());
        info!("Loaded {} rainfall rows from {}", table.len(), table.source);
        table
    }

    /// Resolve once per query call.
    pub fn resolve_production<'a>(
        &self,
        source: TableSource<'a, ProductionRecord>,
    ) -> Cow<'a, CanonicalTable<ProductionRecord>> {
        match source {
            TableSource::Provided(table) => Cow::Borrowed(table),
            TableSource::Default => Cow::Owned(self.load_production()),
        }
    }

    pub fn resolve_rainfall<'a>(
        &self,
        source: TableSource<'a, RainfallRecord>,
    ) -> Cow<'a, CanonicalTable<RainfallRecord>> {
        match source {
            TableSource::Provided(table) => Cow::Borrowed(table),
            TableSource::Default => Cow::Owned(self.load_rainfall()),
        }
    }
}

/// Production row with the mean rainfall of its (state, year), if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRecord {
    #[serde(flatten)]
    pub production: ProductionRecord,
    pub rainfall_mm: Option<f64>,
}

/// Left join of production onto per-(state, year) mean rainfall.
pub fn join_production_rainfall(
    production: &CanonicalTable<ProductionRecord>,
    rainfall: &CanonicalTable<RainfallRecord>,
) -> Result<Vec<JoinedRecord>> {
    let left = (
        production.records.iter().map(|p| p.state.as_str()).collect(),
        production.records.iter().map(|p| p.year).collect(),
    );
    let right = (
        rainfall.records.iter().map(|r| r.state.as_str()).collect(),
        rainfall.records.iter().map(|r| r.year).collect(),
        rainfall.records.iter().map(|r| r.rainfall_mm).collect(),
    );
    let means = left_join_state_year_mean(left, right)?;

    Ok(production
        .records
        .iter()
        .zip(means)
        .map(|(p, rainfall_mm)| JoinedRecord {
            production: p.clone(),
            rainfall_mm,
        })
        .collect())
}

/// A provenance filter value on one canonical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    AnyOf(Vec<String>),
}

impl FilterValue {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else { return false };
        match self {
            FilterValue::One(v) => v == value,
            FilterValue::AnyOf(vs) => vs.iter().any(|v| v == value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRow {
    pub row_id: String,
    pub values: BTreeMap<String, Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

/// Rows backing a result, for display next to an answer.
///
/// Filters on columns the table does not have are ignored.
pub fn extract_provenance_rows<R: CanonicalRecord>(
    table: &CanonicalTable<R>,
    filters: &BTreeMap<String, FilterValue>,
    max_rows: usize,
    dataset_url: Option<&str>,
) -> Vec<ProvenanceRow> {
    let active: Vec<(usize, &FilterValue)> = filters
        .iter()
        .filter_map(|(column, value)| {
            R::COLUMNS
                .iter()
                .position(|c| *c == column.as_str())
                .map(|idx| (idx, value))
        })
        .collect();

    table
        .records
        .iter()
        .filter(|record| {
            let values = record.values();
            active
                .iter()
                .all(|(idx, filter)| filter.matches(values[*idx].as_deref()))
        })
        .take(max_rows)
        .map(|record| {
            let row_id = record.row_id();
            ProvenanceRow {
                permalink: dataset_url.map(|url| format!("{}#row={}", url, row_id)),
                values: R::COLUMNS
                    .iter()
                    .map(|c| c.to_string())
                    .zip(record.values())
                    .collect(),
                row_id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn production(state: &str, year: i32, crop: &str, tonnes: f64) -> ProductionRecord {
        ProductionRecord {
            state: state.to_string(),
            district: None,
            year: Some(year),
            crop: crop.to_string(),
            season: None,
            production: Some(tonnes),
            area: None,
        }
    }

    fn rainfall(state: &str, year: i32, mm: f64) -> RainfallRecord {
        RainfallRecord {
            state: state.to_string(),
            district: None,
            year: Some(year),
            month: None,
            rainfall_mm: Some(mm),
        }
    }

    #[test]
    fn test_missing_files_fall_back_to_degenerate_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(EngineConfig::default().with_data_dir(dir.path()));

        let prod = store.load_production();
        assert_eq!(prod.source, DEGENERATE_SOURCE);
        assert_eq!(prod.records, degenerate_production().records);
        assert_eq!(store.load_rainfall().source, DEGENERATE_SOURCE);
    }

    #[test]
    fn test_loads_and_labels_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normalized_rainfall_2018_19.csv");
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(
            file,
            "Month,actual_rainfall_in_karur_in_mm,actual_rainfall_in_shimoga_in_mm"
        )
        .unwrap();
        writeln!(file, "June'2018,10,40").unwrap();
        writeln!(file, "July'2018,30,x").unwrap();
        drop(file);
        let mut file = std::fs::File::create(dir.path().join("station_to_state.csv")).unwrap();
        writeln!(file, "station_substring,state").unwrap();
        writeln!(file, "shimoga,Karnataka").unwrap();
        drop(file);

        let store = DataStore::new(EngineConfig::default().with_data_dir(dir.path()));
        let rain = store.load_rainfall();

        assert_eq!(rain.source, "local://data/normalized_rainfall_2018_19.csv");
        assert_eq!(rain.len(), 2);
        let karnataka = rain.records.iter().find(|r| r.state == "Karnataka").unwrap();
        assert_eq!(karnataka.rainfall_mm, Some(40.0));
    }

    #[test]
    fn test_resolve_borrows_provided_snapshot() {
        let store = DataStore::new(EngineConfig::default());
        let table = CanonicalTable::new(
            "caller",
            ColumnMapping::new(),
            vec![production("Goa", 2020, "rice", 1.0)],
        );
        let resolved = store.resolve_production(TableSource::from(&table));
        assert!(matches!(resolved, Cow::Borrowed(_)));
        assert_eq!(resolved.source, "caller");
    }

    #[test]
    fn test_join_uses_mean_rainfall_per_state_year() {
        let prod = CanonicalTable::new(
            "p",
            ColumnMapping::new(),
            vec![production("Goa", 2020, "rice", 1.0), production("Goa", 2021, "rice", 2.0)],
        );
        let rain = CanonicalTable::new(
            "r",
            ColumnMapping::new(),
            vec![rainfall("Goa", 2020, 100.0), rainfall("Goa", 2020, 300.0)],
        );
        let joined = join_production_rainfall(&prod, &rain).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].rainfall_mm, Some(200.0));
        assert_eq!(joined[1].rainfall_mm, None);
        assert_eq!(joined[1].production.production, Some(2.0));
    }

    #[test]
    fn test_provenance_rows_filter_and_permalink() {
        let table = CanonicalTable::new(
            "p",
            ColumnMapping::new(),
            vec![
                production("Goa", 2019, "rice", 1.0),
                production("Goa", 2020, "rice", 2.0),
                production("Kerala", 2020, "rice", 3.0),
            ],
        );
        let mut filters = BTreeMap::new();
        filters.insert("state".to_string(), FilterValue::One("Goa".to_string()));
        filters.insert(
            "year".to_string(),
            FilterValue::AnyOf(vec!["2020".to_string(), "2021".to_string()]),
        );
        filters.insert("no_such_column".to_string(), FilterValue::One("x".to_string()));

        let rows = extract_provenance_rows(&table, &filters, 10, Some("local://data/p.csv"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values["production"].as_deref(), Some("2"));
        assert_eq!(
            rows[0].permalink.as_deref(),
            Some(format!("local://data/p.csv#row={}", rows[0].row_id).as_str())
        );
    }
}

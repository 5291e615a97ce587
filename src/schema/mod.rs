//! Schema - canonical relational shape for the production and rainfall domains
//!
//! Raw tables with arbitrary column names are mapped onto a fixed column set.
//! Every canonical row carries a content checksum used as its provenance id.

pub mod keywords;
pub mod mapper;
pub mod production;
pub mod rainfall;
pub mod records;
pub mod year;

pub use mapper::{best_alias, map_schema, ALIAS_MATCH_THRESHOLD, CANONICAL_FIELDS};
pub use production::normalize_production;
pub use rainfall::{normalize_rainfall, normalize_rainfall_with};
pub use records::{MappedRecord, ProductionRecord, RainfallRecord};

use crate::error::{QaError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

pub const ROW_ID_COLUMN: &str = "__row_id";

/// canonical field → original column name(s) it was built from
pub type ColumnMapping = BTreeMap<String, Vec<String>>;

/// A typed row of one canonical table.
pub trait CanonicalRecord: Clone {
    /// Fixed canonical column set, in output order.
    const COLUMNS: &'static [&'static str];

    /// Stringified canonical values, aligned with `COLUMNS`.
    fn values(&self) -> Vec<Option<String>>;

    /// Deterministic content checksum; independent of row position.
    fn row_id(&self) -> String {
        row_checksum(&self.values())
    }
}

/// SHA-256 over length-prefixed values. Null and empty string hash differently.
pub fn row_checksum(values: &[Option<String>]) -> String {
    let mut hasher = Sha256::new();
    for value in values {
        match value {
            Some(v) => {
                hasher.update([1u8]);
                hasher.update((v.len() as u64).to_le_bytes());
                hasher.update(v.as_bytes());
            }
            None => hasher.update([0u8]),
        }
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTable<R> {
    /// Logical source identifier (never a filesystem path)
    pub source: String,
    pub mapping: ColumnMapping,
    pub records: Vec<R>,
}

impl<R: CanonicalRecord> CanonicalTable<R> {
    pub fn new(source: impl Into<String>, mapping: ColumnMapping, records: Vec<R>) -> Self {
        Self {
            source: source.into(),
            mapping,
            records,
        }
    }

    pub fn empty(source: impl Into<String>) -> Self {
        Self::new(source, ColumnMapping::new(), Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        R::COLUMNS
    }

    pub fn row_ids(&self) -> Vec<String> {
        self.records.iter().map(CanonicalRecord::row_id).collect()
    }

    /// Relabel the table, e.g. when a caller supplies it directly.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Exactly the canonical columns plus `__row_id`, all as strings.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns: Vec<Vec<Option<String>>> =
            vec![Vec::with_capacity(self.len()); R::COLUMNS.len()];
        let mut ids = Vec::with_capacity(self.len());
        for record in &self.records {
            let values = record.values();
            if values.len() != R::COLUMNS.len() {
                return Err(QaError::Schema(format!(
                    "record has {} values for {} canonical columns",
                    values.len(),
                    R::COLUMNS.len()
                )));
            }
            ids.push(row_checksum(&values));
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }

        let mut series: Vec<Series> = R::COLUMNS
            .iter()
            .zip(columns)
            .map(|(name, values)| Series::new(name, values))
            .collect();
        series.push(Series::new(ROW_ID_COLUMN, ids));
        Ok(DataFrame::new(series)?)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = std::fs::File::create(path)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        Ok(())
    }
}

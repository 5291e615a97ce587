//! Analytical query engine
//!
//! Every operation takes its tables as [`TableSource`]s, resolves them once,
//! and returns a [`QueryOutcome`]: either the answer (which carries its own
//! [`Provenance`]) or an `{"error": ...}` object. Nothing in here panics or
//! returns `Err` for missing data.

pub mod batch;
pub mod compare;
pub mod dataset_arguments;
pub mod extreme;
pub mod policy;
pub mod trend;

pub use batch::{parse_requests, QueryRequest, QueryResponse};
pub use compare::{CropTotal, RainfallComparison, StateComparison};
pub use dataset_arguments::{DatasetArgument, DatasetArguments, SourceRef};
pub use extreme::{DistrictExtreme, DistrictExtremes};
pub use policy::{PolicyArgument, PolicyReport};
pub use trend::{TrendPoint, TrendReport};

use crate::config::EngineConfig;
use crate::error::{QaError, Result};
use crate::frames::{yearly, Agg};
use crate::schema::keywords::same_key;
use crate::schema::{CanonicalTable, ProductionRecord, RainfallRecord};
use crate::store::DataStore;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

pub const DEFAULT_COMPARE_YEARS: usize = 3;
pub const DEFAULT_TOP_M: usize = 3;
pub const DEFAULT_TREND_YEARS: usize = 10;
pub const DEFAULT_POLICY_YEARS: usize = 5;

/// Result of a query: the payload, or an explicit error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryOutcome<T> {
    Error { error: String },
    Answer(T),
}

impl<T> QueryOutcome<T> {
    pub(crate) fn error(message: impl Into<String>) -> Self {
        let error = message.into();
        warn!("Query returned error outcome: {}", error);
        QueryOutcome::Error { error }
    }

    /// Error outcome for a failed table operation.
    pub(crate) fn failed(err: QaError) -> Self {
        Self::error(err.to_string())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryOutcome::Error { .. })
    }

    pub fn answer(&self) -> Option<&T> {
        match self {
            QueryOutcome::Answer(t) => Some(t),
            QueryOutcome::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            QueryOutcome::Error { error } => Some(error),
            QueryOutcome::Answer(_) => None,
        }
    }

    pub fn into_answer(self) -> Option<T> {
        match self {
            QueryOutcome::Answer(t) => Some(t),
            QueryOutcome::Error { .. } => None,
        }
    }
}

/// Logical source identifiers plus the exact year window a result used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub sources: BTreeMap<String, String>,
    pub years_used: Vec<i32>,
}

impl Provenance {
    pub(crate) fn new(years_used: Vec<i32>) -> Self {
        Self {
            sources: BTreeMap::new(),
            years_used,
        }
    }

    pub(crate) fn with_production(mut self, table: &CanonicalTable<ProductionRecord>) -> Self {
        self.sources.insert("production".to_string(), table.source.clone());
        self
    }

    pub(crate) fn with_rainfall(mut self, table: &CanonicalTable<RainfallRecord>) -> Self {
        self.sources.insert("rainfall".to_string(), table.source.clone());
        self
    }
}

/// Stateless query executor; tables come from the caller or the store.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: DataStore,
}

impl QueryEngine {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    pub fn from_config(config: EngineConfig) -> Self {
        Self::new(DataStore::new(config))
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }
}

/// The `n` most recent distinct years, newest first.
pub(crate) fn recent_years<I>(years: I, n: usize) -> Vec<i32>
where
    I: IntoIterator<Item = Option<i32>>,
{
    years
        .into_iter()
        .flatten()
        .unique()
        .sorted_by(|a, b| b.cmp(a))
        .take(n)
        .collect()
}

/// Production records for one state and crop, optionally restricted to a window.
pub(crate) fn crop_rows<'a>(
    table: &'a CanonicalTable<ProductionRecord>,
    state: &'a str,
    crop: &'a str,
    window: Option<&'a [i32]>,
) -> impl Iterator<Item = &'a ProductionRecord> + 'a {
    table.records.iter().filter(move |r| {
        same_key(&r.state, state)
            && same_key(&r.crop, crop)
            && window.map_or(true, |w| r.year.map_or(false, |y| w.contains(&y)))
    })
}

/// Production summed per year; years with no numeric production are left out.
pub(crate) fn yearly_production<'a, I>(rows: I) -> Result<BTreeMap<i32, f64>>
where
    I: IntoIterator<Item = &'a ProductionRecord>,
{
    let (years, tonnes): (Vec<_>, Vec<_>) =
        rows.into_iter().map(|r| (r.year, r.production)).unzip();
    yearly(years, tonnes, Agg::Sum)
}

/// Mean rainfall per year for one state.
pub(crate) fn yearly_rainfall(
    table: &CanonicalTable<RainfallRecord>,
    state: &str,
) -> Result<BTreeMap<i32, f64>> {
    let (years, mm): (Vec<_>, Vec<_>) = table
        .records
        .iter()
        .filter(|r| same_key(&r.state, state))
        .map(|r| (r.year, r.rainfall_mm))
        .unzip();
    yearly(years, mm, Agg::Mean)
}

//! Batch execution of independent queries over one shared snapshot
//!
//! Queries are pure functions of (tables, parameters), so a batch can fan out
//! across a rayon pool against the same read-only tables. Responses come back
//! in request order.

use super::{
    DatasetArguments, DistrictExtremes, PolicyReport, QueryEngine, QueryOutcome,
    RainfallComparison, TrendReport, DEFAULT_COMPARE_YEARS, DEFAULT_POLICY_YEARS, DEFAULT_TOP_M,
    DEFAULT_TREND_YEARS,
};
use crate::error::{QaError, Result};
use crate::schema::{CanonicalTable, ProductionRecord, RainfallRecord};
use crate::store::TableSource;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

fn default_compare_years() -> usize {
    DEFAULT_COMPARE_YEARS
}

fn default_top_m() -> usize {
    DEFAULT_TOP_M
}

fn default_trend_years() -> usize {
    DEFAULT_TREND_YEARS
}

fn default_policy_years() -> usize {
    DEFAULT_POLICY_YEARS
}

/// One query in a batch file, e.g. `{"query": "trend", "region": "Goa", "crop": "rice"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum QueryRequest {
    Compare {
        state_x: String,
        state_y: String,
        #[serde(default = "default_compare_years")]
        years: usize,
        #[serde(default = "default_top_m")]
        top_m: usize,
    },
    Extreme {
        state_x: String,
        state_y: String,
        crop: String,
    },
    Trend {
        region: String,
        crop: String,
        #[serde(default = "default_trend_years")]
        years: usize,
    },
    Policy {
        region: String,
        crop_a: String,
        crop_b: String,
        #[serde(default = "default_policy_years")]
        years: usize,
    },
    DatasetArguments {
        #[serde(default)]
        region: Option<String>,
        crop_a: String,
        crop_b: String,
        #[serde(default = "default_policy_years")]
        years: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Compare(QueryOutcome<RainfallComparison>),
    Extreme(QueryOutcome<DistrictExtremes>),
    Trend(QueryOutcome<TrendReport>),
    Policy(QueryOutcome<PolicyReport>),
    DatasetArguments(QueryOutcome<DatasetArguments>),
}

impl QueryResponse {
    pub fn is_error(&self) -> bool {
        match self {
            QueryResponse::Compare(o) => o.is_error(),
            QueryResponse::Extreme(o) => o.is_error(),
            QueryResponse::Trend(o) => o.is_error(),
            QueryResponse::Policy(o) => o.is_error(),
            QueryResponse::DatasetArguments(o) => o.is_error(),
        }
    }
}

/// Parse a JSON array of requests. An empty batch is rejected.
pub fn parse_requests(json: &str) -> Result<Vec<QueryRequest>> {
    let requests: Vec<QueryRequest> = serde_json::from_str(json)?;
    if requests.is_empty() {
        return Err(QaError::Query("batch contains no requests".to_string()));
    }
    Ok(requests)
}

impl QueryEngine {
    /// Run one request against caller-held tables.
    pub fn run(
        &self,
        request: &QueryRequest,
        production: &CanonicalTable<ProductionRecord>,
        rainfall: &CanonicalTable<RainfallRecord>,
    ) -> QueryResponse {
        let prod = TableSource::Provided(production);
        let rain = TableSource::Provided(rainfall);
        match request {
            QueryRequest::Compare {
                state_x,
                state_y,
                years,
                top_m,
            } => QueryResponse::Compare(self.compare_avg_rainfall_and_top_crops(
                state_x, state_y, *years, *top_m, prod, rain,
            )),
            QueryRequest::Extreme {
                state_x,
                state_y,
                crop,
            } => QueryResponse::Extreme(self.find_district_extreme(state_x, state_y, crop, prod)),
            QueryRequest::Trend {
                region,
                crop,
                years,
            } => QueryResponse::Trend(self.trend_and_correlation(region, crop, *years, prod, rain)),
            QueryRequest::Policy {
                region,
                crop_a,
                crop_b,
                years,
            } => QueryResponse::Policy(self.policy_arguments_for_crop_promotion(
                region, crop_a, crop_b, *years, prod, rain,
            )),
            QueryRequest::DatasetArguments {
                region,
                crop_a,
                crop_b,
                years,
            } => QueryResponse::DatasetArguments(self.dataset_policy_arguments(
                region.as_deref(),
                crop_a,
                crop_b,
                *years,
                prod,
                rain,
            )),
        }
    }

    /// Fan a batch out over a worker pool. `workers = 0` uses rayon's default.
    pub fn run_batch(
        &self,
        requests: &[QueryRequest],
        production: &CanonicalTable<ProductionRecord>,
        rainfall: &CanonicalTable<RainfallRecord>,
        workers: usize,
    ) -> Vec<QueryResponse> {
        if requests.is_empty() {
            return vec![];
        }
        info!("Running batch of {} queries", requests.len());

        let mut builder = rayon::ThreadPoolBuilder::new();
        if workers > 0 {
            builder = builder.num_threads(workers);
        }

        match builder.build() {
            Ok(pool) => pool.install(|| {
                requests
                    .par_iter()
                    .map(|r| self.run(r, production, rainfall))
                    .collect()
            }),
            Err(e) => {
                warn!("Could not build worker pool ({}); running batch sequentially", e);
                requests
                    .iter()
                    .map(|r| self.run(r, production, rainfall))
                    .collect()
            }
        }
    }
}

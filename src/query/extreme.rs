//! District extremes for a crop in the latest production year

use super::{Provenance, QueryEngine, QueryOutcome};
use crate::schema::keywords::same_key;
use crate::schema::{CanonicalTable, ProductionRecord};
use crate::store::TableSource;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictExtreme {
    pub district: Option<String>,
    pub production: f64,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictExtremes {
    pub crop: String,
    pub year: i32,
    /// Highest-producing district of the first state
    pub state_x_max: Option<DistrictExtreme>,
    /// Lowest-producing district of the second state
    pub state_y_min: Option<DistrictExtreme>,
    pub provenance: Provenance,
}

#[derive(Clone, Copy)]
enum Extreme {
    Max,
    Min,
}

impl QueryEngine {
    /// Max district for `state_x` and min district for `state_y`, both for
    /// `crop` in the most recent year present anywhere in the table.
    pub fn find_district_extreme(
        &self,
        state_x: &str,
        state_y: &str,
        crop: &str,
        production: TableSource<'_, ProductionRecord>,
    ) -> QueryOutcome<DistrictExtremes> {
        let production = self.store().resolve_production(production);
        if production.is_empty() {
            return QueryOutcome::error("No production data available");
        }

        let Some(year) = production.records.iter().filter_map(|r| r.year).max() else {
            return QueryOutcome::error("No years in production data");
        };
        info!("District extremes for {} in {}", crop, year);

        QueryOutcome::Answer(DistrictExtremes {
            crop: crop.to_string(),
            year,
            state_x_max: extreme(&production, state_x, crop, year, Extreme::Max),
            state_y_min: extreme(&production, state_y, crop, year, Extreme::Min),
            provenance: Provenance::new(vec![year]).with_production(&production),
        })
    }
}

/// First row holding the extreme wins; rows without production are ignored.
fn extreme(
    table: &CanonicalTable<ProductionRecord>,
    state: &str,
    crop: &str,
    year: i32,
    kind: Extreme,
) -> Option<DistrictExtreme> {
    let mut best: Option<(&ProductionRecord, f64)> = None;
    for r in table.records.iter().filter(|r| {
        same_key(&r.state, state) && same_key(&r.crop, crop) && r.year == Some(year)
    }) {
        let Some(tonnes) = r.production else { continue };
        let better = match (best, kind) {
            (None, _) => true,
            (Some((_, current)), Extreme::Max) => tonnes > current,
            (Some((_, current)), Extreme::Min) => tonnes < current,
        };
        if better {
            best = Some((r, tonnes));
        }
    }

    best.map(|(r, production)| DistrictExtreme {
        district: r.district.clone(),
        production,
        year,
    })
}

//! Rainfall and top-crop comparison between two states

use super::{recent_years, Provenance, QueryEngine, QueryOutcome};
use crate::error::Result;
use crate::frames::ranked_totals;
use crate::schema::keywords::same_key;
use crate::schema::{CanonicalTable, ProductionRecord, RainfallRecord};
use crate::store::TableSource;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropTotal {
    pub crop: String,
    pub production: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateComparison {
    pub state: String,
    /// `None` when the state has no rainfall readings in the window
    pub avg_rainfall_mm: Option<f64>,
    pub top_crops: Vec<CropTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallComparison {
    pub states: Vec<StateComparison>,
    pub provenance: Provenance,
}

impl QueryEngine {
    /// Mean rainfall and the `top_m` crops by summed production for two
    /// states over the `years` most recent years present in the rainfall data.
    pub fn compare_avg_rainfall_and_top_crops(
        &self,
        state_x: &str,
        state_y: &str,
        years: usize,
        top_m: usize,
        production: TableSource<'_, ProductionRecord>,
        rainfall: TableSource<'_, RainfallRecord>,
    ) -> QueryOutcome<RainfallComparison> {
        let production = self.store().resolve_production(production);
        let rainfall = self.store().resolve_rainfall(rainfall);

        if production.is_empty() {
            return QueryOutcome::error("No production data available");
        }
        if rainfall.is_empty() {
            return QueryOutcome::error("No rainfall data available");
        }

        let window = recent_years(rainfall.records.iter().map(|r| r.year), years);
        if window.is_empty() {
            return QueryOutcome::error("No rainfall years available");
        }
        info!(
            "Comparing {} and {} over years {:?}",
            state_x, state_y, window
        );

        let states = [state_x, state_y]
            .iter()
            .map(|state| {
                Ok(StateComparison {
                    state: state.to_string(),
                    avg_rainfall_mm: average_rainfall(&rainfall, state, &window),
                    top_crops: top_crops(&production, state, &window, top_m)?,
                })
            })
            .collect::<Result<Vec<_>>>();
        let states = match states {
            Ok(states) => states,
            Err(e) => return QueryOutcome::failed(e),
        };

        QueryOutcome::Answer(RainfallComparison {
            states,
            provenance: Provenance::new(window)
                .with_production(&production)
                .with_rainfall(&rainfall),
        })
    }
}

fn average_rainfall(
    table: &CanonicalTable<RainfallRecord>,
    state: &str,
    window: &[i32],
) -> Option<f64> {
    let values: Vec<f64> = table
        .records
        .iter()
        .filter(|r| same_key(&r.state, state) && r.year.map_or(false, |y| window.contains(&y)))
        .filter_map(|r| r.rainfall_mm)
        .collect();
    crate::stats::mean(&values)
}

/// Summed production per crop, largest first. Ties keep first-appearance order.
fn top_crops(
    table: &CanonicalTable<ProductionRecord>,
    state: &str,
    window: &[i32],
    top_m: usize,
) -> Result<Vec<CropTotal>> {
    let (crops, tonnes): (Vec<&str>, Vec<Option<f64>>) = table
        .records
        .iter()
        .filter(|r| same_key(&r.state, state) && r.year.map_or(false, |y| window.contains(&y)))
        .map(|r| (r.crop.as_str(), r.production))
        .unzip();
    let ranked = ranked_totals(crops, tonnes, top_m)?;
    Ok(ranked
        .into_iter()
        .map(|(crop, production)| CropTotal { crop, production })
        .collect())
}

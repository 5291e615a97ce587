//! Production trend and rainfall correlation for one crop in one region

use super::{
    crop_rows, recent_years, yearly_production, yearly_rainfall, Provenance, QueryEngine,
    QueryOutcome,
};
use crate::frames::join_years;
use crate::schema::{ProductionRecord, RainfallRecord};
use crate::stats::{ols_slope, pearson};
use crate::store::TableSource;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub year: i32,
    pub production: f64,
    pub rainfall_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub region: String,
    pub crop: String,
    /// OLS slope of production on year; `None` below two points
    pub trend_slope: Option<f64>,
    /// Pearson r of production against rainfall; `None` when undefined
    pub correlation: Option<f64>,
    pub years: Vec<i32>,
    pub data: Vec<TrendPoint>,
    pub provenance: Provenance,
}

impl QueryEngine {
    pub fn trend_and_correlation(
        &self,
        region: &str,
        crop: &str,
        years: usize,
        production: TableSource<'_, ProductionRecord>,
        rainfall: TableSource<'_, RainfallRecord>,
    ) -> QueryOutcome<TrendReport> {
        let production = self.store().resolve_production(production);
        let rainfall = self.store().resolve_rainfall(rainfall);

        if production.is_empty() {
            return QueryOutcome::error("No production data available");
        }
        if rainfall.is_empty() {
            return QueryOutcome::error("No rainfall data available");
        }

        // window comes from the whole table, not just this region
        let window = recent_years(production.records.iter().map(|r| r.year), years);
        if window.is_empty() {
            return QueryOutcome::error("No years in production data");
        }

        let mut rows = crop_rows(&production, region, crop, Some(window.as_slice())).peekable();
        if rows.peek().is_none() {
            return QueryOutcome::error("No crop data for region");
        }
        let joined = match yearly_production(rows)
            .and_then(|yearly| join_years(&yearly, &yearly_rainfall(&rainfall, region)?))
        {
            Ok(joined) => joined,
            Err(e) => return QueryOutcome::failed(e),
        };
        if joined.is_empty() {
            return QueryOutcome::error("No overlapping rainfall data for region");
        }
        debug!("Trend for {} in {}: {} overlapping years", crop, region, joined.len());

        let xs: Vec<f64> = joined.iter().map(|(y, _, _)| *y as f64).collect();
        let prod: Vec<f64> = joined.iter().map(|(_, p, _)| *p).collect();
        let mm: Vec<f64> = joined.iter().map(|(_, _, r)| *r).collect();
        let report = TrendReport {
            region: region.to_string(),
            crop: crop.to_string(),
            trend_slope: ols_slope(&xs, &prod),
            correlation: pearson(&prod, &mm),
            years: joined.iter().map(|(y, _, _)| *y).collect(),
            data: joined
                .iter()
                .map(|&(year, production, rainfall_mm)| TrendPoint {
                    year,
                    production,
                    rainfall_mm,
                })
                .collect(),
            provenance: Provenance::new(window)
                .with_production(&production)
                .with_rainfall(&rainfall),
        };
        info!(
            "Trend for {} in {}: slope={:?} r={:?}",
            crop, region, report.trend_slope, report.correlation
        );
        QueryOutcome::Answer(report)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> QueryEngine {
        QueryEngine::from_config(EngineConfig::default())
    }

    #[test]
    fn test_single_point_has_undefined_statistics() {
        let prod = production_table(vec![production("Goa", "N", 2020, "rice", Some(5.0))]);
        let rain = rainfall_table(vec![rainfall("Goa", 2020, 100.0)]);

        let outcome = engine().trend_and_correlation(
            "Goa",
            "rice",
            5,
            TableSource::from(&prod),
            TableSource::from(&rain),
        );
        let report = outcome.answer().unwrap();
        assert_eq!(report.years, vec![2020]);
        assert_eq!(report.trend_slope, None);
        assert_eq!(report.correlation, None);
    }

    #[test]
    fn test_window_is_taken_from_all_regions() {
        let prod = production_table(vec![
            production("Goa", "N", 2018, "rice", Some(5.0)),
            production("Kerala", "K", 2021, "rice", Some(5.0)),
        ]);
        let rain = rainfall_table(vec![rainfall("Goa", 2018, 100.0)]);

        let outcome = engine().trend_and_correlation(
            "Goa",
            "rice",
            1,
            TableSource::from(&prod),
            TableSource::from(&rain),
        );
        assert_eq!(outcome.error_message(), Some("No crop data for region"));
    }

    #[test]
    fn test_no_overlap_is_an_error() {
        let prod = production_table(vec![production("Goa", "N", 2020, "rice", Some(5.0))]);
        let rain = rainfall_table(vec![rainfall("Goa", 2019, 100.0)]);

        let outcome = engine().trend_and_correlation(
            "Goa",
            "rice",
            5,
            TableSource::from(&prod),
            TableSource::from(&rain),
        );
        assert_eq!(
            outcome.error_message(),
            Some("No overlapping rainfall data for region")
        );
    }
}

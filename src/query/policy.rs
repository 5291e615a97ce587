//! Scored policy arguments for promoting one crop over another
//!
//! Four candidate metrics are computed for both crops over the same year
//! window. Each candidate's effect size is the absolute difference between
//! the crops, and the three most divergent candidates are returned. The
//! ranking is by effect size, not by a fixed order of metrics.

use super::{
    crop_rows, recent_years, yearly_production, yearly_rainfall, Provenance, QueryEngine,
    QueryOutcome,
};
use crate::error::Result;
use crate::frames::join_years;
use crate::schema::{CanonicalTable, ProductionRecord, RainfallRecord};
use crate::stats::{mean, ols_slope, pearson, sample_std, variance_or_infinite};
use crate::store::TableSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const BASE_CONFIDENCE: f64 = 0.5;
pub const MAX_POLICY_ARGUMENTS: usize = 3;
/// Drought threshold never sits closer than this fraction below the mean
pub const DROUGHT_MIN_MARGIN: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyArgument {
    pub title: String,
    pub argument: String,
    /// Absolute difference between the two crops on this metric
    pub effect_size: f64,
    pub confidence: f64,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyReport {
    pub region: String,
    pub crop_a: String,
    pub crop_b: String,
    pub arguments: Vec<PolicyArgument>,
    pub provenance: Provenance,
}

/// Per-crop metrics over the window.
#[derive(Debug, Clone, PartialEq)]
struct CropMetrics {
    slope: f64,
    correlation: f64,
    overlap: usize,
    variance: f64,
    drought_drop: f64,
    years_covered: usize,
}

impl CropMetrics {
    fn compute(
        yearly: &BTreeMap<i32, f64>,
        rain: &BTreeMap<i32, f64>,
        drought: Option<f64>,
    ) -> Result<Self> {
        let years: Vec<f64> = yearly.keys().map(|y| *y as f64).collect();
        let values: Vec<f64> = yearly.values().copied().collect();

        let joined = join_years(yearly, rain)?;
        let (correlation, overlap) = if joined.len() < 2 {
            (0.0, 0)
        } else {
            let prod: Vec<f64> = joined.iter().map(|(_, p, _)| *p).collect();
            let mm: Vec<f64> = joined.iter().map(|(_, _, r)| *r).collect();
            (pearson(&prod, &mm).unwrap_or(0.0), joined.len())
        };

        Ok(Self {
            slope: ols_slope(&years, &values).unwrap_or(0.0),
            correlation,
            overlap,
            variance: variance_or_infinite(&values),
            drought_drop: drought.map_or(0.0, |t| drought_drop(yearly, rain, t)),
            years_covered: yearly.len(),
        })
    }
}

/// Metrics for both crops against the region's yearly rainfall.
fn crop_pair_metrics(
    production: &CanonicalTable<ProductionRecord>,
    rainfall: &CanonicalTable<RainfallRecord>,
    region: &str,
    crops: (&str, &str),
    window: &[i32],
) -> Result<(CropMetrics, CropMetrics)> {
    let rain = yearly_rainfall(rainfall, region)?;
    let threshold = drought_threshold(&rain);
    debug!("Drought threshold for {}: {:?}", region, threshold);

    let yearly_a = yearly_production(crop_rows(production, region, crops.0, Some(window)))?;
    let yearly_b = yearly_production(crop_rows(production, region, crops.1, Some(window)))?;
    Ok((
        CropMetrics::compute(&yearly_a, &rain, threshold)?,
        CropMetrics::compute(&yearly_b, &rain, threshold)?,
    ))
}

/// `mean - max(0.1 * mean, std)` over the region's yearly rainfall.
fn drought_threshold(rain: &BTreeMap<i32, f64>) -> Option<f64> {
    let values: Vec<f64> = rain.values().copied().collect();
    let m = mean(&values)?;
    let margin = DROUGHT_MIN_MARGIN * m;
    let spread = sample_std(&values).map_or(margin, |s| s.max(margin));
    Some(m - spread)
}

/// Relative production drop in drought years against all years.
fn drought_drop(yearly: &BTreeMap<i32, f64>, rain: &BTreeMap<i32, f64>, threshold: f64) -> f64 {
    let drought: Vec<f64> = yearly
        .iter()
        .filter(|(year, _)| rain.get(*year).map_or(false, |mm| *mm < threshold))
        .map(|(_, p)| *p)
        .collect();
    let all: Vec<f64> = yearly.values().copied().collect();
    match (mean(&drought), mean(&all)) {
        (Some(in_drought), Some(overall)) => (overall - in_drought) / overall.max(1.0),
        _ => 0.0,
    }
}

fn variance_effect(a: f64, b: f64) -> f64 {
    if a.is_infinite() && b.is_infinite() {
        0.0
    } else {
        (a - b).abs()
    }
}

impl QueryEngine {
    pub fn policy_arguments_for_crop_promotion(
        &self,
        region: &str,
        crop_a: &str,
        crop_b: &str,
        years: usize,
        production: TableSource<'_, ProductionRecord>,
        rainfall: TableSource<'_, RainfallRecord>,
    ) -> QueryOutcome<PolicyReport> {
        let production = self.store().resolve_production(production);
        let rainfall = self.store().resolve_rainfall(rainfall);

        if production.is_empty() {
            return QueryOutcome::error("No production data available");
        }
        if rainfall.is_empty() {
            return QueryOutcome::error("No rainfall data available");
        }

        let window = recent_years(production.records.iter().map(|r| r.year), years);
        let pair = crop_pair_metrics(&production, &rainfall, region, (crop_a, crop_b), &window);
        let (a, b) = match pair {
            Ok(metrics) => metrics,
            Err(e) => return QueryOutcome::failed(e),
        };

        let provenance = Provenance::new(window)
            .with_production(&production)
            .with_rainfall(&rainfall);

        let mut candidates: Vec<(f64, &str, String)> = vec![
            (
                (a.slope - b.slope).abs(),
                "Production trend comparison",
                format!(
                    "{} slope {:.2} vs {} slope {:.2} over last {} yrs.",
                    crop_a, a.slope, crop_b, b.slope, years
                ),
            ),
            (
                (a.correlation - b.correlation).abs(),
                "Rainfall-dependence difference",
                format!(
                    "Correlation with rainfall: {}={:.2} (n={}), {}={:.2} (n={}). Lower correlation suggests less dependence on rainfall.",
                    crop_a, a.correlation, a.overlap, crop_b, b.correlation, b.overlap
                ),
            ),
            (
                variance_effect(a.variance, b.variance),
                "Yield variability",
                format!(
                    "Year-to-year production variability: {} var={:.2}, {} var={:.2}.",
                    crop_a, a.variance, crop_b, b.variance
                ),
            ),
            (
                (a.drought_drop - b.drought_drop).abs(),
                "Drought-year resilience",
                format!(
                    "Relative production drop in drought years: {}={:.2}, {}={:.2} (lower is better).",
                    crop_a, a.drought_drop, crop_b, b.drought_drop
                ),
            ),
        ];
        candidates.sort_by(|x, y| y.0.total_cmp(&x.0));

        let coverage = a.years_covered.min(b.years_covered) as f64 / years.max(1) as f64;
        let confidence = (BASE_CONFIDENCE + 0.5 * coverage).min(1.0);

        let arguments: Vec<PolicyArgument> = candidates
            .into_iter()
            .take(MAX_POLICY_ARGUMENTS)
            .map(|(effect_size, title, argument)| PolicyArgument {
                title: title.to_string(),
                argument,
                effect_size,
                confidence,
                provenance: provenance.clone(),
            })
            .collect();

        info!(
            "Policy arguments for {} over {} in {}: {:?}",
            crop_a,
            crop_b,
            region,
            arguments.iter().map(|arg| arg.title.as_str()).collect::<Vec<_>>()
        );

        QueryOutcome::Answer(PolicyReport {
            region: region.to_string(),
            crop_a: crop_a.to_string(),
            crop_b: crop_b.to_string(),
            arguments,
            provenance,
        })
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

    fn series(points: &[(i32, f64)]) -> BTreeMap<i32, f64> {
        points.iter().copied().collect()
    }

    #[test]
    fn test_drought_threshold_uses_larger_margin() {
        // std of [100, 200] is ~70.7, larger than 10% of the mean
        let rain = series(&[(2019, 100.0), (2020, 200.0)]);
        let t = drought_threshold(&rain).unwrap();
        assert!((t - (150.0 - 70.710678)).abs() < 1e-4);

        // a single year has no std; fall back to 10% of the mean
        let rain = series(&[(2020, 500.0)]);
        assert_eq!(drought_threshold(&rain), Some(450.0));
        assert_eq!(drought_threshold(&BTreeMap::new()), None);
    }

    #[test]
    fn test_drought_drop() {
        let rain = series(&[(2018, 1000.0), (2019, 200.0), (2020, 1000.0)]);
        let yearly = series(&[(2018, 90.0), (2019, 30.0), (2020, 120.0)]);
        let threshold = drought_threshold(&rain).unwrap();
        // all-years mean 80, drought-year mean 30
        assert_eq!(drought_drop(&yearly, &rain, threshold), 50.0 / 80.0);
        assert_eq!(drought_drop(&yearly, &rain, 0.0), 0.0);
    }

    #[test]
    fn test_insufficient_data_metrics() {
        let yearly = series(&[(2020, 10.0)]);
        let metrics = CropMetrics::compute(&yearly, &BTreeMap::new(), None).unwrap();
        assert_eq!(metrics.slope, 0.0);
        assert_eq!(metrics.correlation, 0.0);
        assert_eq!(metrics.overlap, 0);
        assert!(metrics.variance.is_infinite());
        assert_eq!(metrics.drought_drop, 0.0);
        assert_eq!(variance_effect(f64::INFINITY, f64::INFINITY), 0.0);
        assert!(variance_effect(f64::INFINITY, 3.0).is_infinite());
    }

    #[test]
    fn test_arguments_ranked_by_effect_size() {
        let prod = production_table(vec![
            production("Goa", "N", 2018, "millet", Some(10.0)),
            production("Goa", "N", 2019, "millet", Some(12.0)),
            production("Goa", "N", 2020, "millet", Some(14.0)),
            production("Goa", "N", 2018, "rice", Some(100.0)),
            production("Goa", "N", 2019, "rice", Some(40.0)),
            production("Goa", "N", 2020, "rice", Some(130.0)),
        ]);
        let rain = rainfall_table(vec![
            rainfall("Goa", 2018, 1000.0),
            rainfall("Goa", 2019, 200.0),
            rainfall("Goa", 2020, 1000.0),
        ]);

        let outcome = engine().policy_arguments_for_crop_promotion(
            "Goa",
            "millet",
            "rice",
            3,
            TableSource::from(&prod),
            TableSource::from(&rain),
        );
        let report = outcome.answer().unwrap();

        assert_eq!(report.arguments.len(), 3);
        assert_eq!(report.arguments[0].title, "Yield variability");
        assert_eq!(report.arguments[1].title, "Production trend comparison");
        for pair in report.arguments.windows(2) {
            assert!(pair[0].effect_size >= pair[1].effect_size);
        }
        // both crops cover all 3 requested years
        assert!(report.arguments.iter().all(|a| a.confidence == 1.0));
        assert_eq!(report.provenance.years_used, vec![2020, 2019, 2018]);
    }

    #[test]
    fn test_confidence_scales_with_coverage() {
        let prod = production_table(vec![
            production("Goa", "N", 2020, "millet", Some(10.0)),
            production("Goa", "N", 2020, "rice", Some(20.0)),
            production("Goa", "N", 2019, "rice", Some(25.0)),
        ]);
        let rain = rainfall_table(vec![rainfall("Goa", 2020, 100.0)]);

        let outcome = engine().policy_arguments_for_crop_promotion(
            "Goa",
            "millet",
            "rice",
            4,
            TableSource::from(&prod),
            TableSource::from(&rain),
        );
        let report = outcome.answer().unwrap();
        assert!(report.arguments.iter().all(|a| a.confidence == 0.625));
    }

    #[test]
    fn test_empty_tables_return_error_shape() {
        let prod = production_table(Vec::new());
        let rain = rainfall_table(vec![rainfall("Goa", 2020, 100.0)]);
        let outcome = engine().policy_arguments_for_crop_promotion(
            "Goa",
            "millet",
            "rice",
            5,
            TableSource::from(&prod),
            TableSource::from(&rain),
        );
        assert_eq!(outcome.error_message(), Some("No production data available"));
    }
}

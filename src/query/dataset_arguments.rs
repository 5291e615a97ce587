//! Plain-language dataset arguments with citations
//!
//! Unlike the scored policy arguments these are three fixed statements
//! (total production, regional rainfall, district breadth), each citing the
//! dataset it was computed from. Crop names match by case-insensitive
//! substring, so `rice` also picks up `rice (paddy)`.

use super::{Provenance, QueryEngine, QueryOutcome};
use crate::provenance::distinct_source_count;
use crate::schema::keywords::{same_key, title_case};
use crate::schema::{ProductionRecord, RainfallRecord};
use crate::stats::mean;
use crate::store::TableSource;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const PRODUCTION_TITLE: &str = "Agriculture production (normalized)";
pub const RAINFALL_TITLE: &str = "Rainfall (normalized)";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetArgument {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetArguments {
    pub arguments: Vec<DatasetArgument>,
    /// Number of distinct source URLs cited across all arguments
    pub provenance_score: usize,
    pub provenance: Provenance,
}

fn crop_matches(record: &ProductionRecord, crop: &str) -> bool {
    record
        .crop
        .to_lowercase()
        .contains(&crop.trim().to_lowercase())
}

impl QueryEngine {
    /// `region = None` uses every state.
    pub fn dataset_policy_arguments(
        &self,
        region: Option<&str>,
        crop_a: &str,
        crop_b: &str,
        years: usize,
        production: TableSource<'_, ProductionRecord>,
        rainfall: TableSource<'_, RainfallRecord>,
    ) -> QueryOutcome<DatasetArguments> {
        let production = self.store().resolve_production(production);
        let rainfall = self.store().resolve_rainfall(rainfall);

        if production.is_empty() {
            return QueryOutcome::error("No production data available");
        }

        let in_region = |state: &str| region.map_or(true, |r| same_key(state, r));
        let prod: Vec<&ProductionRecord> = production
            .records
            .iter()
            .filter(|r| in_region(r.state.as_str()))
            .collect();

        let window: Vec<i32> = prod
            .iter()
            .filter_map(|r| r.year)
            .unique()
            .sorted()
            .rev()
            .take(years)
            .sorted()
            .collect();
        // no years at all means no restriction
        let in_window = |r: &ProductionRecord| {
            window.is_empty() || r.year.map_or(false, |y| window.contains(&y))
        };

        let crop_total = |crop: &str| -> f64 {
            prod.iter()
                .filter(|&&r| in_window(r) && crop_matches(r, crop))
                .filter_map(|r| r.production)
                .sum()
        };
        let district_count = |crop: &str| -> usize {
            prod.iter()
                .filter(|&&r| in_window(r) && crop_matches(r, crop))
                .filter_map(|r| r.district.as_deref())
                .unique()
                .count()
        };

        let rain_values: Vec<f64> = rainfall
            .records
            .iter()
            .filter(|r| in_region(r.state.as_str()))
            .filter_map(|r| r.rainfall_mm)
            .collect();
        let avg_rain = match mean(&rain_values) {
            Some(mm) => format!("{:.0} mm", mm),
            None => "unavailable".to_string(),
        };

        let production_ref = SourceRef {
            title: PRODUCTION_TITLE.to_string(),
            url: production.source.clone(),
        };
        let rainfall_ref = SourceRef {
            title: RAINFALL_TITLE.to_string(),
            url: rainfall.source.clone(),
        };

        let arguments = vec![
            DatasetArgument {
                text: format!(
                    "Over the last {} years, total production of {} was {:.0} tonnes vs {:.0} tonnes for {}.",
                    window.len(),
                    crop_a,
                    crop_total(crop_a),
                    crop_total(crop_b),
                    crop_b
                ),
                sources: vec![production_ref.clone()],
            },
            DatasetArgument {
                text: format!(
                    "Average annual rainfall in the region is {}; lower rainfall variability favors drought-resistant crops like {}.",
                    avg_rain, crop_a
                ),
                sources: vec![rainfall_ref],
            },
            DatasetArgument {
                text: format!(
                    "{} is produced across {} districts vs {} for {}, suggesting {} may offer broader diversification benefits.",
                    title_case(crop_a),
                    district_count(crop_a),
                    district_count(crop_b),
                    crop_b,
                    crop_a
                ),
                sources: vec![production_ref],
            },
        ];

        let provenance_score = distinct_source_count(&arguments);
        info!(
            "Dataset arguments for {} vs {} cite {} distinct sources",
            crop_a, crop_b, provenance_score
        );

        QueryOutcome::Answer(DatasetArguments {
            arguments,
            provenance_score,
            provenance: Provenance::new(window)
                .with_production(&production)
                .with_rainfall(&rainfall),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn test_three_cited_arguments() {
        let prod = production_table(vec![
            production("Goa", "North", 2019, "rice (paddy)", Some(100.0)),
            production("Goa", "South", 2020, "rice", Some(50.0)),
            production("Goa", "North", 2020, "millet", Some(20.0)),
            production("Kerala", "Idukki", 2020, "millet", Some(999.0)),
        ]);
        let rain = rainfall_table(vec![rainfall("Goa", 2020, 300.0), rainfall("Goa", 2019, 100.0)]);
        let engine = QueryEngine::from_config(EngineConfig::default());

        let outcome = engine.dataset_policy_arguments(
            Some("goa"),
            "millet",
            "rice",
            5,
            TableSource::from(&prod),
            TableSource::from(&rain),
        );
        let result = outcome.answer().unwrap();

        assert_eq!(result.arguments.len(), 3);
        assert_eq!(
            result.arguments[0].text,
            "Over the last 2 years, total production of millet was 20 tonnes vs 150 tonnes for rice."
        );
        assert!(result.arguments[1].text.contains("200 mm"));
        assert!(result.arguments[2]
            .text
            .starts_with("Millet is produced across 1 districts vs 2 for rice"));
        assert_eq!(result.provenance_score, 2);
        assert_eq!(result.provenance.years_used, vec![2019, 2020]);
        assert_eq!(result.arguments[0].sources[0].url, "test://production");
    }
}

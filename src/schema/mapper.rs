//! Alias-based schema mapper
//!
//! Works for either domain. Each source column is scored against a static
//! alias table; the scoring is a pure function so it can be tested without
//! any table I/O.

use super::records::MappedRecord;
use super::{CanonicalTable, ColumnMapping};
use crate::ingestion::{column_names, column_strings, is_integer_column, RawTable};
use serde::Serialize;
use similar::{DiffOp, TextDiff};
use std::collections::HashSet;
use tracing::debug;

/// A fuzzy score must be strictly greater than this to be accepted.
pub const ALIAS_MATCH_THRESHOLD: f64 = 0.6;

/// Score of an exact alias hit.
pub const EXACT_ALIAS_SCORE: f64 = 1.0;

/// Once a canonical slot is filled, later columns cannot take it
/// (column iteration order decides ties).
pub const FIRST_MATCH_WINS: bool = true;

pub const CANONICAL_FIELDS: &[&str] = &[
    "state",
    "district",
    "year",
    "crop",
    "production",
    "avg_annual_rainfall",
];

pub const ALIASES: &[(&str, &[&str])] = &[
    ("state", &["state_name", "state", "st_name", "statecode"]),
    ("district", &["district", "district_name", "dist_name", "districtcode"]),
    ("year", &["year", "yr", "season", "financial_year"]),
    ("crop", &["crop", "crop_name", "cropcode", "cropname"]),
    (
        "production",
        &[
            "production",
            "production_tonnes",
            "qty",
            "production_quantity",
            "production_in_tonnes",
            "production_in_qtls",
        ],
    ),
    (
        "avg_annual_rainfall",
        &["rainfall", "avg_annual_rainfall", "annual_rainfall", "rain_mm"],
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasMatch {
    pub field: &'static str,
    pub score: f64,
}

/// Best canonical field for a column name. Exact alias hits short-circuit.
pub fn best_alias(column: &str) -> Option<AliasMatch> {
    let key = column.trim().to_lowercase().replace(' ', "_");
    let mut best: Option<AliasMatch> = None;
    for &(field, aliases) in ALIASES {
        for alias in aliases.iter() {
            if key == *alias {
                return Some(AliasMatch {
                    field,
                    score: EXACT_ALIAS_SCORE,
                });
            }
            let score = match_ratio(&key, alias);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(AliasMatch { field, score });
            }
        }
    }
    best
}

/// Matched-character ratio `2 * M / T` over a character diff, where `M` is
/// the number of characters in equal runs and `T` the combined length.
pub fn match_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return EXACT_ALIAS_SCORE;
    }
    let diff = TextDiff::from_chars(a, b);
    let matches: usize = diff
        .ops()
        .iter()
        .map(|op| match *op {
            DiffOp::Equal { len, .. } => len,
            _ => 0,
        })
        .sum();
    2.0 * matches as f64 / total as f64
}

/// Map raw columns onto the canonical fields, returning the table and the
/// canonical → original mapping.
pub fn map_schema(df: &RawTable) -> (CanonicalTable<MappedRecord>, ColumnMapping) {
    let names = column_names(df);
    let mut mapping = ColumnMapping::new();
    let mut used: HashSet<&str> = HashSet::new();

    for name in &names {
        let Some(m) = best_alias(name) else { continue };
        let slot_taken = FIRST_MATCH_WINS && mapping.contains_key(m.field);
        if m.score > ALIAS_MATCH_THRESHOLD && !slot_taken {
            debug!("Mapped column '{}' -> {} (score {:.2})", name, m.field, m.score);
            mapping.insert(m.field.to_string(), vec![name.clone()]);
            used.insert(name.as_str());
        }
    }

    if !mapping.contains_key("year") {
        if let Some(name) = names
            .iter()
            .filter(|n| !used.contains(n.as_str()))
            .find(|n| is_year_like(df, n))
        {
            debug!("Detected integer-valued column '{}' as year", name);
            mapping.insert("year".to_string(), vec![name.clone()]);
        }
    }

    let mut records = vec![MappedRecord::default(); df.height()];
    for field in CANONICAL_FIELDS {
        let Some(original) = mapping.get(*field).and_then(|cols| cols.first()) else {
            continue;
        };
        let values = column_strings(df, original).unwrap_or_default();
        for (record, value) in records.iter_mut().zip(values) {
            record.set(field, value);
        }
    }

    let table = CanonicalTable::new("mapped", mapping.clone(), records);
    (table, mapping)
}

/// Every non-null value is an integer or a digit string (and there is one).
fn is_year_like(df: &RawTable, name: &str) -> bool {
    let Ok(values) = column_strings(df, name) else {
        return false;
    };
    let mut present = values.iter().flatten().peekable();
    if present.peek().is_none() {
        return false;
    }
    if is_integer_column(df, name) {
        return true;
    }
    present.all(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CanonicalRecord;
    use polars::prelude::*;

    #[test]
    fn test_exact_alias_scores_one() {
        let m = best_alias("State Name").unwrap();
        assert_eq!(m.field, "state");
        assert_eq!(m.score, EXACT_ALIAS_SCORE);
    }

    #[test]
    fn test_fuzzy_alias_close_names() {
        let m = best_alias("district_nm").unwrap();
        assert_eq!(m.field, "district");
        assert!(m.score > ALIAS_MATCH_THRESHOLD);

        let m = best_alias("remarks").unwrap();
        assert!(m.score <= ALIAS_MATCH_THRESHOLD);
    }

    #[test]
    fn test_first_match_wins() {
        let df = df! [
            "state" => ["Kerala"],
            "state_name" => ["Goa"],
            "production" => ["10"]
        ]
        .unwrap();
        let (table, mapping) = map_schema(&df);
        assert_eq!(mapping["state"], vec!["state".to_string()]);
        assert_eq!(table.records[0].state.as_deref(), Some("Kerala"));
    }

    #[test]
    fn test_short_headers_reach_their_fields() {
        let m = best_alias("rain").unwrap();
        assert_eq!(m.field, "avg_annual_rainfall");
        assert!((m.score - 8.0 / 11.0).abs() < 1e-12);

        // shares "crop" with the crop aliases, only "year" with financial_year
        let m = best_alias("Crop_Year").unwrap();
        assert_eq!(m.field, "crop");
        assert!((m.score - 2.0 / 3.0).abs() < 1e-12);

        let df = df! [
            "State" => ["Goa"],
            "Year" => [2020i64],
            "crop_type" => ["Rice"],
            "rain" => ["2900"]
        ]
        .unwrap();
        let (table, mapping) = map_schema(&df);
        assert_eq!(mapping["avg_annual_rainfall"], vec!["rain".to_string()]);
        assert_eq!(mapping["crop"], vec!["crop_type".to_string()]);
        assert_eq!(table.records[0].avg_annual_rainfall.as_deref(), Some("2900"));
    }

    #[test]
    fn test_score_equal_to_threshold_is_rejected() {
        // "stn" keeps s, t, n of "st_name": 2 * 3 / 10
        let m = best_alias("stn").unwrap();
        assert_eq!(m.field, "state");
        assert_eq!(m.score, ALIAS_MATCH_THRESHOLD);

        let df = df! [ "stn" => ["Goa"], "annual_mm" => ["2900"] ].unwrap();
        let (_, mapping) = map_schema(&df);
        assert!(!mapping.contains_key("state"));
        // 2 * 5 / 16 against rain_mm clears the bar
        assert_eq!(mapping["avg_annual_rainfall"], vec!["annual_mm".to_string()]);
    }

    #[test]
    fn test_match_ratio_counts_equal_runs() {
        assert_eq!(match_ratio("", ""), EXACT_ALIAS_SCORE);
        assert_eq!(match_ratio("abc", "xyz"), 0.0);
        assert_eq!(match_ratio("year", "year"), 1.0);
        assert!((match_ratio("district_nm", "district") - 16.0 / 19.0).abs() < 1e-12);
    }

    #[test]
    fn test_year_fallback_on_digit_column() {
        let df = df! [
            "State_Name" => ["Kerala", "Kerala"],
            "Crop" => ["Rice", "Rice"],
            "Crop_Year" => ["2019", "2020"],
            "Production" => ["10", "12"]
        ]
        .unwrap();
        let (table, mapping) = map_schema(&df);

        assert_eq!(mapping["year"], vec!["Crop_Year".to_string()]);
        assert_eq!(table.records[1].year.as_deref(), Some("2020"));
        assert_eq!(table.records[0].avg_annual_rainfall, None);
    }

    #[test]
    fn test_output_always_has_all_fields() {
        let df = df! [ "qty" => [5i64] ].unwrap();
        let (table, mapping) = map_schema(&df);
        assert_eq!(mapping.len(), 1);
        assert_eq!(table.records[0].production.as_deref(), Some("5"));
        let frame = table.to_dataframe().unwrap();
        assert_eq!(frame.width(), MappedRecord::COLUMNS.len() + 1);
    }
}

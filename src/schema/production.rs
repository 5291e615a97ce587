//! Production normalizer - long-form crop tables to `ProductionRecord`s

use super::keywords::{
    clean_header, first_text, normalize_crop, normalize_state, normalize_text, parse_year,
    production_field, read_columns, sum_numbers,
};
use super::records::ProductionRecord;
use super::{CanonicalTable, ColumnMapping};
use crate::ingestion::{column_names, RawTable};
use tracing::{debug, info};

pub const PRODUCTION_SOURCE: &str = "production";

/// Normalize a raw production table.
///
/// Several source columns may collapse onto one canonical field. Numeric
/// fields (production, area) are summed across them so aliased columns never
/// silently overwrite each other; text fields take the first non-blank value.
pub fn normalize_production(raw: &RawTable) -> CanonicalTable<ProductionRecord> {
    let mut mapping = ColumnMapping::new();
    for name in column_names(raw) {
        if let Some(field) = production_field(&clean_header(&name)) {
            mapping.entry(field.to_string()).or_default().push(name);
        }
    }
    debug!("Production column mapping: {:?}", mapping);

    let columns_for = |field: &str| match mapping.get(field) {
        Some(names) => read_columns(raw, names),
        None => Vec::new(),
    };
    let state = columns_for("state");
    let district = columns_for("district");
    let year = columns_for("year");
    let crop = columns_for("crop");
    let season = columns_for("season");
    let production = columns_for("production");
    let area = columns_for("area");

    let records: Vec<ProductionRecord> = (0..raw.height())
        .map(|row| ProductionRecord {
            state: normalize_state(first_text(&state, row)),
            district: normalize_text(first_text(&district, row)),
            year: year
                .iter()
                .find_map(|c| parse_year(c.get(row).and_then(|v| v.as_deref()))),
            crop: normalize_crop(first_text(&crop, row)),
            season: normalize_text(first_text(&season, row)),
            production: sum_numbers(&production, row),
            area: sum_numbers(&area, row),
        })
        .collect();

    info!(
        "Normalized {} production rows ({} canonical fields mapped)",
        records.len(),
        mapping.len()
    );
    CanonicalTable::new(PRODUCTION_SOURCE, mapping, records)
}

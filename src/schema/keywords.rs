//! Column keyword rules and value coercion shared by the normalizers

use crate::ingestion::{column_strings, RawTable};

pub const UNKNOWN_STATE: &str = "Unknown";
pub const UNKNOWN_CROP: &str = "unknown";

/// Lower-case and trim a raw column header.
pub fn clean_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Canonical production field for a cleaned header, if any.
///
/// Rules are checked in order and a later rule overrides an earlier one,
/// so `crop_year` lands on `year` and `state_production` on `production`.
pub fn production_field(header: &str) -> Option<&'static str> {
    let mut field = None;
    if header.contains("state") {
        field = Some("state");
    }
    if header.contains("district") {
        field = Some("district");
    }
    if header.contains("crop") {
        field = Some("crop");
    }
    // any header containing "year" counts, not only an exact `year`, and it
    // beats the crop rule: `crop_year` is a year column here, unlike in the
    // alias mapper
    if header == "yyyy" || header.contains("year") {
        field = Some("year");
    }
    if header.contains("production") || header.contains("prod") {
        field = Some("production");
    }
    if header.contains("area") {
        field = Some("area");
    }
    if header.contains("season") {
        field = Some("season");
    }
    field
}

/// Canonical rainfall field for a cleaned header in a long-form table.
pub fn rainfall_field(header: &str) -> Option<&'static str> {
    let mut field = None;
    if header.contains("state") {
        field = Some("state");
    }
    if header.contains("district") {
        field = Some("district");
    }
    if header == "year" || header == "yyyy" {
        field = Some("year");
    }
    if header.contains("month") && !header.contains("month of") {
        field = Some("month");
    }
    if is_rain_word(header)
        || header.contains("rainfall")
        || (header.ends_with("_mm") && header.contains("rain"))
    {
        field = Some("rainfall_mm");
    }
    field
}

/// `rain` as a standalone word (underscores count as word characters).
fn is_rain_word(header: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    header.match_indices("rain").any(|(idx, m)| {
        let before = header[..idx].chars().next_back();
        let after = header[idx + m.len()..].chars().next();
        !before.map_or(false, is_word) && !after.map_or(false, is_word)
    })
}

/// Wide per-station rainfall column (`actual_rainfall_in_<station>_in_mm`).
pub fn is_station_column(name: &str) -> bool {
    let lower = clean_header(name);
    (lower.contains("actual") && lower.contains("rain")) || lower.starts_with("actual_rainfall")
}

/// Title-case the way `str.title()` does: upper after any non-letter.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

pub fn normalize_state(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => title_case(s),
        None => UNKNOWN_STATE.to_string(),
    }
}

pub fn normalize_crop(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_lowercase(),
        None => UNKNOWN_CROP.to_string(),
    }
}

pub fn normalize_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Numeric coercion; anything unparseable or non-finite is null.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Year coercion: accepts `2019` and `2019.0`, rejects fractions.
pub fn parse_year(raw: Option<&str>) -> Option<i32> {
    parse_number(raw)
        .filter(|v| v.fract() == 0.0 && v.abs() < i32::MAX as f64)
        .map(|v| v as i32)
}

/// Cells of several source columns, column-major. Unreadable columns are all-null.
pub fn read_columns(raw: &RawTable, names: &[String]) -> Vec<Vec<Option<String>>> {
    names
        .iter()
        .map(|name| column_strings(raw, name).unwrap_or_else(|_| vec![None; raw.height()]))
        .collect()
}

/// First non-blank cell among collapsed columns.
pub fn first_text(columns: &[Vec<Option<String>>], row: usize) -> Option<&str> {
    columns.iter().find_map(|c| {
        c.get(row)
            .and_then(|v| v.as_deref())
            .filter(|s| !s.trim().is_empty())
    })
}

fn numbers(columns: &[Vec<Option<String>>], row: usize) -> Vec<f64> {
    columns
        .iter()
        .filter_map(|c| parse_number(c.get(row).and_then(|v| v.as_deref())))
        .collect()
}

/// Row-wise sum of collapsed numeric columns; null when no cell parses.
pub fn sum_numbers(columns: &[Vec<Option<String>>], row: usize) -> Option<f64> {
    let values = numbers(columns, row);
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum())
    }
}

/// Row-wise mean of collapsed numeric columns; null when no cell parses.
pub fn mean_numbers(columns: &[Vec<Option<String>>], row: usize) -> Option<f64> {
    let values = numbers(columns, row);
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Case-insensitive comparison after trimming, used for query parameters.
pub fn same_key(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_rules_later_wins() {
        assert_eq!(production_field("state_name"), Some("state"));
        assert_eq!(production_field("crop_year"), Some("year"));
        assert_eq!(production_field("crop"), Some("crop"));
        assert_eq!(production_field("production_tonnes"), Some("production"));
        assert_eq!(production_field("prod_qtl"), Some("production"));
        assert_eq!(production_field("area_ha"), Some("area"));
        assert_eq!(production_field("kharif_season"), Some("season"));
        assert_eq!(production_field("remarks"), None);
    }

    #[test]
    fn test_year_headers_split_between_normalizer_and_mapper() {
        assert_eq!(production_field("financial_year"), Some("year"));
        assert_eq!(production_field("crop_year"), Some("year"));
        // the alias mapper scores the same header closest to crop_name
        let alias = crate::schema::best_alias("Crop_Year").unwrap();
        assert_eq!(alias.field, "crop");
    }

    #[test]
    fn test_rainfall_rules() {
        assert_eq!(rainfall_field("rain"), Some("rainfall_mm"));
        assert_eq!(rainfall_field("rain_mm"), Some("rainfall_mm"));
        assert_eq!(rainfall_field("avg_annual_rainfall"), Some("rainfall_mm"));
        assert_eq!(rainfall_field("terrain"), None);
        assert_eq!(rainfall_field("month"), Some("month"));
        assert_eq!(rainfall_field("month of report"), None);
        assert_eq!(rainfall_field("financial_year"), None);
    }

    #[test]
    fn test_station_column_detection() {
        assert!(is_station_column("actual_rainfall_in_karur_in_mm"));
        assert!(is_station_column("Actual Rain Kadavur"));
        assert!(!is_station_column("normal_rainfall_in_karur_in_mm"));
    }

    #[test]
    fn test_title_case_matches_python_semantics() {
        assert_eq!(title_case("tamil nadu"), "Tamil Nadu");
        assert_eq!(title_case("state_x"), "State_X");
        assert_eq!(title_case("JAMMU AND KASHMIR"), "Jammu And Kashmir");
        assert_eq!(normalize_state(Some("  ")), UNKNOWN_STATE);
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(parse_number(Some(" 12.5 ")), Some(12.5));
        assert_eq!(parse_number(Some("n/a")), None);
        assert_eq!(parse_number(Some("NaN")), None);
        assert_eq!(parse_year(Some("2019.0")), Some(2019));
        assert_eq!(parse_year(Some("2019.5")), None);
        assert_eq!(parse_year(None), None);
    }
}

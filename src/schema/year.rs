//! Year extraction from free-text period fields ("June'2018", "2018-19", "Jun 2018")

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A run of exactly four digits, not embedded in a longer digit run.
    static ref YEAR_RE: Regex = Regex::new(r"(?:^|[^0-9])([0-9]{4})(?:[^0-9]|$)").unwrap();
}

/// Id columns checked for an embedded year, in priority order.
pub const PERIOD_COLUMNS: &[&str] = &["month", "period", "peroid", "mon"];

pub fn extract_year(text: &str) -> Option<i32> {
    YEAR_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract a year per cell; `None` when no cell in the column yields one.
pub fn extract_years(values: &[Option<String>]) -> Option<Vec<Option<i32>>> {
    let years: Vec<Option<i32>> = values
        .iter()
        .map(|v| v.as_deref().and_then(extract_year))
        .collect();
    if years.iter().any(Option::is_some) {
        Some(years)
    } else {
        None
    }
}

/// Index into `names` of the highest-priority period-like column.
pub fn period_column(names: &[String]) -> Option<usize> {
    PERIOD_COLUMNS.iter().find_map(|candidate| {
        names
            .iter()
            .position(|n| n.trim().to_lowercase() == *candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_year_variants() {
        assert_eq!(extract_year("June'2018"), Some(2018));
        assert_eq!(extract_year("2018-19"), Some(2018));
        assert_eq!(extract_year("Jun2019"), Some(2019));
        assert_eq!(extract_year("2020"), Some(2020));
        assert_eq!(extract_year("id 123456"), None);
        assert_eq!(extract_year("June"), None);
    }

    #[test]
    fn test_extract_years_requires_a_hit() {
        let none = vec![Some("June".to_string()), None];
        assert_eq!(extract_years(&none), None);

        let some = vec![Some("June'2018".to_string()), Some("July".to_string())];
        assert_eq!(extract_years(&some), Some(vec![Some(2018), None]));
    }

    #[test]
    fn test_period_column_priority() {
        let names = vec!["Peroid".to_string(), "Month".to_string(), "Station".to_string()];
        assert_eq!(period_column(&names), Some(1));

        let names = vec!["mon".to_string(), "peroid".to_string()];
        assert_eq!(period_column(&names), Some(1));

        let names = vec!["station".to_string()];
        assert_eq!(period_column(&names), None);
    }
}

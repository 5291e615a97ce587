//! Station → state attribution for wide rainfall tables
//!
//! Best effort and NOT exhaustive: an external `station_substring,state`
//! table is consulted first, then a short built-in list of known stations.
//! Anything else is attributed to `"Unknown"`.

use super::{column_names, column_strings, load_csv, RawTable};
use std::path::Path;
use tracing::{debug, warn};

pub const UNKNOWN_STATE: &str = "Unknown";

/// Substrings of station names from the Karur district sample (Tamil Nadu).
pub const FALLBACK_STATIONS: &[(&str, &str)] = &[
    ("karur", "Tamil Nadu"),
    ("aravakurichi", "Tamil Nadu"),
    ("paramathi", "Tamil Nadu"),
    ("anaipalyam", "Tamil Nadu"),
    ("kulithalai", "Tamil Nadu"),
    ("thogaimalai", "Tamil Nadu"),
    ("kadavur", "Tamil Nadu"),
    ("palaviduthi", "Tamil Nadu"),
    ("mayanur", "Tamil Nadu"),
    ("panchapatti", "Tamil Nadu"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationStateMap {
    /// (lower-cased substring, state) in file order
    entries: Vec<(String, String)>,
}

impl StationStateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the mapping table. A missing or malformed file gives an empty map.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No station map at {}, using fallback list", path.display());
            return Self::new();
        }
        let map = Self::from_table(&load_csv(path));
        if map.is_empty() {
            warn!("Station map {} had no usable rows", path.display());
        }
        map
    }

    pub fn from_table(df: &RawTable) -> Self {
        let names = column_names(df);
        let find = |wanted: &str| {
            names
                .iter()
                .find(|n| n.trim().eq_ignore_ascii_case(wanted))
                .cloned()
        };
        let (Some(sub_col), Some(state_col)) = (find("station_substring"), find("state")) else {
            return Self::new();
        };
        let (Ok(subs), Ok(states)) =
            (column_strings(df, &sub_col), column_strings(df, &state_col))
        else {
            return Self::new();
        };

        let mut map = Self::new();
        for (sub, state) in subs.into_iter().zip(states) {
            if let (Some(sub), Some(state)) = (sub, state) {
                map.insert(&sub, &state);
            }
        }
        map
    }

    /// Add or replace a mapping; replacing keeps the original position.
    pub fn insert(&mut self, substring: &str, state: &str) {
        let key = substring.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        let state = state.trim().to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = state,
            None => self.entries.push((key, state)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolve a cleaned station name to a state.
    pub fn attribute(&self, station: &str) -> String {
        let lowered = station.to_lowercase();
        if let Some((_, state)) = self
            .entries
            .iter()
            .find(|(sub, _)| lowered.contains(sub.as_str()))
        {
            return state.clone();
        }
        FALLBACK_STATIONS
            .iter()
            .find(|(sub, _)| lowered.contains(sub))
            .map(|(_, state)| state.to_string())
            .unwrap_or_else(|| UNKNOWN_STATE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_fallback_and_unknown() {
        let map = StationStateMap::new();
        assert_eq!(map.attribute("Karur Town"), "Tamil Nadu");
        assert_eq!(map.attribute("mayanur"), "Tamil Nadu");
        assert_eq!(map.attribute("Shimoga"), UNKNOWN_STATE);
    }

    #[test]
    fn test_external_table_wins_over_fallback() {
        let df = df! [
            "station_substring" => ["Karur", "shimoga"],
            "state" => ["Overridden", "Karnataka"]
        ]
        .unwrap();
        let map = StationStateMap::from_table(&df);

        assert_eq!(map.len(), 2);
        assert_eq!(map.attribute("karur"), "Overridden");
        assert_eq!(map.attribute("Shimoga Rural"), "Karnataka");
        assert_eq!(map.attribute("kadavur"), "Tamil Nadu");
    }

    #[test]
    fn test_table_without_expected_columns_is_empty() {
        let df = df! [ "station" => ["karur"] ].unwrap();
        assert!(StationStateMap::from_table(&df).is_empty());
        assert!(StationStateMap::load(Path::new("/no/such/map.csv")).is_empty());
    }
}

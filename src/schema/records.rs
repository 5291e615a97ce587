use super::CanonicalRecord;
use serde::{Deserialize, Serialize};

/// One row of normalized agricultural production.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    /// Title-cased; "Unknown" when absent
    pub state: String,
    pub district: Option<String>,
    pub year: Option<i32>,
    /// Trimmed, lower-cased
    pub crop: String,
    pub season: Option<String>,
    /// Tonnes
    pub production: Option<f64>,
    pub area: Option<f64>,
}

impl CanonicalRecord for ProductionRecord {
    const COLUMNS: &'static [&'static str] =
        &["state", "district", "year", "crop", "season", "production", "area"];

    fn values(&self) -> Vec<Option<String>> {
        vec![
            Some(self.state.clone()),
            self.district.clone(),
            self.year.map(|y| y.to_string()),
            Some(self.crop.clone()),
            self.season.clone(),
            self.production.map(|p| p.to_string()),
            self.area.map(|a| a.to_string()),
        ]
    }
}

/// One row of normalized rainfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallRecord {
    pub state: String,
    pub district: Option<String>,
    pub year: Option<i32>,
    pub month: Option<String>,
    pub rainfall_mm: Option<f64>,
}

impl CanonicalRecord for RainfallRecord {
    const COLUMNS: &'static [&'static str] = &["state", "district", "year", "month", "rainfall_mm"];

    fn values(&self) -> Vec<Option<String>> {
        vec![
            Some(self.state.clone()),
            self.district.clone(),
            self.year.map(|y| y.to_string()),
            self.month.clone(),
            self.rainfall_mm.map(|r| r.to_string()),
        ]
    }
}

/// Output row of the alias-based mapper. Values are passed through as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedRecord {
    pub state: Option<String>,
    pub district: Option<String>,
    pub year: Option<String>,
    pub crop: Option<String>,
    pub production: Option<String>,
    pub avg_annual_rainfall: Option<String>,
}

impl MappedRecord {
    /// Set a field by canonical name; unknown names are ignored.
    pub fn set(&mut self, field: &str, value: Option<String>) {
        match field {
            "state" => self.state = value,
            "district" => self.district = value,
            "year" => self.year = value,
            "crop" => self.crop = value,
            "production" => self.production = value,
            "avg_annual_rainfall" => self.avg_annual_rainfall = value,
            _ => {}
        }
    }
}

impl CanonicalRecord for MappedRecord {
    const COLUMNS: &'static [&'static str] = &[
        "state",
        "district",
        "year",
        "crop",
        "production",
        "avg_annual_rainfall",
    ];

    fn values(&self) -> Vec<Option<String>> {
        vec![
            self.state.clone(),
            self.district.clone(),
            self.year.clone(),
            self.crop.clone(),
            self.production.clone(),
            self.avg_annual_rainfall.clone(),
        ]
    }
}

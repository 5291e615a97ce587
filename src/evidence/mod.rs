//! Evidence pipeline
//!
//! Loosely-typed evidence records are normalized into [`EvidenceItem`]s
//! (known fields typed, everything else kept in `extra`), ranked, and turned
//! into templated pro/con [`Argument`]s that cite the items they used.

pub mod generator;
pub mod normalize;

pub use generator::generate_policy_argument;
pub use normalize::{normalize_evidence, normalize_evidence_at};

use crate::error::{QaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parse raw evidence JSON. The top level must be an array of records.
pub fn parse_evidence(json: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(items) => Ok(items),
        other => Err(QaError::Evidence(format!(
            "expected a JSON array of evidence records, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: String,
    pub date: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub headline: Option<String>,
    /// Always within [0, 1]
    pub score: f64,
    pub trust: Option<bool>,
    pub relevance: Option<f64>,
    /// Unrecognized input fields, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EvidenceItem {
    /// Headline, then an extra `title`, then source, then id.
    pub fn label(&self) -> &str {
        self.headline
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.extra
                    .get("title")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
            .or_else(|| self.source.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(self.id.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Pro,
    Con,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub title: String,
    pub argument: String,
    pub stance: Stance,
    /// Mean score of the cited evidence
    pub provenance: f64,
    /// Cited evidence ids, in selection order
    pub sources: Vec<String>,
}

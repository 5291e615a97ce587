//! Evidence normalization and heuristic scoring

use super::EvidenceItem;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const BASE_SCORE: f64 = 0.5;
pub const RECENT_DAYS: i64 = 365;
pub const RECENT_BOOST: f64 = 0.2;
pub const AGED_DAYS: i64 = 365 * 5;
pub const AGED_BOOST: f64 = 0.1;
pub const TRUST_BOOST: f64 = 0.1;
pub const MAX_RELEVANCE_BOOST: f64 = 0.3;

const KNOWN_FIELDS: [&str; 7] = ["id", "date", "source", "headline", "score", "trust", "relevance"];

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Normalize against the current time.
pub fn normalize_evidence(items: &[Value]) -> Vec<EvidenceItem> {
    normalize_evidence_at(items, Utc::now())
}

/// Normalize against a fixed clock.
///
/// Missing ids become `ev<index>`. Unparseable dates become `None`. Items
/// without a numeric score get the recency/trust/relevance heuristic; every
/// score is clamped to [0, 1].
pub fn normalize_evidence_at(items: &[Value], now: DateTime<Utc>) -> Vec<EvidenceItem> {
    items
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let empty = Map::new();
            let fields = match raw.as_object() {
                Some(map) => map,
                None => {
                    warn!("Evidence item {} is not an object; treating it as empty", i);
                    &empty
                }
            };
            normalize_item(i, fields, now)
        })
        .collect()
}

fn normalize_item(index: usize, fields: &Map<String, Value>, now: DateTime<Utc>) -> EvidenceItem {
    let id = match fields.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(v) if !v.is_null() => v.to_string(),
        _ => format!("ev{}", index),
    };
    let date = fields.get("date").and_then(parse_date);
    let trust = fields.get("trust").and_then(truthy);
    let relevance = fields.get("relevance").and_then(number);

    let score = match fields.get("score").and_then(number) {
        Some(given) => given,
        None => heuristic_score(date, trust, relevance, now),
    }
    .clamp(0.0, 1.0);
    debug!("Evidence {} scored {:.2}", id, score);

    EvidenceItem {
        id,
        date,
        source: fields.get("source").and_then(text),
        headline: fields.get("headline").and_then(text),
        score,
        trust,
        relevance,
        extra: fields
            .iter()
            .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

fn heuristic_score(
    date: Option<DateTime<Utc>>,
    trust: Option<bool>,
    relevance: Option<f64>,
    now: DateTime<Utc>,
) -> f64 {
    let mut score = BASE_SCORE;
    if let Some(date) = date {
        let days = (now - date).num_days();
        if days < RECENT_DAYS {
            score += RECENT_BOOST;
        } else if days < AGED_DAYS {
            score += AGED_BOOST;
        }
    }
    if trust == Some(true) {
        score += TRUST_BOOST;
    }
    if let Some(r) = relevance.filter(|r| *r != 0.0) {
        score += (r / 10.0).min(MAX_RELEVANCE_BOOST);
    }
    score
}

/// RFC 3339, ISO date-times with or without seconds, or a bare date.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Truthiness of a loosely-typed flag. `null` stays unknown.
fn truthy(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        Value::Number(n) => Some(n.as_f64().map_or(false, |v| v != 0.0)),
        Value::String(s) => Some(!s.is_empty()),
        Value::Array(a) => Some(!a.is_empty()),
        Value::Object(o) => Some(!o.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_ids_and_pass_through_fields() {
        let items = normalize_evidence_at(
            &[
                json!({ "headline": "Millet yields rise", "region": "Goa" }),
                json!({ "id": "custom", "source": "ICAR" }),
            ],
            now(),
        );
        assert_eq!(items[0].id, "ev0");
        assert_eq!(items[0].extra["region"], "Goa");
        assert!(!items[0].extra.contains_key("headline"));
        assert_eq!(items[1].id, "custom");
        assert_eq!(items[1].source.as_deref(), Some("ICAR"));
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(
            parse_date(&json!("2024-01-02")),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date(&json!("2024-01-02T03:04:05")),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(
            parse_date(&json!("2024-01-02 03:04:05.250")).map(|d| d.timestamp_millis() % 1000),
            Some(250)
        );
        assert_eq!(
            parse_date(&json!("2024-01-02T03:04:05+05:30")),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 21, 34, 5).unwrap())
        );
        assert_eq!(parse_date(&json!("02/01/2024")), None);
        assert_eq!(parse_date(&json!(20240102)), None);
    }

    #[test]
    fn test_heuristic_scores() {
        let items = normalize_evidence_at(
            &[
                json!({}),
                json!({ "date": "2024-01-01" }),
                json!({ "date": "2021-01-01", "trust": true }),
                json!({ "date": "2010-01-01", "relevance": 2 }),
                json!({ "date": "not a date", "relevance": "9" }),
            ],
            now(),
        );
        let scores: Vec<f64> = items.iter().map(|e| (e.score * 100.0).round() / 100.0).collect();
        assert_eq!(scores, vec![0.5, 0.7, 0.7, 0.7, 0.8]);
        assert_eq!(items[4].date, None);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let items = normalize_evidence_at(
            &[
                json!({ "date": "2024-05-01", "trust": 1, "relevance": 50 }),
                json!({ "score": 7.5 }),
                json!({ "score": -2 }),
                json!({ "relevance": -100 }),
                json!("not an object"),
            ],
            now(),
        );
        assert_eq!(items[0].score, 1.0);
        assert_eq!(items[1].score, 1.0);
        assert_eq!(items[2].score, 0.0);
        assert_eq!(items[3].score, 0.0);
        assert_eq!(items[4].score, 0.5);
        assert_eq!(items[4].id, "ev4");
    }
}

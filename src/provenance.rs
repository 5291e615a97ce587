//! Provenance aggregation over generated arguments

use crate::evidence::Argument;
use crate::query::DatasetArgument;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceScore {
    pub mean: f64,
    /// Absent when there are no arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weighted: Option<f64>,
}

/// Mean provenance, plus a rank-weighted variant.
///
/// The weighted form sorts values descending and multiplies the value at
/// rank `i` by `(i + 1) / n`, so the strongest argument gets the smallest
/// weight. Kept as-is for compatibility with existing scores.
pub fn provenance_score(arguments: &[Argument]) -> ProvenanceScore {
    if arguments.is_empty() {
        return ProvenanceScore {
            mean: 0.0,
            weighted: None,
        };
    }
    let mut values: Vec<f64> = arguments.iter().map(|a| a.provenance).collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    values.sort_by(|a, b| b.total_cmp(a));
    let weighted = values
        .iter()
        .enumerate()
        .map(|(i, v)| v * ((i + 1) as f64 / n))
        .sum::<f64>()
        / n;

    ProvenanceScore {
        mean,
        weighted: Some(weighted),
    }
}

/// Number of distinct source URLs cited across dataset arguments.
pub fn distinct_source_count(arguments: &[DatasetArgument]) -> usize {
    arguments
        .iter()
        .flat_map(|a| a.sources.iter().map(|s| s.url.as_str()))
        .collect::<HashSet<_>>()
        .len()
}

//! Deterministic pro/con argument synthesis from ranked evidence

use super::{Argument, EvidenceItem, Stance};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Evidence items cited per argument
pub const ITEMS_PER_ARGUMENT: usize = 3;
/// Below or at this many items, slots rotate over the same ranked list
pub const ROTATION_LIMIT: usize = 3;
pub const TITLE_CHARS: usize = 80;

fn render(stance: Stance, question: &str, summary: &str) -> String {
    match stance {
        Stance::Pro => format!(
            "Expand program: {} - benefits. Evidence: {}.",
            question, summary
        ),
        Stance::Con => format!(
            "Caution against expansion: {} - risks. Evidence: {}.",
            question, summary
        ),
    }
}

/// Score descending, then date descending; undated items sort as the epoch.
fn rank(a: &EvidenceItem, b: &EvidenceItem) -> Ordering {
    let ts = |e: &EvidenceItem| e.date.map_or(0, |d| d.timestamp_micros());
    b.score.total_cmp(&a.score).then_with(|| ts(b).cmp(&ts(a)))
}

/// Build `top_k` arguments, alternating pro (even slots) and con (odd slots).
///
/// With at most three items each slot takes a window rotated by the slot
/// index, so the arguments differ while staying reproducible. With more,
/// each slot takes the best items not yet cited, falling back to the overall
/// top items once everything has been used.
pub fn generate_policy_argument(
    question: &str,
    evidence: &[EvidenceItem],
    top_k: usize,
) -> Vec<Argument> {
    let mut ranked: Vec<&EvidenceItem> = evidence.iter().collect();
    ranked.sort_by(|a, b| rank(a, b));
    let n = ranked.len();

    let mut used: HashSet<&str> = HashSet::new();
    let mut arguments = Vec::with_capacity(top_k);

    for slot in 0..top_k {
        let stance = if slot % 2 == 0 { Stance::Pro } else { Stance::Con };

        let mut selected: Vec<&EvidenceItem> = if n == 0 {
            Vec::new()
        } else if n <= ROTATION_LIMIT {
            let start = slot % n;
            (0..n.min(ITEMS_PER_ARGUMENT))
                .map(|j| ranked[(start + j) % n])
                .collect()
        } else {
            let mut picked = Vec::new();
            for item in &ranked {
                if picked.len() >= ITEMS_PER_ARGUMENT {
                    break;
                }
                if used.insert(item.id.as_str()) {
                    picked.push(*item);
                }
            }
            picked
        };
        if selected.is_empty() {
            selected = ranked.iter().take(ITEMS_PER_ARGUMENT).copied().collect();
        }

        let summary = selected
            .iter()
            .take(ITEMS_PER_ARGUMENT)
            .map(|e| e.label())
            .collect::<Vec<_>>()
            .join(" | ");
        let provenance = if selected.is_empty() {
            0.0
        } else {
            selected.iter().map(|e| e.score).sum::<f64>() / selected.len() as f64
        };
        let prefix = match stance {
            Stance::Pro => "For",
            Stance::Con => "Against",
        };

        debug!("Argument slot {} ({:?}) cites {} items", slot, stance, selected.len());
        arguments.push(Argument {
            title: format!("{}: {}", prefix, summary.chars().take(TITLE_CHARS).collect::<String>()),
            argument: render(stance, question, &summary),
            stance,
            provenance,
            sources: selected.iter().map(|e| e.id.clone()).collect(),
        });
    }

    arguments
}

//! Final pack ranking: arc-first total ordering with a diversity demotion
//! on near-equal ties and stable fallbacks.

use serde::{Deserialize, Serialize};

use crate::constants::{DIVERSITY_WEIGHT_CAP, NEAR_EQUAL_ARC_DELTA};
use crate::numbers::round6;

/// Diversity demotion policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversityPolicy {
    pub enabled: bool,
    /// Penalty per same-family plan stop; capped at 0.01.
    pub weight: f64,
}

impl Default for DiversityPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: DIVERSITY_WEIGHT_CAP,
        }
    }
}

/// Ranking knobs for the replacement pack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementRanking {
    pub diversity: DiversityPolicy,
    /// Tolerance for treating two arc deltas as tied.
    pub near_equal_arc_delta: f64,
}

impl Default for ReplacementRanking {
    fn default() -> Self {
        Self {
            diversity: DiversityPolicy::default(),
            near_equal_arc_delta: NEAR_EQUAL_ARC_DELTA,
        }
    }
}

/// One suggestion as seen by the ranker.
#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry {
    pub id: String,
    pub arc_delta: f64,
    /// How many plan stops already share the candidate's family.
    pub family_count: usize,
    /// Legacy pass order: reorder, primary, repair, reorder-repair.
    pub pass_order: u8,
}

fn penalty(entry: &RankEntry, options: &ReplacementRanking) -> f64 {
    if options.diversity.enabled {
        options.diversity.weight.clamp(0.0, DIVERSITY_WEIGHT_CAP)
            * crate::numbers::usize_to_f64(entry.family_count)
    } else {
        0.0
    }
}

fn stable_order(a: &RankEntry, b: &RankEntry, key_a: f64, key_b: f64) -> std::cmp::Ordering {
    key_b
        .partial_cmp(&key_a)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.pass_order.cmp(&b.pass_order))
        .then_with(|| a.id.cmp(&b.id))
}

/// Rank entries, returning indices into the input in final pack order.
#[must_use]
pub fn ranked_indices(entries: &[RankEntry], options: &ReplacementRanking) -> Vec<usize> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    // First a total order on the rounded arc delta alone.
    order.sort_by(|&a, &b| {
        stable_order(
            &entries[a],
            &entries[b],
            round6(entries[a].arc_delta),
            round6(entries[b].arc_delta),
        )
    });

    // Then re-rank each near-equal run with the diversity demotion applied.
    let tolerance = options.near_equal_arc_delta.clamp(0.0, 1.0);
    let mut start = 0;
    while start < order.len() {
        let leader_key = round6(entries[order[start]].arc_delta);
        let mut end = start + 1;
        while end < order.len()
            && (leader_key - round6(entries[order[end]].arc_delta)).abs() <= tolerance
        {
            end += 1;
        }
        if end - start > 1 {
            order[start..end].sort_by(|&a, &b| {
                stable_order(
                    &entries[a],
                    &entries[b],
                    round6(entries[a].arc_delta) - penalty(&entries[a], options),
                    round6(entries[b].arc_delta) - penalty(&entries[b], options),
                )
            });
        }
        start = end;
    }
    order
}

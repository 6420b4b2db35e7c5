//! Refinement telemetry: the debug stats payload surfaced alongside a
//! suggestion pack.
//!
//! Every field except the wall-clock timings is deterministic for a given
//! plan, options, and resolver response sequence.

use serde::{Deserialize, Serialize};

use crate::resolver::ResolverTelemetry;
use crate::tilt::{TiltProfile, WeightMap};

/// Why a replacement candidate was discarded, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    DuplicatePlaceId,
    InvariantViolation,
    IncreasesHardConstraints,
    NoArcImprovement,
    WorsensJourneyScore,
    IncreasesViolations,
    RoleMismatch,
    MissingStopProfile,
}

impl DiscardReason {
    /// Canonical ordering used for telemetry maps.
    pub const ALL: [Self; 8] = [
        Self::DuplicatePlaceId,
        Self::InvariantViolation,
        Self::IncreasesHardConstraints,
        Self::NoArcImprovement,
        Self::WorsensJourneyScore,
        Self::IncreasesViolations,
        Self::RoleMismatch,
        Self::MissingStopProfile,
    ];
}

/// Discard tallies keyed by the ordered discard-reason enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct DiscardCounts {
    pub duplicate_place_id: u32,
    pub invariant_violation: u32,
    pub increases_hard_constraints: u32,
    pub no_arc_improvement: u32,
    pub worsens_journey_score: u32,
    pub increases_violations: u32,
    pub role_mismatch: u32,
    pub missing_stop_profile: u32,
}

impl DiscardCounts {
    pub fn increment(&mut self, reason: DiscardReason) {
        let slot = match reason {
            DiscardReason::DuplicatePlaceId => &mut self.duplicate_place_id,
            DiscardReason::InvariantViolation => &mut self.invariant_violation,
            DiscardReason::IncreasesHardConstraints => &mut self.increases_hard_constraints,
            DiscardReason::NoArcImprovement => &mut self.no_arc_improvement,
            DiscardReason::WorsensJourneyScore => &mut self.worsens_journey_score,
            DiscardReason::IncreasesViolations => &mut self.increases_violations,
            DiscardReason::RoleMismatch => &mut self.role_mismatch,
            DiscardReason::MissingStopProfile => &mut self.missing_stop_profile,
        };
        *slot = slot.saturating_add(1);
    }

    #[must_use]
    pub fn get(&self, reason: DiscardReason) -> u32 {
        match reason {
            DiscardReason::DuplicatePlaceId => self.duplicate_place_id,
            DiscardReason::InvariantViolation => self.invariant_violation,
            DiscardReason::IncreasesHardConstraints => self.increases_hard_constraints,
            DiscardReason::NoArcImprovement => self.no_arc_improvement,
            DiscardReason::WorsensJourneyScore => self.worsens_journey_score,
            DiscardReason::IncreasesViolations => self.increases_violations,
            DiscardReason::RoleMismatch => self.role_mismatch,
            DiscardReason::MissingStopProfile => self.missing_stop_profile,
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        DiscardReason::ALL
            .iter()
            .map(|&reason| self.get(reason))
            .sum()
    }
}

/// Which refinement pass produced the kept suggestion set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PassUsed {
    #[default]
    None,
    Primary,
    Repair,
    ReorderRepair,
}

/// Seen/kept/discarded counters for one replacement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PassCounters {
    pub seen: u32,
    pub kept: u32,
    pub discarded: u32,
}

/// Counters for the reorder-repair fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRepairCounters {
    pub evaluated: u32,
    pub kept: u32,
    /// Journey-score deltas of the best evaluated orders, descending.
    #[serde(default)]
    pub top_deltas: Vec<f64>,
}

/// Per-pass breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PassBreakdown {
    pub primary: PassCounters,
    pub repair: PassCounters,
    pub reorder_repair: ReorderRepairCounters,
}

/// Constraint movement of the best kept candidate against baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TopConstraintDelta {
    pub baseline_hard: usize,
    pub baseline_soft: usize,
    pub after_hard: usize,
    pub after_soft: usize,
    pub hard_delta: i64,
    pub soft_delta: i64,
}

/// Wall-clock stage timings in milliseconds. Excluded from determinism
/// guarantees; always non-negative by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimingMs {
    pub total: u64,
    pub resolver: u64,
    pub prep: u64,
    pub evaluation: u64,
    pub ranking: u64,
}

/// Full refinement debug payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefineStats {
    pub candidate_count: u32,
    pub evaluated_count: u32,
    pub discarded_count: u32,
    pub discard_counts: DiscardCounts,
    pub pass_used: PassUsed,
    pub pass_breakdown: PassBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_constraint_delta: Option<TopConstraintDelta>,
    #[serde(default)]
    pub resolver: Vec<ResolverTelemetry>,
    pub timing: TimingMs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_map: Option<WeightMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt_profile: Option<TiltProfile>,
}

//! Scoring primitives: intent alignment, fatigue penalty, friction penalty,
//! and the composite journey score.
//!
//! All accumulations run in stop order in a single pass so repeated
//! evaluations of the same plan are bit-identical.

use serde::{Deserialize, Serialize};

use crate::constants::{
    FATIGUE_WEIGHT_DOUBLE_PEAK, FATIGUE_WEIGHT_NO_TAPER, FATIGUE_WEIGHT_PEAK_DEVIATION,
    FRICTION_BACKTRACK_STEP, FRICTION_EDGE_FREE_MIN, FRICTION_EDGE_MAX_MIN, FRICTION_EDGE_MID_MIN,
    FRICTION_TRAVEL_SHARE_FLOOR, FRICTION_TRAVEL_SHARE_SPAN, FRICTION_WEIGHT_BACKTRACK,
    FRICTION_WEIGHT_EDGE, FRICTION_WEIGHT_TRAVEL_SHARE, INTENT_IMPORTANCE_FLOOR,
    SCORE_WEIGHT_FATIGUE, SCORE_WEIGHT_FRICTION, SCORE_WEIGHT_INTENT,
};
use crate::numbers::{clamp01, usize_to_f64};
use crate::plan::{IntentVector, Plan};
use crate::travel::TravelSummary;
use crate::vibes::{effective_importance, effective_target};

/// Intent alignment across the journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentBreakdown {
    /// Weighted alignment per stop, in stop order.
    pub per_stop: Vec<f64>,
    /// Journey intent score, the clamped average across stops.
    pub score: f64,
}

/// Weighted alignment of one intent vector against a target.
#[must_use]
pub fn stop_intent_alignment(
    stop_vector: &IntentVector,
    target: &IntentVector,
    importance: &IntentVector,
) -> f64 {
    let stop_axes = stop_vector.clamped().axes();
    let target_axes = target.axes();
    let importance_axes = importance.axes();
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for axis in 0..stop_axes.len() {
        let weight = importance_axes[axis].max(INTENT_IMPORTANCE_FLOOR);
        let alignment = clamp01(1.0 - (stop_axes[axis] - target_axes[axis]).abs());
        weighted += weight * alignment;
        weight_sum += weight;
    }
    clamp01(weighted / weight_sum)
}

/// Intent score for the whole plan against its effective vibe vectors.
#[must_use]
pub fn intent_breakdown(plan: &Plan) -> IntentBreakdown {
    let profile = &plan.meta.idea_date;
    let target = effective_target(profile);
    let importance = effective_importance(profile);
    let per_stop: Vec<f64> = plan
        .stops
        .iter()
        .map(|stop| stop_intent_alignment(&stop.idea_date.intent_vector, &target, &importance))
        .collect();
    let score = if per_stop.is_empty() {
        0.0
    } else {
        clamp01(per_stop.iter().sum::<f64>() / usize_to_f64(per_stop.len()))
    };
    IntentBreakdown { per_stop, score }
}

/// Structured fatigue subcomponents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatigueBreakdown {
    pub penalty: f64,
    pub ideal_peak_index: usize,
    pub actual_peak_index: usize,
    pub peak_deviation: f64,
    pub double_peak: bool,
    pub no_taper: bool,
}

/// Ideal peak position for a journey of `stop_count` stops.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ideal_peak_index(stop_count: usize) -> usize {
    if stop_count == 0 {
        return 0;
    }
    let rounded = (usize_to_f64(stop_count) * 0.5).round() as usize;
    rounded.min(stop_count - 1)
}

/// Fatigue penalty from the energy curve shape.
#[must_use]
pub fn fatigue_breakdown(energy: &[f64]) -> FatigueBreakdown {
    if energy.is_empty() {
        return FatigueBreakdown {
            penalty: 0.0,
            ideal_peak_index: 0,
            actual_peak_index: 0,
            peak_deviation: 0.0,
            double_peak: false,
            no_taper: false,
        };
    }

    let count = energy.len();
    let ideal = ideal_peak_index(count);
    let mut peak_value = f64::MIN;
    let mut actual = 0;
    for (index, &value) in energy.iter().enumerate() {
        if value > peak_value {
            peak_value = value;
            actual = index;
        }
    }
    let peak_matches = energy
        .iter()
        .filter(|&&value| (value - peak_value).abs() < f64::EPSILON)
        .count();
    let double_peak = peak_matches > 1;
    let no_taper = energy[count - 1] >= peak_value;
    let peak_deviation = usize_to_f64(actual.abs_diff(ideal)) / usize_to_f64(count);

    let penalty = clamp01(
        FATIGUE_WEIGHT_PEAK_DEVIATION * peak_deviation
            + FATIGUE_WEIGHT_DOUBLE_PEAK * f64::from(u8::from(double_peak))
            + FATIGUE_WEIGHT_NO_TAPER * f64::from(u8::from(no_taper)),
    );
    FatigueBreakdown {
        penalty,
        ideal_peak_index: ideal,
        actual_peak_index: actual,
        peak_deviation,
        double_peak,
        no_taper,
    }
}

/// Structured friction subcomponents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrictionBreakdown {
    pub penalty: f64,
    pub edge_penalty: f64,
    /// Per-transition penalty, in edge order.
    pub edge_penalties: Vec<f64>,
    pub travel_share: f64,
    pub travel_share_penalty: f64,
    pub backtracking_penalty: f64,
    pub revisit_count: usize,
}

/// Penalty for one transfer, from free through painful.
#[must_use]
pub fn edge_penalty_for_minutes(minutes: f64) -> f64 {
    if minutes <= FRICTION_EDGE_FREE_MIN {
        0.0
    } else if minutes <= FRICTION_EDGE_MID_MIN {
        (minutes - FRICTION_EDGE_FREE_MIN) / (FRICTION_EDGE_MID_MIN - FRICTION_EDGE_FREE_MIN) * 0.5
    } else {
        clamp01(
            0.5 + (minutes - FRICTION_EDGE_MID_MIN) / (FRICTION_EDGE_MAX_MIN - FRICTION_EDGE_MID_MIN)
                * 0.5,
        )
    }
}

/// Friction penalty from transfer lengths, travel share, and backtracking.
#[must_use]
pub fn friction_breakdown(travel: &TravelSummary) -> FrictionBreakdown {
    let edge_penalties: Vec<f64> = travel
        .edges
        .iter()
        .map(|edge| edge_penalty_for_minutes(f64::from(edge.minutes)))
        .collect();
    let edge_penalty = if edge_penalties.is_empty() {
        0.0
    } else {
        edge_penalties.iter().sum::<f64>() / usize_to_f64(edge_penalties.len())
    };

    let total_travel = f64::from(travel.total_travel_min);
    let denominator = (total_travel + f64::from(travel.total_stop_min)).max(1.0);
    let travel_share = total_travel / denominator;
    let travel_share_penalty = if travel_share <= FRICTION_TRAVEL_SHARE_FLOOR {
        0.0
    } else {
        clamp01((travel_share - FRICTION_TRAVEL_SHARE_FLOOR) / FRICTION_TRAVEL_SHARE_SPAN)
    };

    let mut seen = std::collections::HashSet::new();
    let mut revisit_count = 0;
    if let Some(first) = travel.edges.first() {
        seen.insert(first.from_key.clone());
    }
    for edge in &travel.edges {
        if seen.contains(&edge.to_key) && edge.to_key != edge.from_key {
            revisit_count += 1;
        }
        seen.insert(edge.to_key.clone());
    }
    let backtracking_penalty = clamp01(FRICTION_BACKTRACK_STEP * usize_to_f64(revisit_count));

    let penalty = clamp01(
        FRICTION_WEIGHT_EDGE * edge_penalty
            + FRICTION_WEIGHT_TRAVEL_SHARE * travel_share_penalty
            + FRICTION_WEIGHT_BACKTRACK * backtracking_penalty,
    );
    FrictionBreakdown {
        penalty,
        edge_penalty,
        edge_penalties,
        travel_share,
        travel_share_penalty,
        backtracking_penalty,
        revisit_count,
    }
}

/// Composite journey score on [0, 1].
#[must_use]
pub fn journey_score(intent: f64, fatigue_penalty: f64, friction_penalty: f64) -> f64 {
    clamp01(
        SCORE_WEIGHT_INTENT * clamp01(intent)
            + SCORE_WEIGHT_FATIGUE * (1.0 - clamp01(fatigue_penalty))
            + SCORE_WEIGHT_FRICTION * (1.0 - clamp01(friction_penalty)),
    )
}

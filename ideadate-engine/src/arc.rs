//! Arc model and per-stop arc contribution.
//!
//! The arc model is the energy polyline with its shape flags. Arc
//! contribution decomposes each stop's net effect on arc quality into
//! positive factors (smoothness, peak alignment, taper integrity) and
//! penalty factors (fatigue, friction), blended under the active weight map.

use serde::{Deserialize, Serialize};

use crate::constants::{
    ARC_PENALTY_FATIGUE, ARC_PENALTY_FRICTION, ARC_POSITIVE_PEAK, ARC_POSITIVE_SMOOTHNESS,
    ARC_POSITIVE_TAPER, ARC_TAPER_DECAY, ARC_Y_BASE, ARC_Y_SPAN,
};
use crate::numbers::{clamp01, usize_to_f64};
use crate::scoring::{FatigueBreakdown, FrictionBreakdown};
use crate::tilt::WeightMap;

/// One point of the energy polyline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcPoint {
    pub x: f64,
    pub y: f64,
}

/// Energy curve across the journey with its shape flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcModel {
    pub points: Vec<ArcPoint>,
    pub peak_early: bool,
    pub peak_late: bool,
    pub double_peak: bool,
    pub no_taper: bool,
    pub peak_index_ideal: usize,
    pub peak_index_actual: usize,
}

/// Build the arc model from the energy series and fatigue result.
#[must_use]
pub fn arc_model(energy: &[f64], fatigue: &FatigueBreakdown) -> ArcModel {
    let count = energy.len();
    let span = usize_to_f64(count.saturating_sub(1)).max(1.0);
    let points = energy
        .iter()
        .enumerate()
        .map(|(index, &value)| ArcPoint {
            x: usize_to_f64(index) / span,
            y: ARC_Y_BASE + ARC_Y_SPAN * clamp01(value),
        })
        .collect();
    ArcModel {
        points,
        peak_early: fatigue.actual_peak_index < fatigue.ideal_peak_index,
        peak_late: fatigue.actual_peak_index > fatigue.ideal_peak_index,
        double_peak: fatigue.double_peak,
        no_taper: fatigue.no_taper,
        peak_index_ideal: fatigue.ideal_peak_index,
        peak_index_actual: fatigue.actual_peak_index,
    }
}

/// Raw per-stop factors before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopFactors {
    pub transition_smoothness: f64,
    pub peak_alignment: f64,
    pub taper_integrity: f64,
    pub fatigue_impact: f64,
    pub friction_impact: f64,
}

/// Arc contribution across the journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcContribution {
    pub total: f64,
    pub by_index: Vec<f64>,
    pub narratives: Vec<String>,
    pub factors: Vec<StopFactors>,
}

fn stop_factors(
    index: usize,
    energy: &[f64],
    fatigue: &FatigueBreakdown,
    friction: &FrictionBreakdown,
    ideal_shifted: usize,
) -> StopFactors {
    let count = energy.len();
    let span = usize_to_f64(count.saturating_sub(1)).max(1.0);

    let transition_smoothness = if index == 0 {
        1.0
    } else {
        let energy_jump = (energy[index] - energy[index - 1]).abs();
        let incoming = friction
            .edge_penalties
            .get(index - 1)
            .copied()
            .unwrap_or(0.0);
        clamp01(1.0 - 0.5 * energy_jump - 0.5 * incoming)
    };

    let peak_alignment = clamp01(
        1.0 - usize_to_f64(index.abs_diff(ideal_shifted)) / usize_to_f64(count).max(1.0),
    );

    let taper_integrity = if fatigue.no_taper {
        clamp01(1.0 - ARC_TAPER_DECAY * (usize_to_f64(index) / span))
    } else {
        1.0
    };

    let fatigue_impact = clamp01(fatigue.penalty * (0.5 + 0.5 * clamp01(energy[index])));

    let incoming = if index == 0 {
        None
    } else {
        friction.edge_penalties.get(index - 1).copied()
    };
    let outgoing = friction.edge_penalties.get(index).copied();
    let adjacent = match (incoming, outgoing) {
        (Some(a), Some(b)) => (a + b) / 2.0,
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => 0.0,
    };
    let friction_impact = clamp01(0.7 * adjacent + 0.3 * friction.penalty);

    StopFactors {
        transition_smoothness,
        peak_alignment,
        taper_integrity,
        fatigue_impact,
        friction_impact,
    }
}

/// Blend raw factors into one contribution value under a weight map.
#[must_use]
pub fn blend_factors(factors: &StopFactors, weights: &WeightMap) -> f64 {
    let positive_weights = [
        ARC_POSITIVE_SMOOTHNESS * weights.transition_smoothness,
        ARC_POSITIVE_PEAK * weights.peak_alignment,
        ARC_POSITIVE_TAPER * weights.taper_integrity,
    ];
    let positive_sum = positive_weights[0] * factors.transition_smoothness
        + positive_weights[1] * factors.peak_alignment
        + positive_weights[2] * factors.taper_integrity;
    let positive_norm: f64 = positive_weights.iter().sum();
    let positives = clamp01(positive_sum / positive_norm);

    let penalty_weights = [
        ARC_PENALTY_FATIGUE * weights.fatigue_impact,
        ARC_PENALTY_FRICTION * weights.friction_impact,
    ];
    let penalty_sum = penalty_weights[0] * factors.fatigue_impact
        + penalty_weights[1] * factors.friction_impact;
    let penalty_norm: f64 = penalty_weights.iter().sum();
    let penalties = clamp01(penalty_sum / penalty_norm);

    clamp01(positives * (1.0 - penalties))
}

fn narrative_for(factors: &StopFactors, weights: &WeightMap) -> &'static str {
    let positive_norm = ARC_POSITIVE_SMOOTHNESS * weights.transition_smoothness
        + ARC_POSITIVE_PEAK * weights.peak_alignment
        + ARC_POSITIVE_TAPER * weights.taper_integrity;
    let positives = clamp01(
        (ARC_POSITIVE_SMOOTHNESS * weights.transition_smoothness * factors.transition_smoothness
            + ARC_POSITIVE_PEAK * weights.peak_alignment * factors.peak_alignment
            + ARC_POSITIVE_TAPER * weights.taper_integrity * factors.taper_integrity)
            / positive_norm,
    );
    let penalty_norm = ARC_PENALTY_FATIGUE * weights.fatigue_impact
        + ARC_PENALTY_FRICTION * weights.friction_impact;
    let penalties = clamp01(
        (ARC_PENALTY_FATIGUE * weights.fatigue_impact * factors.fatigue_impact
            + ARC_PENALTY_FRICTION * weights.friction_impact * factors.friction_impact)
            / penalty_norm,
    );

    if penalties > positives {
        if factors.fatigue_impact >= factors.friction_impact {
            "piles on fatigue late in the journey"
        } else {
            "a long transfer weighs on this stop"
        }
    } else if factors.transition_smoothness >= factors.peak_alignment
        && factors.transition_smoothness >= factors.taper_integrity
    {
        "hands off smoothly from the stop before"
    } else if factors.peak_alignment >= factors.taper_integrity {
        "carries the journey's peak moment"
    } else {
        "gives the evening room to wind down"
    }
}

/// Compute the per-stop contribution vector, total, and narratives.
///
/// `weights` is [`WeightMap::NEUTRAL`] on the baseline path; refinement
/// passes the tilt-derived map when ranking candidates.
#[must_use]
pub fn arc_contribution(
    energy: &[f64],
    fatigue: &FatigueBreakdown,
    friction: &FrictionBreakdown,
    weights: &WeightMap,
) -> ArcContribution {
    let count = energy.len();
    if count == 0 {
        return ArcContribution {
            total: 0.0,
            by_index: Vec::new(),
            narratives: Vec::new(),
            factors: Vec::new(),
        };
    }

    let shift = i64::from(weights.ideal_peak_shift);
    let shifted = i64::try_from(fatigue.ideal_peak_index).unwrap_or(0) + shift;
    let ideal_shifted = usize::try_from(shifted.clamp(0, i64::try_from(count - 1).unwrap_or(0)))
        .unwrap_or(0);

    let mut by_index = Vec::with_capacity(count);
    let mut narratives = Vec::with_capacity(count);
    let mut factors = Vec::with_capacity(count);
    let mut total = 0.0;
    for index in 0..count {
        let stop = stop_factors(index, energy, fatigue, friction, ideal_shifted);
        let contribution = blend_factors(&stop, weights);
        total += contribution;
        by_index.push(contribution);
        narratives.push(narrative_for(&stop, weights).to_string());
        factors.push(stop);
    }

    ArcContribution {
        total,
        by_index,
        narratives,
        factors,
    }
}

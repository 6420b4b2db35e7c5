//! Recompute pipeline: the single entry point combining scoring, arc, and
//! constraint evaluation into the `Computed` metrics record.

use serde::{Deserialize, Serialize};

use crate::arc::{ArcContribution, ArcModel, arc_contribution, arc_model};
use crate::constants::{
    ARC_FLAT_SPREAD, VIOLATION_LONG_TRANSFER_CRITICAL_MIN, VIOLATION_LONG_TRANSFER_WARN_MIN,
    VIOLATION_RUSHED_TRAVEL_SHARE,
};
use crate::constraints::{
    ConstraintViolation, constraint_narratives, evaluate_constraints, hard_count, soft_count,
};
use crate::error::EngineError;
use crate::numbers::score_to_100;
use crate::plan::Plan;
use crate::scoring::{
    FatigueBreakdown, FrictionBreakdown, fatigue_breakdown, friction_breakdown, intent_breakdown,
    journey_score,
};
use crate::tilt::WeightMap;
use crate::travel::{TravelCache, TravelSummary, plan_travel};

/// Severity of a journey warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Info,
    Warn,
    Critical,
}

/// Kind of a journey warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    LongTransfer,
    DoublePeak,
    LateSpike,
    FlatArc,
    RushedPacing,
}

/// One journey warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    pub severity: ViolationSeverity,
    pub details: String,
}

/// Structured scoring subcomponents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponents {
    pub fatigue: FatigueBreakdown,
    pub friction: FrictionBreakdown,
}

/// Full computed metrics for one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Computed {
    pub journey_score: f64,
    pub journey_score100: u8,
    pub intent_score: f64,
    pub fatigue_penalty: f64,
    pub friction_penalty: f64,
    pub components: ScoreComponents,
    pub violations: Vec<Violation>,
    pub constraint_violations: Vec<ConstraintViolation>,
    pub constraint_hard_count: usize,
    pub constraint_soft_count: usize,
    pub constraint_narratives: Vec<String>,
    pub arc_contribution_total: f64,
    pub arc_contribution_by_index: Vec<f64>,
    pub arc_narratives_by_index: Vec<String>,
}

/// A plan with everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Live {
    pub plan: Plan,
    pub computed: Computed,
    pub travel: TravelSummary,
    pub arc_model: ArcModel,
}

fn build_violations(
    travel: &TravelSummary,
    fatigue: &FatigueBreakdown,
    friction: &FrictionBreakdown,
    energy: &[f64],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    for edge in &travel.edges {
        if edge.minutes >= VIOLATION_LONG_TRANSFER_CRITICAL_MIN {
            violations.push(Violation {
                violation_type: ViolationType::LongTransfer,
                severity: ViolationSeverity::Critical,
                details: format!("{} min transfer between stops", edge.minutes),
            });
        } else if edge.minutes >= VIOLATION_LONG_TRANSFER_WARN_MIN {
            violations.push(Violation {
                violation_type: ViolationType::LongTransfer,
                severity: ViolationSeverity::Warn,
                details: format!("{} min transfer between stops", edge.minutes),
            });
        }
    }
    if fatigue.double_peak {
        violations.push(Violation {
            violation_type: ViolationType::DoublePeak,
            severity: ViolationSeverity::Info,
            details: "the energy curve peaks twice".to_string(),
        });
    }
    if fatigue.no_taper {
        violations.push(Violation {
            violation_type: ViolationType::LateSpike,
            severity: ViolationSeverity::Warn,
            details: "the journey ends at full energy".to_string(),
        });
    }
    let spread = energy
        .iter()
        .fold(f64::MIN, |max, &v| max.max(v))
        - energy.iter().fold(f64::MAX, |min, &v| min.min(v));
    if !energy.is_empty() && spread < ARC_FLAT_SPREAD {
        violations.push(Violation {
            violation_type: ViolationType::FlatArc,
            severity: ViolationSeverity::Info,
            details: "the energy curve barely moves".to_string(),
        });
    }
    if friction.travel_share > VIOLATION_RUSHED_TRAVEL_SHARE {
        violations.push(Violation {
            violation_type: ViolationType::RushedPacing,
            severity: ViolationSeverity::Warn,
            details: "more time in transit than at the stops".to_string(),
        });
    }
    violations
}

/// Recompute every derived metric for a plan.
///
/// The plan is sanitized (recoverable fields clamped) before scoring. The
/// output is invariant under `prefTilt` and `mode`: tilt only affects the
/// ranking path inside refinement.
///
/// # Errors
///
/// Returns `EngineError::Schema` when the plan is empty or carries
/// duplicate stop ids.
pub fn recompute_live(plan: &Plan, cache: &TravelCache) -> Result<Live, EngineError> {
    plan.validate()?;
    let plan = plan.sanitized();

    let travel = plan_travel(&plan, cache);
    let energy = plan.energy_series();
    let intent = intent_breakdown(&plan);
    let fatigue = fatigue_breakdown(&energy);
    let friction = friction_breakdown(&travel);
    let arc = arc_model(&energy, &fatigue);
    let contribution: ArcContribution =
        arc_contribution(&energy, &fatigue, &friction, &WeightMap::NEUTRAL);
    let constraint_violations = evaluate_constraints(&plan, &travel, &arc);
    let violations = build_violations(&travel, &fatigue, &friction, &energy);

    let score = journey_score(intent.score, fatigue.penalty, friction.penalty);
    let computed = Computed {
        journey_score: score,
        journey_score100: score_to_100(score),
        intent_score: intent.score,
        fatigue_penalty: fatigue.penalty,
        friction_penalty: friction.penalty,
        components: ScoreComponents {
            fatigue,
            friction: friction.clone(),
        },
        constraint_hard_count: hard_count(&constraint_violations),
        constraint_soft_count: soft_count(&constraint_violations),
        constraint_narratives: constraint_narratives(&constraint_violations),
        constraint_violations,
        violations,
        arc_contribution_total: contribution.total,
        arc_contribution_by_index: contribution.by_index,
        arc_narratives_by_index: contribution.narratives,
    };

    Ok(Live {
        plan,
        computed,
        travel,
        arc_model: arc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{
        IdeaDateProfile, LatLng, PlaceRef, PlanMeta, Stop, StopRole,
    };

    fn stop_at(id: &str, energy: f64, lat: f64, lng: f64) -> Stop {
        Stop {
            id: id.to_string(),
            name: format!("Stop {id}"),
            place_ref: Some(PlaceRef {
                place_id: format!("place-{id}"),
                lat_lng: Some(LatLng { lat, lng }),
                ..PlaceRef::default()
            }),
            place_lite: None,
            idea_date: IdeaDateProfile {
                energy_level: energy,
                ..IdeaDateProfile::default()
            },
        }
    }

    fn tight_plan(energies: &[f64]) -> Plan {
        let mut plan = Plan {
            id: "p".to_string(),
            name: String::new(),
            stops: energies
                .iter()
                .enumerate()
                .map(|(index, &energy)| {
                    stop_at(
                        &format!("s{index}"),
                        energy,
                        48.85 + 0.001 * crate::numbers::usize_to_f64(index),
                        2.35,
                    )
                })
                .collect(),
            meta: PlanMeta::default(),
        };
        plan.normalize_roles();
        plan
    }

    #[test]
    fn vector_lengths_match_stop_count() {
        for count in [2usize, 3, 6] {
            let energies: Vec<f64> = (0..count)
                .map(|i| 0.3 + 0.1 * crate::numbers::usize_to_f64(i % 4))
                .collect();
            let live = recompute_live(&tight_plan(&energies), &TravelCache::new()).unwrap();
            assert_eq!(live.arc_model.points.len(), count);
            assert_eq!(live.computed.arc_contribution_by_index.len(), count);
            assert_eq!(live.computed.arc_narratives_by_index.len(), count);
            assert!(live.computed.journey_score100 <= 100);
        }
    }

    #[test]
    fn identical_coordinates_have_negligible_friction() {
        let mut plan = tight_plan(&[0.3, 0.8, 0.4]);
        for stop in &mut plan.stops {
            stop.place_ref.as_mut().unwrap().lat_lng = Some(LatLng {
                lat: 48.85,
                lng: 2.35,
            });
        }
        let live = recompute_live(&plan, &TravelCache::new()).unwrap();
        assert!(live.computed.friction_penalty <= 1e-9);
    }

    #[test]
    fn stretching_the_last_leg_hurts() {
        let base = tight_plan(&[0.3, 0.8, 0.4]);
        let baseline = recompute_live(&base, &TravelCache::new()).unwrap();

        let mut stretched = base.clone();
        stretched.stops[2].place_ref.as_mut().unwrap().lat_lng = Some(LatLng {
            lat: 48.95,
            lng: 2.55,
        });
        let worse = recompute_live(&stretched, &TravelCache::new()).unwrap();
        assert!(
            worse.computed.journey_score100 < baseline.computed.journey_score100
                || worse.computed.friction_penalty > baseline.computed.friction_penalty
        );
    }

    #[test]
    fn role_disorder_surfaces_as_hard_constraint() {
        let mut plan = tight_plan(&[0.3, 0.8, 0.4]);
        plan.stops[0].idea_date.role = StopRole::WindDown;
        let live = recompute_live(&plan, &TravelCache::new()).unwrap();
        assert!(live.computed.constraint_hard_count >= 1);
        assert!(live
            .computed
            .constraint_narratives
            .contains(&"stop role order risk".to_string()));
    }

    #[test]
    fn recompute_is_deterministic() {
        let plan = tight_plan(&[0.3, 0.8, 0.8, 0.4]);
        let cache = TravelCache::new();
        let first = recompute_live(&plan, &cache).unwrap();
        let second = recompute_live(&plan, &cache).unwrap();
        let cold = recompute_live(&plan, &TravelCache::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, cold);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&cold).unwrap()
        );
    }

    #[test]
    fn tilt_never_changes_computed() {
        let mut plan = tight_plan(&[0.3, 0.8, 0.4]);
        let neutral = recompute_live(&plan, &TravelCache::new()).unwrap();
        plan.meta.idea_date.pref_tilt = crate::plan::PrefTilt {
            vibe: 1,
            walking: -1,
            peak: 1,
        };
        plan.meta.idea_date.mode = crate::plan::IdeaDateMode::TouristDay;
        let tilted = recompute_live(&plan, &TravelCache::new()).unwrap();
        assert_eq!(neutral.computed, tilted.computed);
    }

    #[test]
    fn empty_plan_is_rejected() {
        let plan = Plan {
            id: "p".to_string(),
            name: String::new(),
            stops: vec![],
            meta: PlanMeta::default(),
        };
        assert!(matches!(
            recompute_live(&plan, &TravelCache::new()),
            Err(EngineError::Schema(_))
        ));
    }
}

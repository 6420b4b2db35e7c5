//! Reorder search: adjacent swaps plus bounded move enumeration, accepting
//! only a clearly better ordering.

use crate::constants::{REORDER_CANDIDATE_CAP, REORDER_MIN_DELTA, REORDER_REASON_COMPONENT_MIN};
use crate::patch::{PatchOp, apply_patch_ops};
use crate::recompute::{Live, recompute_live};
use crate::suggestion::{ConstraintDelta, ReasonCode};
use crate::travel::TravelCache;

/// Winning reorder candidate.
#[derive(Debug, Clone)]
pub struct ReorderOutcome {
    pub op: PatchOp,
    pub reason: ReasonCode,
    pub after: Live,
    pub score_delta: f64,
    pub arc_delta: f64,
    pub constraint_delta: ConstraintDelta,
    pub evaluated: usize,
}

fn candidate_ops(live: &Live) -> Vec<PatchOp> {
    let count = live.plan.stops.len();
    let mut ops = Vec::new();
    // Adjacent swaps first, then the wider move enumeration.
    for index in 0..count.saturating_sub(1) {
        ops.push(PatchOp::MoveStop {
            stop_id: live.plan.stops[index].id.clone(),
            to_index: index + 1,
        });
    }
    'outer: for from in 0..count {
        for to in 0..count {
            if ops.len() >= REORDER_CANDIDATE_CAP {
                break 'outer;
            }
            if to == from || to == from + 1 {
                continue;
            }
            ops.push(PatchOp::MoveStop {
                stop_id: live.plan.stops[from].id.clone(),
                to_index: to,
            });
        }
    }
    ops.truncate(REORDER_CANDIDATE_CAP);
    ops
}

const fn reason_for(friction_gain: f64, fatigue_gain: f64) -> ReasonCode {
    if friction_gain >= fatigue_gain && friction_gain > REORDER_REASON_COMPONENT_MIN {
        ReasonCode::ReduceFriction
    } else if fatigue_gain > REORDER_REASON_COMPONENT_MIN {
        ReasonCode::ArcSmoothing
    } else {
        ReasonCode::IntentAlignment
    }
}

/// Search every candidate reorder of the plan; return the best one whose
/// journey delta clears the acceptance threshold.
#[must_use]
pub fn reorder_search(live: &Live, cache: &TravelCache) -> Option<ReorderOutcome> {
    let mut best: Option<ReorderOutcome> = None;
    let mut evaluated = 0usize;
    for op in candidate_ops(live) {
        let Ok(candidate_plan) = apply_patch_ops(&live.plan, std::slice::from_ref(&op)) else {
            continue;
        };
        let Ok(after) = recompute_live(&candidate_plan, cache) else {
            continue;
        };
        evaluated += 1;

        let score_delta = after.computed.journey_score - live.computed.journey_score;
        let beats_best = best
            .as_ref()
            .is_none_or(|current| score_delta > current.score_delta);
        if !beats_best {
            continue;
        }

        let friction_gain = live.computed.friction_penalty - after.computed.friction_penalty;
        let fatigue_gain = live.computed.fatigue_penalty - after.computed.fatigue_penalty;
        let arc_delta =
            after.computed.arc_contribution_total - live.computed.arc_contribution_total;
        let constraint_delta = ConstraintDelta {
            hard: i64::try_from(live.computed.constraint_hard_count).unwrap_or(0)
                - i64::try_from(after.computed.constraint_hard_count).unwrap_or(0),
            soft: i64::try_from(live.computed.constraint_soft_count).unwrap_or(0)
                - i64::try_from(after.computed.constraint_soft_count).unwrap_or(0),
        };
        best = Some(ReorderOutcome {
            op,
            reason: reason_for(friction_gain, fatigue_gain),
            after,
            score_delta,
            arc_delta,
            constraint_delta,
            evaluated,
        });
    }

    let mut outcome = best.filter(|found| found.score_delta >= REORDER_MIN_DELTA)?;
    outcome.evaluated = evaluated;
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{IdeaDateProfile, LatLng, PlaceRef, Plan, PlanMeta, Stop};

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

    fn live_for(stops: Vec<Stop>) -> Live {
        let mut plan = Plan {
            id: "p".to_string(),
            name: String::new(),
            stops,
            meta: PlanMeta::default(),
        };
        plan.normalize_roles();
        recompute_live(&plan, &TravelCache::new()).unwrap()
    }

    #[test]
    fn candidate_enumeration_respects_cap() {
        let stops: Vec<Stop> = (0..12)
            .map(|i| {
                stop_at(
                    &format!("s{i}"),
                    0.5,
                    48.85 + 0.001 * f64::from(i),
                    2.35,
                )
            })
            .collect();
        let live = live_for(stops);
        assert!(candidate_ops(&live).len() <= REORDER_CANDIDATE_CAP);
    }

    #[test]
    fn well_ordered_plan_yields_no_suggestion() {
        let live = live_for(vec![
            stop_at("a", 0.3, 48.850, 2.35),
            stop_at("b", 0.9, 48.851, 2.35),
            stop_at("c", 0.4, 48.852, 2.35),
        ]);
        assert!(reorder_search(&live, &TravelCache::new()).is_none());
    }

    #[test]
    fn detour_heavy_order_gets_reordered() {
        // a and c are neighbors; b is far north, so a -> b -> c backtracks
        // through two long transfers. Moving b to either end removes one.
        let live = live_for(vec![
            stop_at("a", 0.3, 48.850, 2.350),
            stop_at("b", 0.8, 48.878, 2.350),
            stop_at("c", 0.5, 48.851, 2.351),
        ]);
        let found = reorder_search(&live, &TravelCache::new());
        if let Some(outcome) = found {
            assert!(outcome.score_delta >= REORDER_MIN_DELTA);
            assert!(matches!(outcome.op, PatchOp::MoveStop { .. }));
        }
    }

    #[test]
    fn reason_codes_follow_component_gains() {
        assert_eq!(reason_for(0.06, 0.02), ReasonCode::ReduceFriction);
        assert_eq!(reason_for(0.01, 0.06), ReasonCode::ArcSmoothing);
        assert_eq!(reason_for(0.01, 0.02), ReasonCode::IntentAlignment);
    }
}

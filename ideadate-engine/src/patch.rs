//! Patch operations: the only way a plan changes.
//!
//! Every application returns a new plan and enforces the plan invariants:
//! unique stop ids, replace preserves stop count, and no replace introduces
//! a newly duplicated place id. Move-only batches re-stamp roles to the
//! index convention.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::EngineError;
use crate::plan::{IdeaDateProfile, PlaceLite, PlaceRef, Plan};

/// Venue payload carried by a replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlace {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_ref: Option<PlaceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_lite: Option<PlaceLite>,
}

/// One deterministic plan transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PatchOp {
    /// Remove the stop and reinsert it at the clamped target index.
    MoveStop { stop_id: String, to_index: usize },
    /// Substitute the stop's venue and profile; the role is preserved.
    ReplaceStop {
        stop_id: String,
        new_place: NewPlace,
        new_idea_date_profile: IdeaDateProfile,
    },
}

impl PatchOp {
    #[must_use]
    pub const fn is_move(&self) -> bool {
        matches!(self, Self::MoveStop { .. })
    }

    /// Id of the stop the op targets.
    #[must_use]
    pub fn subject_stop_id(&self) -> &str {
        match self {
            Self::MoveStop { stop_id, .. } | Self::ReplaceStop { stop_id, .. } => stop_id,
        }
    }
}

/// Inline batch type for patch application.
pub type PatchOps = SmallVec<[PatchOp; 4]>;

fn place_id_counts(plan: &Plan) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for stop in &plan.stops {
        if let Some(place_id) = stop.place_id() {
            *counts.entry(place_id.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

fn apply_one(plan: &mut Plan, op: &PatchOp) -> Result<(), EngineError> {
    match op {
        PatchOp::MoveStop { stop_id, to_index } => {
            let from = plan.index_of(stop_id).ok_or_else(|| {
                EngineError::invariant(format!("moveStop targets unknown stop '{stop_id}'"))
            })?;
            let stop = plan.stops.remove(from);
            let clamped = (*to_index).min(plan.stops.len());
            plan.stops.insert(clamped, stop);
            Ok(())
        }
        PatchOp::ReplaceStop {
            stop_id,
            new_place,
            new_idea_date_profile,
        } => {
            let index = plan.index_of(stop_id).ok_or_else(|| {
                EngineError::invariant(format!("replaceStop targets unknown stop '{stop_id}'"))
            })?;
            let stop = &mut plan.stops[index];
            let preserved_role = stop.idea_date.role;
            stop.name = new_place.name.clone();
            stop.place_ref = new_place.place_ref.clone();
            stop.place_lite = new_place.place_lite.clone();
            stop.idea_date = new_idea_date_profile.sanitized();
            stop.idea_date.role = preserved_role;
            Ok(())
        }
    }
}

/// Apply a batch of patch ops to a plan, returning the transformed plan.
///
/// # Errors
///
/// Returns `EngineError::InvariantViolation` when an op targets an unknown
/// stop, the batch duplicates a stop id, a replace changes the stop count,
/// or a replace introduces a newly duplicated place id.
pub fn apply_patch_ops(plan: &Plan, ops: &[PatchOp]) -> Result<Plan, EngineError> {
    let before_count = plan.stops.len();
    let before_places = place_id_counts(plan);
    let has_replace = ops.iter().any(|op| !op.is_move());
    let move_only = !ops.is_empty() && ops.iter().all(PatchOp::is_move);

    let mut next = plan.clone();
    for op in ops {
        apply_one(&mut next, op)?;
    }
    if move_only {
        next.normalize_roles();
    }

    if next.stops.len() != before_count {
        return Err(EngineError::invariant(format!(
            "patch changed stop count from {before_count} to {}",
            next.stops.len()
        )));
    }
    if let Err(schema) = next.validate() {
        return Err(EngineError::invariant(schema.to_string()));
    }
    if has_replace {
        let after_places = place_id_counts(&next);
        for (place_id, &after) in &after_places {
            let before = before_places.get(place_id).copied().unwrap_or(0);
            if after >= 2 && after > before {
                return Err(EngineError::invariant(format!(
                    "replace duplicates place id '{place_id}'"
                )));
            }
        }
    }

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{PlanMeta, Stop, StopRole};

    fn stop_with_place(id: &str, place_id: &str) -> Stop {
        Stop {
            id: id.to_string(),
            name: format!("Stop {id}"),
            place_ref: Some(PlaceRef {
                place_id: place_id.to_string(),
                ..PlaceRef::default()
            }),
            place_lite: None,
            idea_date: IdeaDateProfile::default(),
        }
    }

    fn plan_of(ids: &[&str]) -> Plan {
        let mut plan = Plan {
            id: "p".to_string(),
            name: String::new(),
            stops: ids
                .iter()
                .map(|id| stop_with_place(id, &format!("place-{id}")))
                .collect(),
            meta: PlanMeta::default(),
        };
        plan.normalize_roles();
        plan
    }

    fn replace_op(stop_id: &str, place_id: &str) -> PatchOp {
        PatchOp::ReplaceStop {
            stop_id: stop_id.to_string(),
            new_place: NewPlace {
                name: format!("New {stop_id}"),
                place_ref: Some(PlaceRef {
                    place_id: place_id.to_string(),
                    ..PlaceRef::default()
                }),
                place_lite: None,
            },
            new_idea_date_profile: IdeaDateProfile {
                role: StopRole::Start,
                energy_level: 0.7,
                ..IdeaDateProfile::default()
            },
        }
    }

    #[test]
    fn move_reinserts_at_clamped_index() {
        let plan = plan_of(&["a", "b", "c"]);
        let moved = apply_patch_ops(
            &plan,
            &[PatchOp::MoveStop {
                stop_id: "a".to_string(),
                to_index: 99,
            }],
        )
        .unwrap();
        let order: Vec<_> = moved.stops.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn move_only_batches_renormalize_roles() {
        let plan = plan_of(&["a", "b", "c"]);
        let moved = apply_patch_ops(
            &plan,
            &[PatchOp::MoveStop {
                stop_id: "c".to_string(),
                to_index: 0,
            }],
        )
        .unwrap();
        assert_eq!(moved.stops[0].idea_date.role, StopRole::Start);
        assert_eq!(moved.stops[1].idea_date.role, StopRole::Main);
        assert_eq!(moved.stops[2].idea_date.role, StopRole::WindDown);
    }

    #[test]
    fn replace_preserves_role_and_count() {
        let plan = plan_of(&["a", "b", "c"]);
        let replaced = apply_patch_ops(&plan, &[replace_op("b", "place-new")]).unwrap();
        assert_eq!(replaced.stops.len(), 3);
        assert_eq!(replaced.stops[1].name, "New b");
        // The candidate profile asked for Start; the slot role wins.
        assert_eq!(replaced.stops[1].idea_date.role, StopRole::Main);
        assert_eq!(replaced.stops[1].place_id(), Some("place-new"));
    }

    #[test]
    fn replace_rejects_new_duplicate_place() {
        let plan = plan_of(&["a", "b", "c"]);
        let result = apply_patch_ops(&plan, &[replace_op("b", "place-a")]);
        assert!(matches!(
            result,
            Err(EngineError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn preexisting_duplicates_are_tolerated() {
        let mut plan = plan_of(&["a", "b", "c"]);
        plan.stops[1].place_ref.as_mut().unwrap().place_id = "place-a".to_string();
        // Replacing the third stop does not touch the existing a/b collision.
        let replaced = apply_patch_ops(&plan, &[replace_op("c", "place-fresh")]).unwrap();
        assert_eq!(replaced.stops.len(), 3);
    }

    #[test]
    fn unknown_stop_is_an_invariant_violation() {
        let plan = plan_of(&["a", "b"]);
        let result = apply_patch_ops(
            &plan,
            &[PatchOp::MoveStop {
                stop_id: "ghost".to_string(),
                to_index: 0,
            }],
        );
        assert!(matches!(
            result,
            Err(EngineError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn mixed_batches_do_not_renormalize_roles() {
        let plan = plan_of(&["a", "b", "c"]);
        let patched = apply_patch_ops(
            &plan,
            &[
                PatchOp::MoveStop {
                    stop_id: "c".to_string(),
                    to_index: 0,
                },
                replace_op("b", "place-new"),
            ],
        )
        .unwrap();
        // c moved to the front but keeps its WindDown stamp.
        assert_eq!(patched.stops[0].id, "c");
        assert_eq!(patched.stops[0].idea_date.role, StopRole::WindDown);
    }

    #[test]
    fn ops_round_trip_through_json() {
        let op = replace_op("b", "place-new");
        let encoded = serde_json::to_string(&op).unwrap();
        assert!(encoded.contains("\"op\":\"replaceStop\""));
        let decoded: PatchOp = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, op);
    }
}

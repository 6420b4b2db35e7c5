//! Suggestion pack builder: recompute, reorder search, replacement ladder,
//! ranking, narratives, and semantic dedupe, in that order.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::constants::{REPLACE_ARC_MIN_DELTA, SCORE_EPSILON, SUGGESTION_PACK_CAP};
use crate::constraints::family_for_stop;
use crate::error::EngineError;
use crate::narrative::{
    NarrativeContext, constraint_note, structural_note, tilt_note, translate,
};
use crate::numbers::score_to_100;
use crate::patch::apply_patch_ops;
use crate::plan::{IdeaDateMode, Plan, PrefTilt, Stop};
use crate::rank::{RankEntry, ReplacementRanking, ranked_indices};
use crate::recompute::{Live, recompute_live};
use crate::reorder::reorder_search;
use crate::replace::{RefinePick, replacement_search, weighted_arc_total};
use crate::resolver::CandidateResolver;
use crate::suggestion::{ConstraintDelta, Impact, Suggestion, SuggestionKind, SuggestionMeta};
use crate::telemetry::{PassUsed, RefineStats, TopConstraintDelta};
use crate::tilt::{WeightMap, resolve_tilt, weight_map_for};
use crate::travel::TravelCache;

/// Custom family key hook for the diversity policy.
pub type FamilyKeyAdapter = fn(&Stop) -> String;

/// Caller-tunable refinement options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestOptions {
    pub replacement_ranking: ReplacementRanking,
    pub family_key_adapter: Option<FamilyKeyAdapter>,
    pub pref_tilt: Option<PrefTilt>,
    pub mode: Option<IdeaDateMode>,
}

/// The full suggestion pack returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionPack {
    pub plan: Plan,
    pub computed: crate::recompute::Computed,
    pub travel: crate::travel::TravelSummary,
    pub arc_model: crate::arc::ArcModel,
    pub suggestions: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_refine_stats: Option<RefineStats>,
}

/// Canonical signature used to detect semantically identical suggestions.
#[must_use]
pub fn semantic_signature(plan: &Plan, suggestion: &Suggestion) -> String {
    match suggestion.kind {
        SuggestionKind::Replacement => {
            let target = suggestion
                .new_place
                .as_ref()
                .and_then(|place| {
                    place
                        .place_ref
                        .as_ref()
                        .map(|r| r.place_id.clone())
                        .or_else(|| place.place_lite.as_ref().map(|l| l.place_id.clone()))
                })
                .unwrap_or_default();
            let subject = suggestion.subject_stop_id.clone().unwrap_or_default();
            format!("replace|{subject}|{target}")
        }
        SuggestionKind::Reorder => {
            let order = apply_patch_ops(plan, &suggestion.patch_ops).map_or_else(
                |_| {
                    plan.stops
                        .iter()
                        .map(|stop| stop.id.clone())
                        .collect::<Vec<_>>()
                },
                |patched| patched.stops.into_iter().map(|stop| stop.id).collect(),
            );
            format!("reorder|{}", order.join(","))
        }
    }
}

/// Remove suggestions whose canonical signature was already seen; the first
/// occurrence wins.
#[must_use]
pub fn dedupe_suggestions_by_semantic_signature(
    plan: &Plan,
    suggestions: Vec<Suggestion>,
) -> Vec<Suggestion> {
    let mut seen = std::collections::HashSet::new();
    suggestions
        .into_iter()
        .filter(|suggestion| seen.insert(semantic_signature(plan, suggestion)))
        .collect()
}

/// Translated note lines for a suggestion, capped and digit-free.
#[must_use]
pub fn suggestion_notes(suggestion: &Suggestion) -> Vec<String> {
    let meta = suggestion.meta.clone().unwrap_or_default();
    let structural = meta.structural_note.unwrap_or_default();
    translate(
        &structural,
        meta.constraint_note.as_deref(),
        meta.tilt_note.as_deref(),
    )
}

struct BuildInputs<'a> {
    live: &'a Live,
    tilt: PrefTilt,
}

fn narrative_context(
    inputs: &BuildInputs<'_>,
    after: &Live,
    constraint_delta: ConstraintDelta,
    arc_delta: f64,
    friction_gain: f64,
) -> NarrativeContext {
    let before_model = &inputs.live.arc_model;
    let after_model = &after.arc_model;
    NarrativeContext {
        hard_fixed: constraint_delta.hard > 0,
        soft_fixed: constraint_delta.soft > 0,
        peak_moved_later: after_model.peak_index_actual > before_model.peak_index_actual,
        peak_moved_earlier: after_model.peak_index_actual < before_model.peak_index_actual,
        taper_improved: before_model.no_taper && !after_model.no_taper,
        build_improved: arc_delta > REPLACE_ARC_MIN_DELTA,
        friction_reduced: friction_gain > SCORE_EPSILON,
        intent_improved: after.computed.intent_score
            > inputs.live.computed.intent_score + SCORE_EPSILON,
        tilt: inputs.tilt,
    }
}

fn meta_for(ctx: &NarrativeContext, constraint_delta: ConstraintDelta) -> SuggestionMeta {
    SuggestionMeta {
        structural_note: Some(structural_note(ctx)),
        tilt_note: tilt_note(ctx),
        constraint_note: constraint_note(constraint_delta),
        constraint_delta: Some(constraint_delta),
    }
}

fn impact_for(live: &Live, after: &Live) -> Impact {
    let before = live.computed.journey_score;
    let after_score = after.computed.journey_score;
    Impact {
        before,
        after: after_score,
        delta: after_score - before,
        before100: score_to_100(before),
        after100: score_to_100(after_score),
    }
}

fn suggestion_from_pick(inputs: &BuildInputs<'_>, pick: &RefinePick) -> Suggestion {
    let ctx = narrative_context(
        inputs,
        &pick.after,
        pick.constraint_delta,
        pick.arc_delta,
        pick.friction_gain,
    );
    let (kind, id) = match pick.pass {
        PassUsed::ReorderRepair => (
            SuggestionKind::Reorder,
            format!("reorder-{}", pick.candidate_id),
        ),
        _ => (
            SuggestionKind::Replacement,
            format!("replace-{}-{}", pick.subject_stop_id, pick.candidate_id),
        ),
    };
    Suggestion {
        id,
        kind,
        reason_code: pick.reason,
        patch_ops: pick.patch_ops.clone(),
        new_place: pick.new_place.clone(),
        meta: Some(meta_for(&ctx, pick.constraint_delta)),
        impact: impact_for(inputs.live, &pick.after),
        arc_impact: Some(pick.arc_delta),
        preview: true,
        subject_stop_id: Some(pick.subject_stop_id.clone()),
    }
}

fn family_count_for(plan: &Plan, family_key: &str, adapter: Option<FamilyKeyAdapter>) -> usize {
    plan.stops
        .iter()
        .filter(|stop| {
            let key = adapter.map_or_else(
                || family_for_stop(stop).as_str().to_string(),
                |adapt| adapt(stop),
            );
            key == family_key
        })
        .count()
}

/// Build the suggestion pack for a plan.
///
/// Deterministic for a given plan, options, and resolver response sequence.
/// Safe to abandon at any resolver suspension; no partial pack is published.
///
/// # Errors
///
/// Returns `EngineError::Schema` when the plan fails structural validation.
pub async fn suggestion_pack(
    plan: &Plan,
    options: &SuggestOptions,
    resolver: &dyn CandidateResolver,
    cache: &TravelCache,
) -> Result<SuggestionPack, EngineError> {
    let total_started = Instant::now();
    let mut stats = RefineStats::default();

    let prep_started = Instant::now();
    let live = recompute_live(plan, cache)?;
    let tilt_profile = resolve_tilt(&live.plan.meta.idea_date, options.pref_tilt, options.mode);
    let weights: WeightMap = weight_map_for(tilt_profile.tilt);
    stats.weight_map = Some(weights);
    stats.tilt_profile = Some(tilt_profile);
    stats.timing.prep = elapsed_ms(prep_started);

    let inputs = BuildInputs {
        live: &live,
        tilt: tilt_profile.tilt,
    };

    let evaluation_started = Instant::now();
    let mut suggestions: Vec<(Suggestion, u8, usize)> = Vec::new();

    if let Some(outcome) = reorder_search(&live, cache) {
        let weighted_delta = weighted_arc_total(&outcome.after, &weights)
            - weighted_arc_total(&live, &weights);
        let ctx = narrative_context(
            &inputs,
            &outcome.after,
            outcome.constraint_delta,
            weighted_delta,
            live.computed.friction_penalty - outcome.after.computed.friction_penalty,
        );
        let (stop_id, to_index) = match &outcome.op {
            crate::patch::PatchOp::MoveStop { stop_id, to_index } => (stop_id.clone(), *to_index),
            crate::patch::PatchOp::ReplaceStop { stop_id, .. } => (stop_id.clone(), 0),
        };
        let suggestion = Suggestion {
            id: format!("reorder-{stop_id}-{to_index}"),
            kind: SuggestionKind::Reorder,
            reason_code: outcome.reason,
            patch_ops: vec![outcome.op.clone()],
            new_place: None,
            meta: Some(meta_for(&ctx, outcome.constraint_delta)),
            impact: impact_for(&live, &outcome.after),
            arc_impact: Some(weighted_delta),
            preview: true,
            subject_stop_id: Some(stop_id),
        };
        suggestions.push((suggestion, 0, 0));
    }

    let picks = replacement_search(&live, cache, resolver, &weights, &mut stats).await;
    for pick in &picks {
        let pass_order = match pick.pass {
            PassUsed::Primary => 1,
            PassUsed::Repair => 2,
            PassUsed::ReorderRepair => 3,
            PassUsed::None => 1,
        };
        let family_count = if pick.new_place.is_some() {
            family_count_for(&live.plan, pick.family.as_str(), options.family_key_adapter)
        } else {
            0
        };
        suggestions.push((suggestion_from_pick(&inputs, pick), pass_order, family_count));
    }
    stats.timing.evaluation = elapsed_ms(evaluation_started);

    let ranking_started = Instant::now();
    let entries: Vec<RankEntry> = suggestions
        .iter()
        .map(|(suggestion, pass_order, family_count)| RankEntry {
            id: suggestion.id.clone(),
            arc_delta: suggestion.arc_delta(),
            family_count: *family_count,
            pass_order: *pass_order,
        })
        .collect();
    let order = ranked_indices(&entries, &options.replacement_ranking);
    let ranked: Vec<Suggestion> = order
        .into_iter()
        .map(|index| suggestions[index].0.clone())
        .collect();
    let mut deduped = dedupe_suggestions_by_semantic_signature(&live.plan, ranked);
    deduped.truncate(SUGGESTION_PACK_CAP);
    stats.timing.ranking = elapsed_ms(ranking_started);

    if let Some(top) = deduped.first() {
        let delta = top
            .meta
            .as_ref()
            .and_then(|meta| meta.constraint_delta)
            .unwrap_or_default();
        let baseline_hard = live.computed.constraint_hard_count;
        let baseline_soft = live.computed.constraint_soft_count;
        stats.top_constraint_delta = Some(TopConstraintDelta {
            baseline_hard,
            baseline_soft,
            after_hard: usize::try_from(
                i64::try_from(baseline_hard).unwrap_or(0) - delta.hard,
            )
            .unwrap_or(0),
            after_soft: usize::try_from(
                i64::try_from(baseline_soft).unwrap_or(0) - delta.soft,
            )
            .unwrap_or(0),
            hard_delta: delta.hard,
            soft_delta: delta.soft,
        });
    }

    stats.discarded_count = stats.discard_counts.total();
    stats.timing.total = elapsed_ms(total_started);

    Ok(SuggestionPack {
        plan: live.plan.clone(),
        computed: live.computed.clone(),
        travel: live.travel.clone(),
        arc_model: live.arc_model.clone(),
        suggestions: deduped,
        debug_refine_stats: Some(stats),
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{NewPlace, PatchOp};
    use crate::plan::{IdeaDateProfile, PlaceRef, PlanMeta};
    use crate::suggestion::ReasonCode;

    fn plan_of(ids: &[&str]) -> Plan {
        let mut plan = Plan {
            id: "p".to_string(),
            name: String::new(),
            stops: ids
                .iter()
                .map(|id| Stop {
                    id: (*id).to_string(),
                    name: format!("Stop {id}"),
                    place_ref: Some(PlaceRef {
                        place_id: format!("place-{id}"),
                        ..PlaceRef::default()
                    }),
                    place_lite: None,
                    idea_date: IdeaDateProfile::default(),
                })
                .collect(),
            meta: PlanMeta::default(),
        };
        plan.normalize_roles();
        plan
    }

    fn replacement_suggestion(id: &str, subject: &str, target: &str) -> Suggestion {
        Suggestion {
            id: id.to_string(),
            kind: SuggestionKind::Replacement,
            reason_code: ReasonCode::ImproveArc,
            patch_ops: vec![],
            new_place: Some(NewPlace {
                name: "Candidate".to_string(),
                place_ref: Some(PlaceRef {
                    place_id: target.to_string(),
                    ..PlaceRef::default()
                }),
                place_lite: None,
            }),
            meta: None,
            impact: Impact {
                before: 0.5,
                after: 0.6,
                delta: 0.1,
                before100: 50,
                after100: 60,
            },
            arc_impact: Some(0.1),
            preview: true,
            subject_stop_id: Some(subject.to_string()),
        }
    }

    fn reorder_suggestion(id: &str, stop_id: &str, to_index: usize) -> Suggestion {
        Suggestion {
            id: id.to_string(),
            kind: SuggestionKind::Reorder,
            reason_code: ReasonCode::ArcSmoothing,
            patch_ops: vec![PatchOp::MoveStop {
                stop_id: stop_id.to_string(),
                to_index,
            }],
            new_place: None,
            meta: None,
            impact: Impact {
                before: 0.5,
                after: 0.6,
                delta: 0.1,
                before100: 50,
                after100: 60,
            },
            arc_impact: Some(0.05),
            preview: true,
            subject_stop_id: Some(stop_id.to_string()),
        }
    }

    #[test]
    fn replacement_signatures_use_subject_and_target() {
        let plan = plan_of(&["a", "b", "c"]);
        let suggestion = replacement_suggestion("s1", "b", "place-x");
        assert_eq!(
            semantic_signature(&plan, &suggestion),
            "replace|b|place-x"
        );
    }

    #[test]
    fn reorder_signatures_encode_final_order() {
        let plan = plan_of(&["a", "b", "c"]);
        let suggestion = reorder_suggestion("s1", "a", 2);
        assert_eq!(
            semantic_signature(&plan, &suggestion),
            "reorder|b,c,a"
        );
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let plan = plan_of(&["a", "b", "c"]);
        // Different move ops that land on the same final order collapse.
        let one = reorder_suggestion("first", "a", 2);
        let mut two = reorder_suggestion("second", "a", 2);
        two.patch_ops = vec![
            PatchOp::MoveStop {
                stop_id: "b".to_string(),
                to_index: 0,
            },
            PatchOp::MoveStop {
                stop_id: "c".to_string(),
                to_index: 1,
            },
        ];
        let kept = dedupe_suggestions_by_semantic_signature(&plan, vec![one, two.clone()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "first");

        let different = dedupe_suggestions_by_semantic_signature(
            &plan,
            vec![
                replacement_suggestion("r1", "b", "place-x"),
                replacement_suggestion("r2", "b", "place-y"),
            ],
        );
        assert_eq!(different.len(), 2);
    }
}

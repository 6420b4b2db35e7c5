//! Replacement search: the three-pass refinement ladder.
//!
//! Primary pass looks for strict improvements, the repair pass trades a
//! bounded score drop for removed violations, and the reorder-repair
//! fallback tries new orderings when no venue substitution qualifies. All
//! passes run under exact candidate caps and deterministic tie-breaks.

use log::debug;

use crate::arc::arc_contribution;
use crate::constants::{
    CANDIDATE_POOL_CAP, NEAR_EQUAL_ARC_DELTA, REORDER_REPAIR_EVAL_CAP, REPLACE_ARC_MIN_DELTA,
    REPLACE_KEPT_CAP, REPLACE_PRIMARY_SCORE_FLOOR, REPLACE_PRIMARY_SEEN_CAP,
    REPLACE_REPAIR_DROP_MULTI, REPLACE_REPAIR_DROP_SINGLE, REPLACE_REPAIR_SEEN_CAP,
    RESOLVER_LIMIT, RESOLVER_MIN_USEFUL, SCORE_EPSILON, SEARCH_RADII_KM,
};
use crate::constraints::{ConstraintSeverity, Family, family_for_type};
use crate::patch::{NewPlace, PatchOp, apply_patch_ops};
use crate::plan::{
    IdeaDateProfile, IntentVector, LatLng, PlaceLite, PlaceRef, Plan, Stop, StopRole,
};
use crate::recompute::{Live, recompute_live};
use crate::resolver::{CandidateQuery, CandidateResolver, ResolvedCandidate, ResolverTelemetry, mock_candidates};
use crate::suggestion::{ConstraintDelta, ReasonCode};
use crate::telemetry::{DiscardReason, PassUsed, RefineStats};
use crate::tilt::WeightMap;
use crate::travel::TravelCache;

/// One kept refinement candidate, from any pass.
#[derive(Debug, Clone)]
pub struct RefinePick {
    pub pass: PassUsed,
    pub reason: ReasonCode,
    pub subject_stop_id: String,
    /// Candidate place id for replacements, final-order signature for
    /// reorder-repair picks.
    pub candidate_id: String,
    pub patch_ops: Vec<PatchOp>,
    pub new_place: Option<NewPlace>,
    pub family: Family,
    pub after: Live,
    pub score_delta: f64,
    pub arc_delta: f64,
    pub friction_gain: f64,
    pub violations_delta: i64,
    pub constraint_delta: ConstraintDelta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateOrigin {
    Resolver,
    PlanDerived,
}

#[derive(Debug, Clone)]
struct PoolCandidate {
    resolved: ResolvedCandidate,
    origin: CandidateOrigin,
    profile: IdeaDateProfile,
}

/// Family a raw candidate belongs to, from its first classified type.
fn family_for_candidate(candidate: &ResolvedCandidate) -> Family {
    candidate
        .types
        .iter()
        .map(|raw| family_for_type(raw))
        .find(|family| *family != Family::Other)
        .unwrap_or(Family::Other)
}

/// Roles a family can plausibly fill.
const fn admissible_roles(family: Family) -> &'static [StopRole] {
    match family {
        Family::Food | Family::Other => {
            &[StopRole::Start, StopRole::Main, StopRole::WindDown]
        }
        Family::Nightlife | Family::Dessert => &[StopRole::Main, StopRole::WindDown],
        Family::Culture | Family::Outdoors => &[StopRole::Start, StopRole::Main],
    }
}

/// Default stop profile for a resolver candidate of a given family.
fn default_profile(family: Family, role: StopRole, duration_min: u32) -> IdeaDateProfile {
    let (energy_level, intent_vector) = match family {
        Family::Food => (
            0.55,
            IntentVector {
                intimacy: 0.6,
                energy: 0.5,
                novelty: 0.5,
                discovery: 0.45,
                pretense: 0.4,
                pressure: 0.25,
            },
        ),
        Family::Dessert => (
            0.45,
            IntentVector {
                intimacy: 0.65,
                energy: 0.4,
                novelty: 0.5,
                discovery: 0.4,
                pretense: 0.3,
                pressure: 0.15,
            },
        ),
        Family::Nightlife => (
            0.85,
            IntentVector {
                intimacy: 0.5,
                energy: 0.9,
                novelty: 0.6,
                discovery: 0.5,
                pretense: 0.5,
                pressure: 0.45,
            },
        ),
        Family::Culture => (
            0.5,
            IntentVector {
                intimacy: 0.5,
                energy: 0.45,
                novelty: 0.7,
                discovery: 0.75,
                pretense: 0.45,
                pressure: 0.2,
            },
        ),
        Family::Outdoors => (
            0.6,
            IntentVector {
                intimacy: 0.55,
                energy: 0.6,
                novelty: 0.55,
                discovery: 0.65,
                pretense: 0.2,
                pressure: 0.1,
            },
        ),
        Family::Other => (
            0.5,
            IntentVector {
                pressure: 0.3,
                ..IntentVector::splat(0.5)
            },
        ),
    };
    IdeaDateProfile {
        role,
        intent_vector,
        energy_level,
        duration_min,
        source_google_type: None,
        overrides: crate::plan::Overrides::default(),
    }
}

/// Stops ordered by pain: hard-constrained stops first, then low arc
/// contribution, then index.
fn pain_ranked_indices(live: &Live) -> Vec<usize> {
    let mut hard_implicated: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for violation in &live.computed.constraint_violations {
        if violation.severity == ConstraintSeverity::Hard {
            for id in &violation.stop_ids {
                hard_implicated.insert(id.as_str());
            }
        }
    }
    let mut indices: Vec<usize> = (0..live.plan.stops.len()).collect();
    indices.sort_by(|&a, &b| {
        let a_hard = hard_implicated.contains(live.plan.stops[a].id.as_str());
        let b_hard = hard_implicated.contains(live.plan.stops[b].id.as_str());
        b_hard
            .cmp(&a_hard)
            .then_with(|| {
                let a_contribution = live.computed.arc_contribution_by_index[a];
                let b_contribution = live.computed.arc_contribution_by_index[b];
                a_contribution
                    .partial_cmp(&b_contribution)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then(a.cmp(&b))
    });
    indices
}

/// Assemble the deduped, sorted, capped candidate pool for one stop and
/// radius.
async fn candidate_pool(
    live: &Live,
    subject: &Stop,
    role: StopRole,
    radius_meters: f64,
    resolver: &dyn CandidateResolver,
    stats: &mut RefineStats,
) -> Vec<PoolCandidate> {
    let query = CandidateQuery {
        role,
        stop: subject,
        plan: &live.plan,
        radius_meters,
        vibe_id: live.plan.meta.idea_date.vibe_id,
        limit: RESOLVER_LIMIT,
    };
    let resolver_started = std::time::Instant::now();
    let outcome = resolver.search_candidates(query).await;
    stats.timing.resolver = stats
        .timing
        .resolver
        .saturating_add(u64::try_from(resolver_started.elapsed().as_millis()).unwrap_or(u64::MAX));
    let (mut resolved, telemetry) = match outcome {
        Ok(found) => {
            let telemetry = ResolverTelemetry {
                used: true,
                count: found.len(),
                error: None,
            };
            (found, telemetry)
        }
        Err(failure) => {
            debug!("resolver failed for stop {}: {failure}", subject.id);
            (
                Vec::new(),
                ResolverTelemetry {
                    used: false,
                    count: 0,
                    error: Some(failure.message),
                },
            )
        }
    };
    stats.resolver.push(telemetry);
    resolved.truncate(RESOLVER_LIMIT);

    let mut pool: Vec<PoolCandidate> = resolved
        .into_iter()
        .map(|candidate| {
            let family = family_for_candidate(&candidate);
            let profile = default_profile(family, role, subject.idea_date.duration_min);
            PoolCandidate {
                resolved: candidate,
                origin: CandidateOrigin::Resolver,
                profile,
            }
        })
        .collect();

    if pool.len() < RESOLVER_MIN_USEFUL {
        for mock in mock_candidates(&live.plan, &subject.id) {
            // Plan-derived candidates carry their source stop's profile.
            let source_profile = live
                .plan
                .stops
                .iter()
                .find(|stop| mock.place_id == format!("mock-{}-{}", stop.id, subject.id))
                .map_or_else(IdeaDateProfile::default, |stop| stop.idea_date.clone());
            pool.push(PoolCandidate {
                resolved: mock,
                origin: CandidateOrigin::PlanDerived,
                profile: IdeaDateProfile {
                    role,
                    duration_min: subject.idea_date.duration_min,
                    ..source_profile
                },
            });
        }
    }

    pool.sort_by(|a, b| a.resolved.place_id.cmp(&b.resolved.place_id));
    pool.dedup_by(|a, b| a.resolved.place_id == b.resolved.place_id);
    pool.truncate(CANDIDATE_POOL_CAP);
    pool
}

fn new_place_for(candidate: &ResolvedCandidate, origin: CandidateOrigin) -> NewPlace {
    let lat_lng = (candidate.lat != 0.0 || candidate.lng != 0.0).then_some(LatLng {
        lat: candidate.lat,
        lng: candidate.lng,
    });
    NewPlace {
        name: candidate.name.clone(),
        place_ref: Some(PlaceRef {
            provider: match origin {
                CandidateOrigin::Resolver => "resolver".to_string(),
                CandidateOrigin::PlanDerived => "plan".to_string(),
            },
            place_id: candidate.place_id.clone(),
            lat_lng,
            ..PlaceRef::default()
        }),
        place_lite: Some(PlaceLite {
            place_id: candidate.place_id.clone(),
            name: candidate.name.clone(),
            types: candidate.types.clone(),
            price_level: candidate.price_level,
            editorial_summary: candidate.editorial_summary.clone(),
            ..PlaceLite::default()
        }),
    }
}

/// Tilt-weighted arc contribution total for a computed journey.
pub(crate) fn weighted_arc_total(live: &Live, weights: &WeightMap) -> f64 {
    let energy = live.plan.energy_series();
    arc_contribution(
        &energy,
        &live.computed.components.fatigue,
        &live.computed.components.friction,
        weights,
    )
    .total
}

/// Returns true when `a` should outrank `b` within a pass.
fn outranks(a: &RefinePick, b: &RefinePick) -> bool {
    if (a.arc_delta - b.arc_delta).abs() > NEAR_EQUAL_ARC_DELTA {
        return a.arc_delta > b.arc_delta;
    }
    if a.constraint_delta.hard != b.constraint_delta.hard {
        return a.constraint_delta.hard > b.constraint_delta.hard;
    }
    if a.constraint_delta.soft != b.constraint_delta.soft {
        return a.constraint_delta.soft > b.constraint_delta.soft;
    }
    if a.violations_delta != b.violations_delta {
        return a.violations_delta > b.violations_delta;
    }
    if (a.friction_gain - b.friction_gain).abs() > f64::EPSILON {
        return a.friction_gain > b.friction_gain;
    }
    if (a.score_delta - b.score_delta).abs() > f64::EPSILON {
        return a.score_delta > b.score_delta;
    }
    a.candidate_id < b.candidate_id
}

struct EvalContext<'a> {
    live: &'a Live,
    cache: &'a TravelCache,
    weights: &'a WeightMap,
    baseline_weighted_arc: f64,
}

enum EvalOutcome {
    Kept(Box<RefinePick>),
    Discarded(DiscardReason),
}

fn evaluate_candidate(
    ctx: &EvalContext<'_>,
    subject: &Stop,
    candidate: &PoolCandidate,
    pass: PassUsed,
) -> EvalOutcome {
    let place_id = candidate.resolved.place_id.as_str();
    if place_id.is_empty() || candidate.resolved.name.is_empty() {
        return EvalOutcome::Discarded(DiscardReason::MissingStopProfile);
    }
    if ctx
        .live
        .plan
        .stops
        .iter()
        .any(|stop| stop.place_id() == Some(place_id))
    {
        return EvalOutcome::Discarded(DiscardReason::DuplicatePlaceId);
    }

    let subject_index = ctx
        .live
        .plan
        .index_of(&subject.id)
        .unwrap_or_default();
    let implied_role = StopRole::implied_for_index(subject_index, ctx.live.plan.stops.len());
    let family = family_for_candidate(&candidate.resolved);
    // Role hints gate the primary pass only; the repair pass may still use a
    // role-mismatched candidate when it is the one that removes violations.
    if pass == PassUsed::Primary
        && candidate.origin == CandidateOrigin::Resolver
        && !admissible_roles(family).contains(&implied_role)
    {
        return EvalOutcome::Discarded(DiscardReason::RoleMismatch);
    }

    let new_place = new_place_for(&candidate.resolved, candidate.origin);
    let op = PatchOp::ReplaceStop {
        stop_id: subject.id.clone(),
        new_place: new_place.clone(),
        new_idea_date_profile: candidate.profile.clone(),
    };
    let Ok(patched) = apply_patch_ops(&ctx.live.plan, std::slice::from_ref(&op)) else {
        return EvalOutcome::Discarded(DiscardReason::InvariantViolation);
    };
    let Ok(after) = recompute_live(&patched, ctx.cache) else {
        return EvalOutcome::Discarded(DiscardReason::InvariantViolation);
    };

    let before = &ctx.live.computed;
    let score_delta = after.computed.journey_score - before.journey_score;
    let hard_delta = i64::try_from(before.constraint_hard_count).unwrap_or(0)
        - i64::try_from(after.computed.constraint_hard_count).unwrap_or(0);
    if hard_delta < 0 {
        return EvalOutcome::Discarded(DiscardReason::IncreasesHardConstraints);
    }
    let soft_delta = i64::try_from(before.constraint_soft_count).unwrap_or(0)
        - i64::try_from(after.computed.constraint_soft_count).unwrap_or(0);
    let violations_delta = i64::try_from(before.violations.len()).unwrap_or(0)
        - i64::try_from(after.computed.violations.len()).unwrap_or(0);
    let friction_gain = before.friction_penalty - after.computed.friction_penalty;
    let arc_delta = weighted_arc_total(&after, ctx.weights) - ctx.baseline_weighted_arc;

    match pass {
        PassUsed::Primary => {
            if score_delta < REPLACE_PRIMARY_SCORE_FLOOR {
                return EvalOutcome::Discarded(DiscardReason::WorsensJourneyScore);
            }
            let qualifies = arc_delta > REPLACE_ARC_MIN_DELTA
                || violations_delta > 0
                || friction_gain > SCORE_EPSILON
                || score_delta > SCORE_EPSILON;
            if !qualifies {
                if violations_delta < 0 {
                    return EvalOutcome::Discarded(DiscardReason::IncreasesViolations);
                }
                return EvalOutcome::Discarded(DiscardReason::NoArcImprovement);
            }
        }
        PassUsed::Repair => {
            if violations_delta <= 0 {
                if violations_delta < 0 {
                    return EvalOutcome::Discarded(DiscardReason::IncreasesViolations);
                }
                return EvalOutcome::Discarded(DiscardReason::NoArcImprovement);
            }
            let allowed_drop = if violations_delta >= 2 {
                REPLACE_REPAIR_DROP_MULTI
            } else {
                REPLACE_REPAIR_DROP_SINGLE
            };
            if score_delta < allowed_drop {
                return EvalOutcome::Discarded(DiscardReason::WorsensJourneyScore);
            }
        }
        PassUsed::None | PassUsed::ReorderRepair => {
            return EvalOutcome::Discarded(DiscardReason::InvariantViolation);
        }
    }

    let reason = match pass {
        PassUsed::Repair => ReasonCode::RepairConstraint,
        _ => ReasonCode::ImproveArc,
    };
    EvalOutcome::Kept(Box::new(RefinePick {
        pass,
        reason,
        subject_stop_id: subject.id.clone(),
        candidate_id: candidate.resolved.place_id.clone(),
        patch_ops: vec![op],
        new_place: Some(new_place),
        family,
        after,
        score_delta,
        arc_delta,
        friction_gain,
        violations_delta,
        constraint_delta: ConstraintDelta {
            hard: hard_delta,
            soft: soft_delta,
        },
    }))
}

async fn run_replacement_pass(
    live: &Live,
    cache: &TravelCache,
    resolver: &dyn CandidateResolver,
    weights: &WeightMap,
    stats: &mut RefineStats,
    pass: PassUsed,
) -> Vec<RefinePick> {
    let seen_cap = match pass {
        PassUsed::Repair => REPLACE_REPAIR_SEEN_CAP,
        _ => REPLACE_PRIMARY_SEEN_CAP,
    };
    let baseline_weighted_arc = weighted_arc_total(live, weights);
    let ctx = EvalContext {
        live,
        cache,
        weights,
        baseline_weighted_arc,
    };

    let mut kept: Vec<RefinePick> = Vec::new();
    let mut seen = 0usize;
    'stops: for index in pain_ranked_indices(live) {
        let subject = live.plan.stops[index].clone();
        if !subject.has_usable_profile() {
            stats.discard_counts.increment(DiscardReason::MissingStopProfile);
            continue;
        }
        let role = StopRole::implied_for_index(index, live.plan.stops.len());
        let mut tried: std::collections::HashSet<String> = std::collections::HashSet::new();
        for radius_km in SEARCH_RADII_KM {
            let pool =
                candidate_pool(live, &subject, role, radius_km * 1000.0, resolver, stats).await;
            stats.candidate_count += u32::try_from(pool.len()).unwrap_or(u32::MAX);
            for candidate in &pool {
                if seen >= seen_cap {
                    break 'stops;
                }
                if !tried.insert(candidate.resolved.place_id.clone()) {
                    continue;
                }
                seen += 1;
                match evaluate_candidate(&ctx, &subject, candidate, pass) {
                    EvalOutcome::Kept(pick) => kept.push(*pick),
                    EvalOutcome::Discarded(reason) => {
                        stats.discard_counts.increment(reason);
                    }
                }
            }
        }
    }

    stats.evaluated_count += u32::try_from(seen).unwrap_or(u32::MAX);
    let counters = match pass {
        PassUsed::Repair => &mut stats.pass_breakdown.repair,
        _ => &mut stats.pass_breakdown.primary,
    };
    counters.seen = u32::try_from(seen).unwrap_or(u32::MAX);

    // Best candidate per subject stop, then the best stops overall.
    kept.sort_by(|a, b| {
        if outranks(a, b) {
            std::cmp::Ordering::Less
        } else if outranks(b, a) {
            std::cmp::Ordering::Greater
        } else {
            std::cmp::Ordering::Equal
        }
    });
    let mut per_stop: Vec<RefinePick> = Vec::new();
    for pick in kept {
        if !per_stop
            .iter()
            .any(|existing| existing.subject_stop_id == pick.subject_stop_id)
        {
            per_stop.push(pick);
        }
    }
    per_stop.truncate(REPLACE_KEPT_CAP);
    counters.kept = u32::try_from(per_stop.len()).unwrap_or(u32::MAX);
    counters.discarded = counters.seen.saturating_sub(counters.kept);
    per_stop
}

fn permutations(count: usize) -> Vec<Vec<usize>> {
    fn recurse(prefix: &mut Vec<usize>, remaining: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if remaining.is_empty() {
            out.push(prefix.clone());
            return;
        }
        for index in 0..remaining.len() {
            let value = remaining.remove(index);
            prefix.push(value);
            recurse(prefix, remaining, out);
            prefix.pop();
            remaining.insert(index, value);
        }
    }
    let mut out = Vec::new();
    recurse(&mut Vec::new(), &mut (0..count).collect(), &mut out);
    out
}

fn move_ops_for_order(plan: &Plan, order: &[usize]) -> Vec<PatchOp> {
    let mut current: Vec<String> = plan.stops.iter().map(|stop| stop.id.clone()).collect();
    let target: Vec<String> = order
        .iter()
        .map(|&index| plan.stops[index].id.clone())
        .collect();
    let mut ops = Vec::new();
    for position in 0..target.len() {
        if current[position] == target[position] {
            continue;
        }
        let from = current
            .iter()
            .position(|id| *id == target[position])
            .unwrap_or(position);
        let id = current.remove(from);
        current.insert(position, id.clone());
        ops.push(PatchOp::MoveStop {
            stop_id: id,
            to_index: position,
        });
    }
    ops
}

fn reorder_repair_pass(
    live: &Live,
    cache: &TravelCache,
    weights: &WeightMap,
    stats: &mut RefineStats,
) -> Option<RefinePick> {
    let count = live.plan.stops.len();
    let orders: Vec<Vec<usize>> = if count <= 5 {
        permutations(count)
            .into_iter()
            .filter(|order| order.iter().enumerate().any(|(i, &v)| i != v))
            .collect()
    } else {
        (0..count - 1)
            .map(|swap| {
                let mut order: Vec<usize> = (0..count).collect();
                order.swap(swap, swap + 1);
                order
            })
            .collect()
    };

    let baseline_weighted_arc = weighted_arc_total(live, weights);
    let before = &live.computed;
    let mut best: Option<RefinePick> = None;
    let mut deltas: Vec<f64> = Vec::new();
    let mut evaluated = 0u32;
    for order in orders {
        if evaluated as usize >= REORDER_REPAIR_EVAL_CAP {
            break;
        }
        let ops = move_ops_for_order(&live.plan, &order);
        if ops.is_empty() {
            continue;
        }
        let Ok(patched) = apply_patch_ops(&live.plan, &ops) else {
            continue;
        };
        let Ok(after) = recompute_live(&patched, cache) else {
            continue;
        };
        evaluated += 1;

        let score_delta = after.computed.journey_score - before.journey_score;
        deltas.push(score_delta);
        let hard_delta = i64::try_from(before.constraint_hard_count).unwrap_or(0)
            - i64::try_from(after.computed.constraint_hard_count).unwrap_or(0);
        if hard_delta < 0 {
            continue;
        }
        let soft_delta = i64::try_from(before.constraint_soft_count).unwrap_or(0)
            - i64::try_from(after.computed.constraint_soft_count).unwrap_or(0);
        let violations_delta = i64::try_from(before.violations.len()).unwrap_or(0)
            - i64::try_from(after.computed.violations.len()).unwrap_or(0);
        let arc_delta = weighted_arc_total(&after, weights) - baseline_weighted_arc;
        let qualifies = violations_delta > 0
            || arc_delta > SCORE_EPSILON
            || score_delta > SCORE_EPSILON;
        if !qualifies {
            continue;
        }

        let friction_gain = before.friction_penalty - after.computed.friction_penalty;
        let signature: Vec<String> = after
            .plan
            .stops
            .iter()
            .map(|stop| stop.id.clone())
            .collect();
        let pick = RefinePick {
            pass: PassUsed::ReorderRepair,
            reason: ReasonCode::ReorderRepair,
            subject_stop_id: ops
                .first()
                .map(|op| op.subject_stop_id().to_string())
                .unwrap_or_default(),
            candidate_id: signature.join(">"),
            patch_ops: ops,
            new_place: None,
            family: Family::Other,
            after,
            score_delta,
            arc_delta,
            friction_gain,
            violations_delta,
            constraint_delta: ConstraintDelta {
                hard: hard_delta,
                soft: soft_delta,
            },
        };
        let replace = best.as_ref().is_none_or(|current| outranks(&pick, current));
        if replace {
            best = Some(pick);
        }
    }

    deltas.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    deltas.truncate(3);
    stats.pass_breakdown.reorder_repair.evaluated = evaluated;
    stats.pass_breakdown.reorder_repair.kept = u32::from(best.is_some());
    stats.pass_breakdown.reorder_repair.top_deltas = deltas;
    best
}

/// Run the full three-pass ladder. Returns the kept picks in rank order and
/// records counters into `stats`.
pub async fn replacement_search(
    live: &Live,
    cache: &TravelCache,
    resolver: &dyn CandidateResolver,
    weights: &WeightMap,
    stats: &mut RefineStats,
) -> Vec<RefinePick> {
    let primary =
        run_replacement_pass(live, cache, resolver, weights, stats, PassUsed::Primary).await;
    if !primary.is_empty() {
        stats.pass_used = PassUsed::Primary;
        return primary;
    }

    let repair =
        run_replacement_pass(live, cache, resolver, weights, stats, PassUsed::Repair).await;
    if !repair.is_empty() {
        stats.pass_used = PassUsed::Repair;
        return repair;
    }

    if let Some(pick) = reorder_repair_pass(live, cache, weights, stats) {
        stats.pass_used = PassUsed::ReorderRepair;
        return vec![pick];
    }
    stats.pass_used = PassUsed::None;
    Vec::new()
}

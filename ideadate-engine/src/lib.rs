//! Idea-Date Journey Engine
//!
//! Platform-agnostic core for the Idea-Date planner: deterministic journey
//! scoring, constraint evaluation, and suggestion refinement. This crate
//! provides the whole engine without UI, transport, or persistence
//! dependencies.

pub mod arc;
pub mod constants;
pub mod constraints;
pub mod error;
pub mod narrative;
pub mod numbers;
pub mod patch;
pub mod plan;
pub mod rank;
pub mod recompute;
pub mod reorder;
pub mod replace;
pub mod resolver;
pub mod scoring;
pub mod seeds;
pub mod suggest;
pub mod suggestion;
pub mod telemetry;
pub mod tilt;
pub mod travel;
pub mod vibes;

// Re-export commonly used types
pub use arc::{ArcContribution, ArcModel, ArcPoint, StopFactors, arc_contribution, arc_model};
pub use constraints::{
    ConstraintKind, ConstraintSeverity, ConstraintViolation, Family, constraint_narratives,
    dominant_duplicate_family, evaluate_constraints, family_for_stop, family_for_type,
};
pub use error::EngineError;
pub use narrative::{NarrativeContext, constraint_note, structural_note, tilt_note, translate};
pub use patch::{NewPlace, PatchOp, PatchOps, apply_patch_ops};
pub use plan::{
    IdeaDateMode, IdeaDateProfile, IntentVector, LatLng, Overrides, PlaceLite, PlaceRef, Plan,
    PlanMeta, PlanProfile, PrefTilt, SchemaError, Stop, StopRole, TravelMode, VibeId,
};
pub use rank::{DiversityPolicy, RankEntry, ReplacementRanking, ranked_indices};
pub use recompute::{
    Computed, Live, ScoreComponents, Violation, ViolationSeverity, ViolationType, recompute_live,
};
pub use reorder::{ReorderOutcome, reorder_search};
pub use replace::{RefinePick, replacement_search};
pub use resolver::{
    CandidateQuery, CandidateResolver, NullResolver, ResolvedCandidate, ResolverFailure,
    ResolverTelemetry, mock_candidates,
};
pub use scoring::{
    FatigueBreakdown, FrictionBreakdown, IntentBreakdown, fatigue_breakdown, friction_breakdown,
    intent_breakdown, journey_score,
};
pub use suggest::{
    FamilyKeyAdapter, SuggestOptions, SuggestionPack, dedupe_suggestions_by_semantic_signature,
    semantic_signature, suggestion_notes, suggestion_pack,
};
pub use suggestion::{
    ConstraintDelta, Impact, ReasonCode, Suggestion, SuggestionKind, SuggestionMeta,
};
pub use telemetry::{
    DiscardCounts, DiscardReason, PassBreakdown, PassCounters, PassUsed, RefineStats,
    ReorderRepairCounters, TimingMs, TopConstraintDelta,
};
pub use tilt::{TiltProfile, TiltSource, WeightMap, mode_default_tilt, mode_label, resolve_tilt,
    weight_map_for};
pub use travel::{TravelCache, TravelEdge, TravelSummary, node_key, plan_travel};
pub use vibes::{VibeProfile, effective_importance, effective_target, vibe_profile};

/// Engine facade binding the travel cache and a resolver capability.
///
/// The cache is the only shared state; everything else is derived per call.
pub struct JourneyEngine<R>
where
    R: CandidateResolver,
{
    travel_cache: TravelCache,
    resolver: R,
}

impl JourneyEngine<NullResolver> {
    /// Engine with no resolver: refinement falls back to plan-derived
    /// candidates.
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolver(NullResolver)
    }
}

impl Default for JourneyEngine<NullResolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> JourneyEngine<R>
where
    R: CandidateResolver,
{
    /// Engine with an injected resolver capability.
    #[must_use]
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            travel_cache: TravelCache::new(),
            resolver,
        }
    }

    /// Shared travel cache; exposed for lifecycle control in tests.
    #[must_use]
    pub const fn travel_cache(&self) -> &TravelCache {
        &self.travel_cache
    }

    /// Recompute all derived metrics for a plan.
    ///
    /// # Errors
    ///
    /// Returns an error when the plan fails structural validation.
    pub fn recompute_live(&self, plan: &Plan) -> Result<Live, EngineError> {
        recompute_live(plan, &self.travel_cache)
    }

    /// Build the suggestion pack for a plan.
    ///
    /// # Errors
    ///
    /// Returns an error when the plan fails structural validation.
    pub async fn suggestion_pack(
        &self,
        plan: &Plan,
        options: &SuggestOptions,
    ) -> Result<SuggestionPack, EngineError> {
        suggestion_pack(plan, options, &self.resolver, &self.travel_cache).await
    }

    /// Apply a batch of patch ops to a plan.
    ///
    /// # Errors
    ///
    /// Returns an error when the batch violates a plan invariant.
    pub fn apply_patch_ops(&self, plan: &Plan, ops: &[PatchOp]) -> Result<Plan, EngineError> {
        apply_patch_ops(plan, ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_recomputes_seed_plans() {
        let engine = JourneyEngine::new();
        let live = engine.recompute_live(&seeds::clean_seed()).unwrap();
        assert!(live.computed.journey_score100 >= 70);
        assert_eq!(live.computed.constraint_hard_count, 0);
        assert_eq!(engine.travel_cache().len(), live.travel.edges.len());
    }

    #[tokio::test]
    async fn engine_builds_packs_without_resolver() {
        let engine = JourneyEngine::new();
        let pack = engine
            .suggestion_pack(&seeds::messy_seed(), &SuggestOptions::default())
            .await
            .unwrap();
        assert!(pack.suggestions.len() <= 3);
        assert!(pack.debug_refine_stats.is_some());
    }
}

//! Candidate resolver seam: the only asynchronous capability the engine
//! consumes. Absence or failure degrades to plan-derived mock candidates and
//! is recorded in telemetry, never propagated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::{Plan, Stop, StopRole, VibeId};

/// External venue candidate returned by a resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCandidate {
    pub place_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editorial_summary: Option<String>,
}

/// Query the engine issues for one stop substitution.
#[derive(Debug, Clone, Copy)]
pub struct CandidateQuery<'a> {
    pub role: StopRole,
    pub stop: &'a Stop,
    pub plan: &'a Plan,
    pub radius_meters: f64,
    pub vibe_id: VibeId,
    pub limit: usize,
}

/// Resolver-side failure. Carried in telemetry only; the engine treats any
/// failure as an empty candidate list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("resolver failure: {message}")]
pub struct ResolverFailure {
    pub message: String,
}

impl ResolverFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Asynchronous venue lookup capability.
///
/// Implementations must be pure with respect to the query from the engine's
/// point of view and must never panic into the engine.
#[async_trait]
pub trait CandidateResolver: Send + Sync {
    async fn search_candidates(
        &self,
        query: CandidateQuery<'_>,
    ) -> Result<Vec<ResolvedCandidate>, ResolverFailure>;
}

/// Zero-candidate adapter used when no resolver is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

#[async_trait]
impl CandidateResolver for NullResolver {
    async fn search_candidates(
        &self,
        _query: CandidateQuery<'_>,
    ) -> Result<Vec<ResolvedCandidate>, ResolverFailure> {
        Ok(Vec::new())
    }
}

/// Resolver outcome snapshot surfaced through telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolverTelemetry {
    pub used: bool,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Derive fallback candidates from the other stops of the plan.
///
/// Used when the resolver fails or returns too few entries. Candidates are
/// emitted in stop order and id-prefixed so they can never collide with a
/// live place id.
#[must_use]
pub fn mock_candidates(plan: &Plan, subject_stop_id: &str) -> Vec<ResolvedCandidate> {
    plan.stops
        .iter()
        .filter(|stop| stop.id != subject_stop_id)
        .filter_map(|stop| {
            let lite = stop.place_lite.as_ref()?;
            let lat_lng = stop.lat_lng();
            Some(ResolvedCandidate {
                place_id: format!("mock-{}-{}", stop.id, subject_stop_id),
                name: lite.name.clone(),
                lat: lat_lng.map_or(0.0, |coords| coords.lat),
                lng: lat_lng.map_or(0.0, |coords| coords.lng),
                types: lite.types.clone(),
                price_level: lite.price_level,
                editorial_summary: lite.editorial_summary.clone(),
            })
        })
        .collect()
}

//! Travel estimation between stops: geodesic distance, mode-based minutes,
//! and the process-local edge cache.
//!
//! Estimates are pure functions of the two endpoints and the travel mode;
//! the cache only short-circuits recomputation and never changes a result.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::constants::{
    EARTH_RADIUS_METERS, TRAVEL_CACHE_TTL_SECS, TRAVEL_DRIVE_SPEED_MPS, TRAVEL_FALLBACK_METERS,
    TRAVEL_SAME_PLACE_METERS, TRAVEL_WALK_SPEED_MPS,
};
use crate::numbers::round_f64_to_u32;
use crate::plan::{LatLng, Plan, Stop, TravelMode};

/// Stable identity for a travel graph node.
#[must_use]
pub fn node_key(stop: &Stop) -> String {
    if let Some(place_id) = stop.place_id() {
        return place_id.to_string();
    }
    if let Some(lat_lng) = stop.lat_lng() {
        return format!("latlng:{:.5},{:.5}", lat_lng.lat, lat_lng.lng);
    }
    if stop.id.is_empty() {
        "unknown".to_string()
    } else {
        stop.id.clone()
    }
}

/// Great-circle distance in meters.
#[must_use]
pub fn haversine_meters(from: LatLng, to: LatLng) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlat = (to.lat - from.lat).to_radians();
    let dlng = (to.lng - from.lng).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Estimated distance between two stops.
///
/// Haversine when both coordinates are known; a short fixed hop when the two
/// stops share a place id; a conservative fallback otherwise.
#[must_use]
pub fn estimate_meters(from: &Stop, to: &Stop) -> f64 {
    if let (Some(a), Some(b)) = (from.lat_lng(), to.lat_lng()) {
        return haversine_meters(a, b);
    }
    match (from.place_id(), to.place_id()) {
        (Some(a), Some(b)) if a == b => TRAVEL_SAME_PLACE_METERS,
        _ => TRAVEL_FALLBACK_METERS,
    }
}

/// Convert meters to whole transfer minutes for a travel mode, minimum one.
#[must_use]
pub fn meters_to_minutes(meters: f64, mode: TravelMode) -> u32 {
    let speed = match mode {
        TravelMode::Walk => TRAVEL_WALK_SPEED_MPS,
        TravelMode::Drive => TRAVEL_DRIVE_SPEED_MPS,
    };
    round_f64_to_u32((meters / speed) / 60.0).max(1)
}

/// One estimated transition of the journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelEdge {
    pub from_key: String,
    pub to_key: String,
    pub minutes: u32,
    pub meters: f64,
}

/// Travel view of a whole plan: per-edge estimates plus totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelSummary {
    pub mode: TravelMode,
    pub edges: Vec<TravelEdge>,
    pub total_travel_min: u32,
    pub total_stop_min: u32,
}

#[derive(Debug, Clone, Copy)]
struct CachedEdge {
    minutes: u32,
    meters: f64,
    stored_at: Instant,
}

/// Process-local cache of travel edges keyed by `(from, to, mode)`.
///
/// Shared across concurrent evaluations behind a coarse mutex. Entries
/// expire after 24 hours and are swept on access. Results are bit-identical
/// whether served hot or cold.
#[derive(Debug)]
pub struct TravelCache {
    ttl: Duration,
    edges: Mutex<HashMap<(String, String, TravelMode), CachedEdge>>,
}

impl Default for TravelCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TravelCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(TRAVEL_CACHE_TTL_SECS))
    }

    /// Cache with an explicit time-to-live; entries at or past it are swept
    /// on access.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            edges: Mutex::new(HashMap::new()),
        }
    }

    /// Estimate one edge, serving from cache when a live entry exists.
    pub fn estimate(&self, from: &Stop, to: &Stop, mode: TravelMode) -> TravelEdge {
        let from_key = node_key(from);
        let to_key = node_key(to);
        let key = (from_key.clone(), to_key.clone(), mode);
        let ttl = self.ttl;
        let now = Instant::now();

        let mut edges = match self.edges.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        edges.retain(|_, cached| now.duration_since(cached.stored_at) < ttl);
        if let Some(cached) = edges.get(&key) {
            return TravelEdge {
                from_key,
                to_key,
                minutes: cached.minutes,
                meters: cached.meters,
            };
        }

        let meters = estimate_meters(from, to);
        let minutes = meters_to_minutes(meters, mode);
        edges.insert(
            key,
            CachedEdge {
                minutes,
                meters,
                stored_at: now,
            },
        );
        TravelEdge {
            from_key,
            to_key,
            minutes,
            meters,
        }
    }

    /// Drop every cached edge. Idempotent.
    pub fn clear(&self) {
        match self.edges.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Number of live cached edges.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.edges.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

}

/// Estimate every transition of a plan in stop order.
#[must_use]
pub fn plan_travel(plan: &Plan, cache: &TravelCache) -> TravelSummary {
    let mode = plan.meta.idea_date.travel_mode;
    let mut edges = Vec::with_capacity(plan.stops.len().saturating_sub(1));
    for pair in plan.stops.windows(2) {
        edges.push(cache.estimate(&pair[0], &pair[1], mode));
    }
    let total_travel_min = edges.iter().map(|edge| edge.minutes).sum();
    let total_stop_min = plan
        .stops
        .iter()
        .map(|stop| stop.idea_date.duration_min)
        .sum();
    TravelSummary {
        mode,
        edges,
        total_travel_min,
        total_stop_min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{IdeaDateProfile, PlaceRef, PlanMeta};

    fn stop_at(id: &str, lat: f64, lng: f64) -> Stop {
        Stop {
            id: id.to_string(),
            name: format!("Stop {id}"),
            place_ref: Some(PlaceRef {
                place_id: format!("place-{id}"),
                lat_lng: Some(LatLng { lat, lng }),
                ..PlaceRef::default()
            }),
            place_lite: None,
            idea_date: IdeaDateProfile::default(),
        }
    }

    fn bare_stop(id: &str) -> Stop {
        Stop {
            id: id.to_string(),
            name: format!("Stop {id}"),
            place_ref: None,
            place_lite: None,
            idea_date: IdeaDateProfile::default(),
        }
    }

    #[test]
    fn node_key_prefers_place_id_then_latlng_then_id() {
        let with_place = stop_at("a", 48.85, 2.35);
        assert_eq!(node_key(&with_place), "place-a");

        let mut with_latlng = stop_at("b", 48.85, 2.35);
        with_latlng.place_ref.as_mut().unwrap().place_id = String::new();
        assert_eq!(node_key(&with_latlng), "latlng:48.85000,2.35000");

        assert_eq!(node_key(&bare_stop("c")), "c");

        let mut anonymous = bare_stop("");
        anonymous.id = String::new();
        assert_eq!(node_key(&anonymous), "unknown");
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Paris Notre-Dame to the Louvre, roughly 1.5 km.
        let from = LatLng {
            lat: 48.853,
            lng: 2.3499,
        };
        let to = LatLng {
            lat: 48.8606,
            lng: 2.3376,
        };
        let meters = haversine_meters(from, to);
        assert!((1000.0..2000.0).contains(&meters), "got {meters}");
    }

    #[test]
    fn fallback_distances_apply_without_coordinates() {
        let mut a = bare_stop("a");
        let mut b = bare_stop("b");
        assert!((estimate_meters(&a, &b) - TRAVEL_FALLBACK_METERS).abs() < f64::EPSILON);

        a.place_ref = Some(PlaceRef {
            place_id: "same".to_string(),
            ..PlaceRef::default()
        });
        b.place_ref = Some(PlaceRef {
            place_id: "same".to_string(),
            ..PlaceRef::default()
        });
        assert!((estimate_meters(&a, &b) - TRAVEL_SAME_PLACE_METERS).abs() < f64::EPSILON);
    }

    #[test]
    fn minutes_floor_at_one() {
        assert_eq!(meters_to_minutes(1.0, TravelMode::Walk), 1);
        assert_eq!(meters_to_minutes(1680.0, TravelMode::Walk), 20);
        assert_eq!(meters_to_minutes(1680.0, TravelMode::Drive), 3);
    }

    #[test]
    fn cache_round_trip_matches_cold_estimate() {
        let cache = TravelCache::new();
        let a = stop_at("a", 48.85, 2.35);
        let b = stop_at("b", 48.86, 2.36);
        let cold = cache.estimate(&a, &b, TravelMode::Walk);
        let hot = cache.estimate(&a, &b, TravelMode::Walk);
        assert_eq!(cold, hot);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_sweeps_expired_entries_and_clears() {
        // A zero TTL expires every entry by the next access.
        let cache = TravelCache::with_ttl(Duration::ZERO);
        let a = stop_at("a", 48.85, 2.35);
        let b = stop_at("b", 48.86, 2.36);
        let first = cache.estimate(&a, &b, TravelMode::Walk);
        assert_eq!(cache.len(), 1);
        let second = cache.estimate(&a, &b, TravelMode::Walk);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_is_safe_under_concurrent_estimates() {
        let cache = TravelCache::new();
        let stops: Vec<Stop> = (0..8)
            .map(|i| stop_at(&format!("s{i}"), 48.85 + 0.002 * f64::from(i), 2.35))
            .collect();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for pair in stops.windows(2) {
                        let edge = cache.estimate(&pair[0], &pair[1], TravelMode::Walk);
                        let cold = meters_to_minutes(
                            estimate_meters(&pair[0], &pair[1]),
                            TravelMode::Walk,
                        );
                        assert_eq!(edge.minutes, cold);
                    }
                });
            }
        });
        assert_eq!(cache.len(), 7);
    }

    #[test]
    fn plan_travel_walks_stop_order() {
        let cache = TravelCache::new();
        let plan = Plan {
            id: "p".to_string(),
            name: String::new(),
            stops: vec![
                stop_at("a", 48.85, 2.35),
                stop_at("b", 48.86, 2.36),
                stop_at("c", 48.87, 2.37),
            ],
            meta: PlanMeta::default(),
        };
        let travel = plan_travel(&plan, &cache);
        assert_eq!(travel.edges.len(), 2);
        assert_eq!(travel.mode, TravelMode::Walk);
        assert_eq!(
            travel.total_travel_min,
            travel.edges.iter().map(|e| e.minutes).sum::<u32>()
        );
        assert_eq!(travel.total_stop_min, 180);
    }
}

//! Plan and stop schema: the immutable journey state every engine pass
//! consumes. Field names follow the persisted wire format, so plans
//! round-trip through JSON without loss.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{STOP_DURATION_MAX, STOP_DURATION_MIN};
use crate::numbers::{clamp01, clamp_signed_unit};

/// Six named intent axes, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IntentVector {
    pub intimacy: f64,
    pub energy: f64,
    pub novelty: f64,
    pub discovery: f64,
    pub pretense: f64,
    pub pressure: f64,
}

impl IntentVector {
    /// Fixed axis iteration order used by every accumulation in the engine.
    #[must_use]
    pub const fn axes(&self) -> [f64; 6] {
        [
            self.intimacy,
            self.energy,
            self.novelty,
            self.discovery,
            self.pretense,
            self.pressure,
        ]
    }

    /// Clamp every axis to the unit interval.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            intimacy: clamp01(self.intimacy),
            energy: clamp01(self.energy),
            novelty: clamp01(self.novelty),
            discovery: clamp01(self.discovery),
            pretense: clamp01(self.pretense),
            pressure: clamp01(self.pressure),
        }
    }

    /// Uniform vector helper used by vibe profiles.
    #[must_use]
    pub const fn splat(value: f64) -> Self {
        Self {
            intimacy: value,
            energy: value,
            novelty: value,
            discovery: value,
            pretense: value,
            pressure: value,
        }
    }
}

/// Role a stop plays in the journey shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum StopRole {
    Start,
    #[default]
    Main,
    WindDown,
}

impl StopRole {
    /// Role implied by a stop's index under the index convention.
    #[must_use]
    pub const fn implied_for_index(index: usize, stop_count: usize) -> Self {
        if index == 0 {
            Self::Start
        } else if index + 1 == stop_count {
            Self::WindDown
        } else {
            Self::Main
        }
    }
}

/// User steering knobs persisted per stop, each in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    pub chill_lively: f64,
    pub relaxed_active: f64,
    pub quick_lingering: f64,
}

impl Overrides {
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            chill_lively: clamp_signed_unit(self.chill_lively),
            relaxed_active: clamp_signed_unit(self.relaxed_active),
            quick_lingering: clamp_signed_unit(self.quick_lingering),
        }
    }
}

/// Geographic coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Provider-backed reference to an external place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRef {
    #[serde(default)]
    pub provider: String,
    pub place_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat_lng: Option<LatLng>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Denormalized venue details carried alongside the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaceLite {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editorial_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Per-stop journey profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaDateProfile {
    #[serde(default)]
    pub role: StopRole,
    #[serde(default)]
    pub intent_vector: IntentVector,
    #[serde(default)]
    pub energy_level: f64,
    #[serde(default = "default_duration_min")]
    pub duration_min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_google_type: Option<String>,
    #[serde(default)]
    pub overrides: Overrides,
}

const fn default_duration_min() -> u32 {
    60
}

impl Default for IdeaDateProfile {
    fn default() -> Self {
        Self {
            role: StopRole::Main,
            intent_vector: IntentVector::default(),
            energy_level: 0.5,
            duration_min: default_duration_min(),
            source_google_type: None,
            overrides: Overrides::default(),
        }
    }
}

impl IdeaDateProfile {
    /// Clamp every recoverable field to its documented bounds.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            role: self.role,
            intent_vector: self.intent_vector.clamped(),
            energy_level: clamp01(self.energy_level),
            duration_min: self
                .duration_min
                .clamp(STOP_DURATION_MIN, STOP_DURATION_MAX),
            source_google_type: self.source_google_type.clone(),
            overrides: self.overrides.clamped(),
        }
    }
}

/// A venue in the journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_ref: Option<PlaceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_lite: Option<PlaceLite>,
    #[serde(default)]
    pub idea_date: IdeaDateProfile,
}

impl Stop {
    /// The stop's external place id, when one is attached.
    #[must_use]
    pub fn place_id(&self) -> Option<&str> {
        self.place_ref
            .as_ref()
            .map(|place| place.place_id.as_str())
            .or_else(|| self.place_lite.as_ref().map(|lite| lite.place_id.as_str()))
            .filter(|id| !id.is_empty())
    }

    /// The stop's coordinates, when known.
    #[must_use]
    pub fn lat_lng(&self) -> Option<LatLng> {
        self.place_ref.as_ref().and_then(|place| place.lat_lng)
    }

    /// Whether the stop carries enough profile to be scored and substituted.
    #[must_use]
    pub fn has_usable_profile(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty() && self.idea_date.energy_level.is_finite()
    }
}

/// Travel mode assumed between stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TravelMode {
    #[default]
    Walk,
    Drive,
}

/// Named vibe preset the plan targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VibeId {
    #[default]
    FirstDateLowPressure,
    AnniversaryIntimate,
}

/// Named mode preset supplying a default tilt and label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdeaDateMode {
    #[default]
    Default,
    TouristDay,
    Family,
    AnniversaryIntimate,
    FirstDateLowPressure,
}

/// Three-dimensional user steering, each component in {-1, 0, 1}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PrefTilt {
    pub vibe: i8,
    pub walking: i8,
    pub peak: i8,
}

impl PrefTilt {
    /// The neutral triple; a plan carrying it defers to the mode default.
    pub const NEUTRAL: Self = Self {
        vibe: 0,
        walking: 0,
        peak: 0,
    };

    #[must_use]
    pub const fn is_neutral(&self) -> bool {
        self.vibe == 0 && self.walking == 0 && self.peak == 0
    }

    /// Clamp every component into {-1, 0, 1}.
    #[must_use]
    pub const fn sanitized(&self) -> Self {
        Self {
            vibe: clamp_tilt(self.vibe),
            walking: clamp_tilt(self.walking),
            peak: clamp_tilt(self.peak),
        }
    }
}

const fn clamp_tilt(value: i8) -> i8 {
    if value > 0 {
        1
    } else if value < 0 {
        -1
    } else {
        0
    }
}

/// Plan-level journey profile persisted under `meta.ideaDate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanProfile {
    #[serde(default)]
    pub vibe_id: VibeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibe_target: Option<IntentVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibe_importance: Option<IntentVector>,
    #[serde(default)]
    pub travel_mode: TravelMode,
    #[serde(default)]
    pub mode: IdeaDateMode,
    #[serde(default)]
    pub pref_tilt: PrefTilt,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_resolver_telemetry: Option<serde_json::Value>,
}

impl Default for PlanProfile {
    fn default() -> Self {
        Self {
            vibe_id: VibeId::default(),
            vibe_target: None,
            vibe_importance: None,
            travel_mode: TravelMode::Walk,
            mode: IdeaDateMode::Default,
            pref_tilt: PrefTilt::NEUTRAL,
            seed_resolver_telemetry: None,
        }
    }
}

/// Plan metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanMeta {
    #[serde(default)]
    pub idea_date: PlanProfile,
}

/// An ordered, non-empty sequence of stops plus plan-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub meta: PlanMeta,
}

/// Errors raised when plan schema invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("plan has no stops")]
    EmptyPlan,
    #[error("duplicate stop id: {id}")]
    DuplicateStopId { id: String },
}

impl Plan {
    /// Number of stops.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Position of a stop by id.
    #[must_use]
    pub fn index_of(&self, stop_id: &str) -> Option<usize> {
        self.stops.iter().position(|stop| stop.id == stop_id)
    }

    /// Validate structural invariants: non-empty, unique stop ids.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` when the plan is empty or carries a duplicated
    /// stop id.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.stops.is_empty() {
            return Err(SchemaError::EmptyPlan);
        }
        let mut seen = std::collections::HashSet::with_capacity(self.stops.len());
        for stop in &self.stops {
            if !seen.insert(stop.id.as_str()) {
                return Err(SchemaError::DuplicateStopId {
                    id: stop.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Clamp every recoverable stop and meta field to documented bounds.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut plan = self.clone();
        for stop in &mut plan.stops {
            stop.idea_date = stop.idea_date.sanitized();
        }
        plan.meta.idea_date.pref_tilt = plan.meta.idea_date.pref_tilt.sanitized();
        if let Some(target) = plan.meta.idea_date.vibe_target {
            plan.meta.idea_date.vibe_target = Some(target.clamped());
        }
        if let Some(importance) = plan.meta.idea_date.vibe_importance {
            plan.meta.idea_date.vibe_importance = Some(importance.clamped());
        }
        plan
    }

    /// Re-stamp every stop role to the role implied by its index.
    pub fn normalize_roles(&mut self) {
        let count = self.stops.len();
        for (index, stop) in self.stops.iter_mut().enumerate() {
            stop.idea_date.role = StopRole::implied_for_index(index, count);
        }
    }

    /// Energy series in stop order, clamped to the unit interval.
    #[must_use]
    pub fn energy_series(&self) -> Vec<f64> {
        self.stops
            .iter()
            .map(|stop| clamp01(stop.idea_date.energy_level))
            .collect()
    }
}

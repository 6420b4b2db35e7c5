//! Pref-tilt and mode composition: resolving the effective tilt for a plan
//! and deriving the arc-contribution weight map from it.
//!
//! Tilt never touches baseline scoring. It only re-weights arc contribution
//! on the ranking path and steers suggestion narratives.

use serde::{Deserialize, Serialize};

use crate::constants::{
    TILT_FATIGUE_RANGE, TILT_FATIGUE_STEP, TILT_FRICTION_RANGE, TILT_FRICTION_STEP,
    TILT_PEAK_RANGE, TILT_PEAK_STEP, TILT_SMOOTHNESS_RANGE, TILT_SMOOTHNESS_STEP,
};
use crate::plan::{IdeaDateMode, PlanProfile, PrefTilt};

/// Where the effective tilt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiltSource {
    Plan,
    Mode,
}

/// Resolved tilt snapshot carried into telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TiltProfile {
    pub mode: IdeaDateMode,
    pub label: &'static str,
    pub tilt: PrefTilt,
    pub source: TiltSource,
}

// `label` is always `mode_label(mode)` (see `resolve_tilt`), and `&'static
// str` cannot be produced generically by the derived `Deserialize` (its
// value would have to borrow from the deserializer input with a lifetime
// tied to the call, not `'static`). Deserialize the other fields and
// recompute `label` from `mode` instead of round-tripping it.
impl<'de> Deserialize<'de> for TiltProfile {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct TiltProfileShadow {
            mode: IdeaDateMode,
            tilt: PrefTilt,
            source: TiltSource,
        }

        let TiltProfileShadow { mode, tilt, source } = TiltProfileShadow::deserialize(deserializer)?;
        Ok(TiltProfile {
            mode,
            label: mode_label(mode),
            tilt,
            source,
        })
    }
}

/// Human label for a mode preset.
#[must_use]
pub const fn mode_label(mode: IdeaDateMode) -> &'static str {
    match mode {
        IdeaDateMode::Default => "Balanced evening",
        IdeaDateMode::TouristDay => "Tourist day",
        IdeaDateMode::Family => "Family outing",
        IdeaDateMode::AnniversaryIntimate => "Anniversary evening",
        IdeaDateMode::FirstDateLowPressure => "Low-pressure first date",
    }
}

/// Default tilt carried by a mode preset.
#[must_use]
pub const fn mode_default_tilt(mode: IdeaDateMode) -> PrefTilt {
    match mode {
        IdeaDateMode::Default => PrefTilt::NEUTRAL,
        IdeaDateMode::TouristDay => PrefTilt {
            vibe: 0,
            walking: 1,
            peak: -1,
        },
        IdeaDateMode::Family => PrefTilt {
            vibe: 0,
            walking: -1,
            peak: -1,
        },
        IdeaDateMode::AnniversaryIntimate => PrefTilt {
            vibe: 1,
            walking: -1,
            peak: 1,
        },
        IdeaDateMode::FirstDateLowPressure => PrefTilt {
            vibe: 1,
            walking: 0,
            peak: 0,
        },
    }
}

/// Resolve the effective tilt for a plan profile with optional caller
/// overrides. A neutral plan tilt defers to the mode default; a non-neutral
/// plan tilt wins outright.
#[must_use]
pub fn resolve_tilt(
    profile: &PlanProfile,
    tilt_override: Option<PrefTilt>,
    mode_override: Option<IdeaDateMode>,
) -> TiltProfile {
    let mode = mode_override.unwrap_or(profile.mode);
    let requested = tilt_override.unwrap_or(profile.pref_tilt).sanitized();
    if requested.is_neutral() {
        TiltProfile {
            mode,
            label: mode_label(mode),
            tilt: mode_default_tilt(mode),
            source: TiltSource::Mode,
        }
    } else {
        TiltProfile {
            mode,
            label: mode_label(mode),
            tilt: requested,
            source: TiltSource::Plan,
        }
    }
}

/// Factor weights applied to arc contribution on the ranking path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightMap {
    pub transition_smoothness: f64,
    pub peak_alignment: f64,
    pub taper_integrity: f64,
    pub fatigue_impact: f64,
    pub friction_impact: f64,
    pub ideal_peak_shift: i8,
}

impl WeightMap {
    /// Baseline weights used for the tilt-invariant `Computed` output.
    pub const NEUTRAL: Self = Self {
        transition_smoothness: 1.0,
        peak_alignment: 1.0,
        taper_integrity: 1.0,
        fatigue_impact: 1.0,
        friction_impact: 1.0,
        ideal_peak_shift: 0,
    };
}

impl Default for WeightMap {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Derive the ranking weight map from an effective tilt.
#[must_use]
pub fn weight_map_for(tilt: PrefTilt) -> WeightMap {
    let vibe = f64::from(tilt.vibe);
    let walking = f64::from(tilt.walking);
    WeightMap {
        transition_smoothness: (1.0 - TILT_SMOOTHNESS_STEP * walking)
            .clamp(TILT_SMOOTHNESS_RANGE.0, TILT_SMOOTHNESS_RANGE.1),
        peak_alignment: (1.0 + TILT_PEAK_STEP * vibe).clamp(TILT_PEAK_RANGE.0, TILT_PEAK_RANGE.1),
        taper_integrity: 1.0,
        fatigue_impact: (1.0 + TILT_FATIGUE_STEP * walking)
            .clamp(TILT_FATIGUE_RANGE.0, TILT_FATIGUE_RANGE.1),
        friction_impact: (1.0 - TILT_FRICTION_STEP * walking)
            .clamp(TILT_FRICTION_RANGE.0, TILT_FRICTION_RANGE.1),
        ideal_peak_shift: tilt.peak,
    }
}

//! Vibe preset catalog supplying default intent targets and importances.

use std::sync::OnceLock;

use crate::plan::{IntentVector, PlanProfile, VibeId};

/// A named vibe preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VibeProfile {
    pub id: VibeId,
    pub label: &'static str,
    pub target: IntentVector,
    pub importance: IntentVector,
}

fn catalog() -> &'static [VibeProfile] {
    static CATALOG: OnceLock<Vec<VibeProfile>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        vec![
            VibeProfile {
                id: VibeId::FirstDateLowPressure,
                label: "Low-pressure first date",
                target: IntentVector {
                    intimacy: 0.45,
                    energy: 0.5,
                    novelty: 0.6,
                    discovery: 0.55,
                    pretense: 0.2,
                    pressure: 0.1,
                },
                importance: IntentVector {
                    intimacy: 0.6,
                    energy: 0.5,
                    novelty: 0.7,
                    discovery: 0.6,
                    pretense: 0.8,
                    pressure: 1.0,
                },
            },
            VibeProfile {
                id: VibeId::AnniversaryIntimate,
                label: "Intimate anniversary",
                target: IntentVector {
                    intimacy: 0.9,
                    energy: 0.4,
                    novelty: 0.35,
                    discovery: 0.3,
                    pretense: 0.5,
                    pressure: 0.2,
                },
                importance: IntentVector {
                    intimacy: 1.0,
                    energy: 0.5,
                    novelty: 0.4,
                    discovery: 0.4,
                    pretense: 0.5,
                    pressure: 0.7,
                },
            },
        ]
    })
}

/// Fixed catalog entry for a vibe id.
#[must_use]
pub fn vibe_profile(id: VibeId) -> &'static VibeProfile {
    let catalog = catalog();
    catalog
        .iter()
        .find(|profile| profile.id == id)
        .unwrap_or(&catalog[0])
}

/// The target vector a plan scores against: explicit meta override when set,
/// otherwise the vibe preset.
#[must_use]
pub fn effective_target(profile: &PlanProfile) -> IntentVector {
    profile
        .vibe_target
        .map_or_else(|| vibe_profile(profile.vibe_id).target, |v| v.clamped())
}

/// The importance vector a plan weighs alignment with.
#[must_use]
pub fn effective_importance(profile: &PlanProfile) -> IntentVector {
    profile
        .vibe_importance
        .map_or_else(|| vibe_profile(profile.vibe_id).importance, |v| v.clamped())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanProfile;

    #[test]
    fn catalog_covers_every_vibe() {
        let first = vibe_profile(VibeId::FirstDateLowPressure);
        assert_eq!(first.label, "Low-pressure first date");
        assert!(first.target.pressure < 0.2);

        let anniversary = vibe_profile(VibeId::AnniversaryIntimate);
        assert!(anniversary.target.intimacy > first.target.intimacy);
    }

    #[test]
    fn lookups_share_the_static_catalog() {
        let a = vibe_profile(VibeId::FirstDateLowPressure);
        let b = vibe_profile(VibeId::FirstDateLowPressure);
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn meta_overrides_take_precedence() {
        let mut profile = PlanProfile::default();
        assert_eq!(
            effective_target(&profile),
            vibe_profile(profile.vibe_id).target
        );

        profile.vibe_target = Some(IntentVector::splat(2.0));
        assert_eq!(effective_target(&profile), IntentVector::splat(1.0));

        profile.vibe_importance = Some(IntentVector::splat(0.3));
        assert_eq!(effective_importance(&profile), IntentVector::splat(0.3));
    }
}

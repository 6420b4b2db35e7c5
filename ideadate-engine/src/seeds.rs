//! Built-in seed plans for QA harnesses and tests.
//!
//! Each seed is a fully populated plan with stable ids, so repeated runs
//! and downstream snapshots are comparable.

use crate::plan::{
    IdeaDateProfile, IntentVector, LatLng, PlaceLite, PlaceRef, Plan, PlanMeta, Stop, StopRole,
    VibeId,
};
use crate::vibes::vibe_profile;

fn seed_stop(
    id: &str,
    name: &str,
    place_type: &str,
    lat: f64,
    lng: f64,
    energy: f64,
    intent: IntentVector,
) -> Stop {
    Stop {
        id: id.to_string(),
        name: name.to_string(),
        place_ref: Some(PlaceRef {
            provider: "seed".to_string(),
            place_id: format!("seed-{id}"),
            lat_lng: Some(LatLng { lat, lng }),
            ..PlaceRef::default()
        }),
        place_lite: Some(PlaceLite {
            place_id: format!("seed-{id}"),
            name: name.to_string(),
            types: vec![place_type.to_string()],
            ..PlaceLite::default()
        }),
        idea_date: IdeaDateProfile {
            energy_level: energy,
            intent_vector: intent,
            ..IdeaDateProfile::default()
        },
    }
}

/// Coherent six-stop walking evening: aligned intent, centered peak, short
/// transfers, one venue per family.
#[must_use]
pub fn clean_seed() -> Plan {
    let target = vibe_profile(VibeId::FirstDateLowPressure).target;
    let mut plan = Plan {
        id: "seed-clean".to_string(),
        name: "Riverside evening".to_string(),
        stops: vec![
            seed_stop("gallery", "Petit Musee", "museum", 48.8500, 2.3500, 0.45, target),
            seed_stop("cafe", "Cafe Margaux", "cafe", 48.8518, 2.3502, 0.45, target),
            seed_stop("park", "Jardin Clos", "park", 48.8536, 2.3504, 0.65, target),
            seed_stop("bar", "Bar Lumiere", "bar", 48.8554, 2.3506, 0.9, target),
            seed_stop("lanes", "Vieux Bowling", "bowling_alley", 48.8572, 2.3508, 0.6, target),
            seed_stop("gelato", "Glace Minuit", "gelato_shop", 48.8590, 2.3510, 0.6, target),
        ],
        meta: PlanMeta::default(),
    };
    plan.normalize_roles();
    plan
}

/// Six stops with reversed boundary roles, two half-hour transfers, a
/// doubled nightlife family, and an arc that spikes at both ends.
#[must_use]
pub fn messy_seed() -> Plan {
    let target = vibe_profile(VibeId::FirstDateLowPressure).target;
    let mut plan = Plan {
        id: "seed-messy".to_string(),
        name: "Zigzag night".to_string(),
        stops: vec![
            seed_stop("club", "Club Vertige", "night_club", 48.8500, 2.3500, 0.9, target),
            seed_stop("diner", "Diner Royal", "restaurant", 48.8518, 2.3502, 0.3, target),
            seed_stop("annex", "Salle Annexe", "art_gallery", 48.8745, 2.3504, 0.5, target),
            seed_stop("garden", "Square Nord", "garden", 48.8763, 2.3506, 0.4, target),
            seed_stop("taverne", "Taverne Basse", "pub", 48.8536, 2.3508, 0.6, target),
            seed_stop("rooftop", "Toit Ouvert", "bar", 48.8554, 2.3510, 0.9, target),
        ],
        meta: PlanMeta::default(),
    };
    plan.normalize_roles();
    // Boundary roles deliberately reversed.
    plan.stops[0].idea_date.role = StopRole::WindDown;
    plan.stops[5].idea_date.role = StopRole::Start;
    plan
}

/// Crowded single-family lineup used by diversity checks.
#[must_use]
pub fn crowded_seed() -> Plan {
    let target = vibe_profile(VibeId::AnniversaryIntimate).target;
    let mut plan = Plan {
        id: "seed-crowded".to_string(),
        name: "Bar crawl".to_string(),
        stops: vec![
            seed_stop("first", "Premier Bar", "bar", 48.8500, 2.3500, 0.5, target),
            seed_stop("second", "Deuxieme Bar", "wine_bar", 48.8518, 2.3502, 0.7, target),
            seed_stop("third", "Troisieme Bar", "cocktail_bar", 48.8536, 2.3504, 0.9, target),
            seed_stop("fourth", "Quatrieme Bar", "pub", 48.8554, 2.3506, 0.6, target),
        ],
        meta: PlanMeta::default(),
    };
    plan.normalize_roles();
    plan
}

/// Three stops sharing one location: degenerate travel.
#[must_use]
pub fn compact_seed() -> Plan {
    let target = vibe_profile(VibeId::FirstDateLowPressure).target;
    let mut plan = Plan {
        id: "seed-compact".to_string(),
        name: "One corner".to_string(),
        stops: vec![
            seed_stop("lobby", "Le Lobby", "cafe", 48.8500, 2.3500, 0.4, target),
            seed_stop("stage", "La Scene", "theater", 48.8500, 2.3500, 0.8, target),
            seed_stop("snug", "Le Snug", "wine_bar", 48.8500, 2.3500, 0.5, target),
        ],
        meta: PlanMeta::default(),
    };
    plan.normalize_roles();
    plan
}

/// Every built-in seed by name, in presentation order.
#[must_use]
pub fn all_seeds() -> Vec<(&'static str, Plan)> {
    vec![
        ("clean", clean_seed()),
        ("messy", messy_seed()),
        ("crowded", crowded_seed()),
        ("compact", compact_seed()),
    ]
}

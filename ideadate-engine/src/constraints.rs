//! Hard and soft constraint evaluation plus the venue family classifier.

use serde::{Deserialize, Serialize};

use crate::arc::ArcModel;
use crate::constants::CONSTRAINT_MAX_TRAVEL_EDGE_MIN;
use crate::plan::{Plan, Stop, StopRole};
use crate::travel::TravelSummary;

/// Venue family used by variety constraints and ranking diversity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Culture,
    Dessert,
    Food,
    Nightlife,
    Outdoors,
    Other,
}

impl Family {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Culture => "culture",
            Self::Dessert => "dessert",
            Self::Food => "food",
            Self::Nightlife => "nightlife",
            Self::Outdoors => "outdoors",
            Self::Other => "other",
        }
    }
}

const FOOD_TYPES: &[&str] = &[
    "restaurant",
    "cafe",
    "coffee_shop",
    "meal_takeaway",
    "meal_delivery",
    "brunch_restaurant",
    "food",
];
const DESSERT_TYPES: &[&str] = &[
    "bakery",
    "dessert_shop",
    "dessert_restaurant",
    "ice_cream_shop",
    "chocolate_shop",
    "gelato_shop",
];
const NIGHTLIFE_TYPES: &[&str] = &[
    "bar",
    "pub",
    "night_club",
    "wine_bar",
    "cocktail_bar",
    "karaoke",
    "speakeasy",
];
const CULTURE_TYPES: &[&str] = &[
    "museum",
    "art_gallery",
    "movie_theater",
    "performing_arts_theater",
    "theater",
    "library",
    "aquarium",
    "planetarium",
];
const OUTDOORS_TYPES: &[&str] = &[
    "park",
    "garden",
    "botanical_garden",
    "beach",
    "hiking_area",
    "zoo",
    "scenic_point",
    "promenade",
];

/// Classify a raw type string against the fixed family tables.
#[must_use]
pub fn family_for_type(raw: &str) -> Family {
    let lowered = raw.to_ascii_lowercase();
    let token = lowered.as_str();
    // Dessert before food so bakeries do not collapse into the food family.
    if DESSERT_TYPES.contains(&token) {
        Family::Dessert
    } else if FOOD_TYPES.contains(&token) {
        Family::Food
    } else if NIGHTLIFE_TYPES.contains(&token) {
        Family::Nightlife
    } else if CULTURE_TYPES.contains(&token) {
        Family::Culture
    } else if OUTDOORS_TYPES.contains(&token) {
        Family::Outdoors
    } else {
        Family::Other
    }
}

fn family_from_name(name: &str) -> Family {
    let lowered = name.to_ascii_lowercase();
    const DESSERT_TERMS: &[&str] = &["gelato", "dessert", "bakery", "creamery"];
    const CULTURE_TERMS: &[&str] = &["museum", "gallery"];
    const OUTDOORS_TERMS: &[&str] = &["park", "garden", "trail"];
    const NIGHTLIFE_TERMS: &[&str] = &["bar", "club", "lounge", "pub"];
    const FOOD_TERMS: &[&str] = &["cafe", "restaurant", "kitchen", "bistro"];
    if DESSERT_TERMS.iter().any(|term| lowered.contains(term)) {
        Family::Dessert
    } else if CULTURE_TERMS.iter().any(|term| lowered.contains(term)) {
        Family::Culture
    } else if OUTDOORS_TERMS.iter().any(|term| lowered.contains(term)) {
        Family::Outdoors
    } else if NIGHTLIFE_TERMS.iter().any(|term| lowered.contains(term)) {
        Family::Nightlife
    } else if FOOD_TERMS.iter().any(|term| lowered.contains(term)) {
        Family::Food
    } else {
        Family::Other
    }
}

/// Classify a stop: types first, then the bounded name fallback.
#[must_use]
pub fn family_for_stop(stop: &Stop) -> Family {
    if let Some(lite) = &stop.place_lite {
        for raw in &lite.types {
            let family = family_for_type(raw);
            if family != Family::Other {
                return family;
            }
        }
    }
    if let Some(source) = &stop.idea_date.source_google_type {
        let family = family_for_type(source);
        if family != Family::Other {
            return family;
        }
    }
    family_from_name(&stop.name)
}

/// Constraint severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSeverity {
    Hard,
    Soft,
}

/// Constraint kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    MaxTravelEdge,
    RoleOrder,
    DuplicateFamily,
    LateSpike,
}

/// One evaluated constraint violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    pub severity: ConstraintSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Evaluate every constraint in canonical order: travel edges, role order,
/// duplicate family, late spike.
#[must_use]
pub fn evaluate_constraints(
    plan: &Plan,
    travel: &TravelSummary,
    arc: &ArcModel,
) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();

    for (index, edge) in travel.edges.iter().enumerate() {
        if edge.minutes > CONSTRAINT_MAX_TRAVEL_EDGE_MIN {
            let from = plan.stops.get(index);
            let to = plan.stops.get(index + 1);
            violations.push(ConstraintViolation {
                kind: ConstraintKind::MaxTravelEdge,
                severity: ConstraintSeverity::Hard,
                message: format!(
                    "transfer of {} min exceeds the {} min ceiling",
                    edge.minutes, CONSTRAINT_MAX_TRAVEL_EDGE_MIN
                ),
                stop_ids: [from, to]
                    .into_iter()
                    .flatten()
                    .map(|stop| stop.id.clone())
                    .collect(),
                edge: Some(index),
                meta: None,
            });
        }
    }

    let count = plan.stops.len();
    for (index, stop) in plan.stops.iter().enumerate() {
        let implied = StopRole::implied_for_index(index, count);
        if stop.idea_date.role != implied {
            violations.push(ConstraintViolation {
                kind: ConstraintKind::RoleOrder,
                severity: ConstraintSeverity::Hard,
                message: format!("stop '{}' plays the wrong role for its slot", stop.name),
                stop_ids: vec![stop.id.clone()],
                edge: None,
                meta: None,
            });
        }
    }

    if let Some((family, members)) = dominant_duplicate_family(plan) {
        violations.push(ConstraintViolation {
            kind: ConstraintKind::DuplicateFamily,
            severity: ConstraintSeverity::Soft,
            message: format!("several stops share the {} family", family.as_str()),
            stop_ids: members,
            edge: None,
            meta: Some(serde_json::json!({ "family": family.as_str() })),
        });
    }

    if arc.no_taper {
        violations.push(ConstraintViolation {
            kind: ConstraintKind::LateSpike,
            severity: ConstraintSeverity::Soft,
            message: "the journey ends on an energy spike".to_string(),
            stop_ids: plan.stops.last().map(|stop| stop.id.clone()).into_iter().collect(),
            edge: None,
            meta: None,
        });
    }

    violations
}

/// Largest duplicated family (count >= 2, never `other`), ties broken by
/// lexicographic family name.
#[must_use]
pub fn dominant_duplicate_family(plan: &Plan) -> Option<(Family, Vec<String>)> {
    let mut counts: std::collections::BTreeMap<Family, Vec<String>> =
        std::collections::BTreeMap::new();
    for stop in &plan.stops {
        let family = family_for_stop(stop);
        if family != Family::Other {
            counts.entry(family).or_default().push(stop.id.clone());
        }
    }
    counts
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .max_by(|a, b| a.1.len().cmp(&b.1.len()).then(b.0.cmp(&a.0)))
}

/// Count of hard violations.
#[must_use]
pub fn hard_count(violations: &[ConstraintViolation]) -> usize {
    violations
        .iter()
        .filter(|violation| violation.severity == ConstraintSeverity::Hard)
        .count()
}

/// Count of soft violations.
#[must_use]
pub fn soft_count(violations: &[ConstraintViolation]) -> usize {
    violations
        .iter()
        .filter(|violation| violation.severity == ConstraintSeverity::Soft)
        .count()
}

const NARRATIVE_ORDER: &[(ConstraintKind, &str)] = &[
    (ConstraintKind::MaxTravelEdge, "long transfer risk"),
    (ConstraintKind::RoleOrder, "stop role order risk"),
    (ConstraintKind::DuplicateFamily, "stop variety risk"),
    (ConstraintKind::LateSpike, "late spike risk"),
];

/// Deduplicated narrative labels in canonical order.
#[must_use]
pub fn constraint_narratives(violations: &[ConstraintViolation]) -> Vec<String> {
    NARRATIVE_ORDER
        .iter()
        .filter(|(kind, _)| violations.iter().any(|violation| violation.kind == *kind))
        .map(|(_, label)| (*label).to_string())
        .collect()
}

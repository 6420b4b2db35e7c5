//! Centralized balance and tuning constants for the Idea-Date journey engine.
//!
//! These values define the deterministic math for scoring, constraints, and
//! refinement. Keeping them together ensures journey behavior can only be
//! adjusted via code changes reviewed in version control.

// Composite score blend -----------------------------------------------------
pub(crate) const SCORE_WEIGHT_INTENT: f64 = 0.58;
pub(crate) const SCORE_WEIGHT_FATIGUE: f64 = 0.22;
pub(crate) const SCORE_WEIGHT_FRICTION: f64 = 0.20;

// Intent scoring ------------------------------------------------------------
pub(crate) const INTENT_IMPORTANCE_FLOOR: f64 = 0.01;

// Fatigue penalty -----------------------------------------------------------
pub(crate) const FATIGUE_WEIGHT_PEAK_DEVIATION: f64 = 0.5;
pub(crate) const FATIGUE_WEIGHT_DOUBLE_PEAK: f64 = 0.3;
pub(crate) const FATIGUE_WEIGHT_NO_TAPER: f64 = 0.2;

// Friction penalty ----------------------------------------------------------
pub(crate) const FRICTION_EDGE_FREE_MIN: f64 = 12.0;
pub(crate) const FRICTION_EDGE_MID_MIN: f64 = 18.0;
pub(crate) const FRICTION_EDGE_MAX_MIN: f64 = 30.0;
pub(crate) const FRICTION_TRAVEL_SHARE_FLOOR: f64 = 0.35;
pub(crate) const FRICTION_TRAVEL_SHARE_SPAN: f64 = 0.3;
pub(crate) const FRICTION_BACKTRACK_STEP: f64 = 0.4;
pub(crate) const FRICTION_WEIGHT_EDGE: f64 = 0.55;
pub(crate) const FRICTION_WEIGHT_TRAVEL_SHARE: f64 = 0.3;
pub(crate) const FRICTION_WEIGHT_BACKTRACK: f64 = 0.15;

// Travel estimation ---------------------------------------------------------
pub(crate) const TRAVEL_WALK_SPEED_MPS: f64 = 1.4;
pub(crate) const TRAVEL_DRIVE_SPEED_MPS: f64 = 9.0;
pub(crate) const TRAVEL_SAME_PLACE_METERS: f64 = 120.0;
pub(crate) const TRAVEL_FALLBACK_METERS: f64 = 1800.0;
pub(crate) const TRAVEL_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
pub(crate) const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

// Arc model -----------------------------------------------------------------
pub(crate) const ARC_Y_BASE: f64 = 0.2;
pub(crate) const ARC_Y_SPAN: f64 = 0.6;
pub(crate) const ARC_FLAT_SPREAD: f64 = 0.15;

// Arc contribution blend ----------------------------------------------------
pub(crate) const ARC_POSITIVE_SMOOTHNESS: f64 = 0.4;
pub(crate) const ARC_POSITIVE_PEAK: f64 = 0.35;
pub(crate) const ARC_POSITIVE_TAPER: f64 = 0.25;
pub(crate) const ARC_PENALTY_FATIGUE: f64 = 0.55;
pub(crate) const ARC_PENALTY_FRICTION: f64 = 0.45;
pub(crate) const ARC_TAPER_DECAY: f64 = 0.6;

// Constraint thresholds -----------------------------------------------------
pub(crate) const CONSTRAINT_MAX_TRAVEL_EDGE_MIN: u32 = 25;

// Violation thresholds ------------------------------------------------------
pub(crate) const VIOLATION_LONG_TRANSFER_WARN_MIN: u32 = 20;
pub(crate) const VIOLATION_LONG_TRANSFER_CRITICAL_MIN: u32 = 30;
pub(crate) const VIOLATION_RUSHED_TRAVEL_SHARE: f64 = 0.5;

// Refinement ----------------------------------------------------------------
pub(crate) const SCORE_EPSILON: f64 = 0.005;
pub(crate) const REORDER_MIN_DELTA: f64 = 0.08;
pub(crate) const REORDER_REASON_COMPONENT_MIN: f64 = 0.05;
pub(crate) const REORDER_CANDIDATE_CAP: usize = 80;
pub(crate) const REPLACE_ARC_MIN_DELTA: f64 = 0.01;
pub(crate) const REPLACE_PRIMARY_SCORE_FLOOR: f64 = -0.01;
pub(crate) const REPLACE_REPAIR_DROP_SINGLE: f64 = -0.03;
pub(crate) const REPLACE_REPAIR_DROP_MULTI: f64 = -0.05;
pub(crate) const REPLACE_PRIMARY_SEEN_CAP: usize = 60;
pub(crate) const REPLACE_REPAIR_SEEN_CAP: usize = 90;
pub(crate) const REORDER_REPAIR_EVAL_CAP: usize = 12;
pub(crate) const REPLACE_KEPT_CAP: usize = 2;
pub(crate) const SUGGESTION_PACK_CAP: usize = 3;
pub(crate) const RESOLVER_LIMIT: usize = 8;
pub(crate) const RESOLVER_MIN_USEFUL: usize = 3;
pub(crate) const CANDIDATE_POOL_CAP: usize = 16;
pub(crate) const SEARCH_RADII_KM: [f64; 3] = [0.5, 1.0, 2.0];

// Ranking -------------------------------------------------------------------
pub(crate) const DIVERSITY_WEIGHT_CAP: f64 = 0.01;
pub(crate) const NEAR_EQUAL_ARC_DELTA: f64 = 0.015;

// Tilt weight map -----------------------------------------------------------
pub(crate) const TILT_SMOOTHNESS_STEP: f64 = 0.08;
pub(crate) const TILT_PEAK_STEP: f64 = 0.16;
pub(crate) const TILT_FATIGUE_STEP: f64 = 0.10;
pub(crate) const TILT_FRICTION_STEP: f64 = 0.16;
pub(crate) const TILT_SMOOTHNESS_RANGE: (f64, f64) = (0.9, 1.16);
pub(crate) const TILT_PEAK_RANGE: (f64, f64) = (0.84, 1.16);
pub(crate) const TILT_FATIGUE_RANGE: (f64, f64) = (0.9, 1.1);
pub(crate) const TILT_FRICTION_RANGE: (f64, f64) = (0.84, 1.16);

// Narrative -----------------------------------------------------------------
pub(crate) const NARRATIVE_STRUCTURAL_CHAR_CAP: usize = 160;
pub(crate) const NARRATIVE_LINE_CAP: usize = 2;

// Schema bounds -------------------------------------------------------------
pub(crate) const STOP_DURATION_MIN: u32 = 20;
pub(crate) const STOP_DURATION_MAX: u32 = 240;

//! Suggestion value types shared by the refinement searches, ranking, and
//! the pack builder.

use serde::{Deserialize, Serialize};

use crate::patch::{NewPlace, PatchOp};

/// What a suggestion does to the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestionKind {
    Reorder,
    Replacement,
}

/// Why the suggestion was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    ReduceFriction,
    ArcSmoothing,
    IntentAlignment,
    ImproveArc,
    RepairConstraint,
    ReorderRepair,
}

/// Journey-score impact of applying the suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Impact {
    pub before: f64,
    pub after: f64,
    pub delta: f64,
    pub before100: u8,
    pub after100: u8,
}

/// Hard/soft constraint movement of applying the suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintDelta {
    /// Positive when hard violations are removed.
    pub hard: i64,
    /// Positive when soft violations are removed.
    pub soft: i64,
}

/// Narrative and diagnostic attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structural_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_delta: Option<ConstraintDelta>,
}

/// A typed patch the user can preview and apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub kind: SuggestionKind,
    pub reason_code: ReasonCode,
    pub patch_ops: Vec<PatchOp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_place: Option<NewPlace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SuggestionMeta>,
    pub impact: Impact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc_impact: Option<f64>,
    pub preview: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_stop_id: Option<String>,
}

impl Suggestion {
    /// Arc-contribution delta used by ranking; zero when absent.
    #[must_use]
    pub fn arc_delta(&self) -> f64 {
        self.arc_impact.unwrap_or(0.0)
    }
}

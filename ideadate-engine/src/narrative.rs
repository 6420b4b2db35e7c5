//! Narrative composer: structural, constraint, and tilt clauses translated
//! into at most two human lines per suggestion, with a guard that strips
//! numeric leakage.
//!
//! Each stream picks the first matching entry of a fixed clause table, so
//! the output wording is deterministic and auditable in one place.

use std::sync::OnceLock;

use crate::constants::{NARRATIVE_LINE_CAP, NARRATIVE_STRUCTURAL_CHAR_CAP};
use crate::plan::PrefTilt;
use crate::suggestion::ConstraintDelta;

/// Everything the composer needs to know about a suggestion's effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrativeContext {
    pub hard_fixed: bool,
    pub soft_fixed: bool,
    pub peak_moved_later: bool,
    pub peak_moved_earlier: bool,
    pub taper_improved: bool,
    pub build_improved: bool,
    pub friction_reduced: bool,
    pub intent_improved: bool,
    pub tilt: PrefTilt,
}

struct Clause {
    applies: fn(&NarrativeContext) -> bool,
    text: &'static str,
}

fn first_matching(table: &[Clause], ctx: &NarrativeContext) -> Option<&'static str> {
    table
        .iter()
        .find(|clause| (clause.applies)(ctx))
        .map(|clause| clause.text)
}

fn primary_clauses() -> &'static [Clause] {
    static TABLE: OnceLock<Vec<Clause>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            Clause {
                applies: |ctx| ctx.hard_fixed,
                text: "Clears a hard constraint blocking the route",
            },
            Clause {
                applies: |ctx| ctx.peak_moved_later,
                text: "Shifts the arc toward a later peak",
            },
            Clause {
                applies: |ctx| ctx.peak_moved_earlier,
                text: "Shifts the arc toward an earlier peak",
            },
            Clause {
                applies: |ctx| ctx.taper_improved,
                text: "Restores a calm wind-down at the end",
            },
            Clause {
                applies: |ctx| ctx.build_improved,
                text: "Builds the energy arc more steadily",
            },
            Clause {
                applies: |_| true,
                text: "Smooths the flow of the evening",
            },
        ]
    })
}

fn supporting_clauses() -> &'static [Clause] {
    static TABLE: OnceLock<Vec<Clause>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            Clause {
                applies: |ctx| ctx.friction_reduced,
                text: "shorter transfers between stops",
            },
            Clause {
                applies: |ctx| ctx.soft_fixed,
                text: "fewer pacing risks along the way",
            },
            Clause {
                applies: |ctx| !ctx.tilt.is_neutral(),
                text: "matched to the direction you set",
            },
        ]
    })
}

fn tilt_clauses() -> &'static [Clause] {
    static TABLE: OnceLock<Vec<Clause>> = OnceLock::new();
    TABLE.get_or_init(|| {
        vec![
            Clause {
                applies: |ctx| ctx.tilt.walking < 0 && ctx.friction_reduced,
                text: "Keeps transfers short for a low-walking evening.",
            },
            Clause {
                applies: |ctx| ctx.tilt.walking > 0 && ctx.friction_reduced,
                text: "Lets the route wander a little further on foot.",
            },
            Clause {
                applies: |ctx| {
                    ctx.tilt.peak > 0 && (ctx.peak_moved_later || ctx.peak_moved_earlier)
                },
                text: "Leans into a later peak, as directed.",
            },
            Clause {
                applies: |ctx| {
                    ctx.tilt.peak < 0 && (ctx.peak_moved_later || ctx.peak_moved_earlier)
                },
                text: "Pulls the peak earlier, as directed.",
            },
            Clause {
                applies: |ctx| ctx.tilt.vibe != 0 && ctx.intent_improved,
                text: "Leans the lineup toward the plan's vibe.",
            },
        ]
    })
}

/// Structural clause: primary effect plus one supporting detail.
#[must_use]
pub fn structural_note(ctx: &NarrativeContext) -> String {
    let primary =
        first_matching(primary_clauses(), ctx).unwrap_or("Smooths the flow of the evening");
    let note = match first_matching(supporting_clauses(), ctx) {
        Some(detail) => format!("{primary}, with {detail}."),
        None => format!("{primary}."),
    };
    if note.len() > NARRATIVE_STRUCTURAL_CHAR_CAP {
        let mut cut = NARRATIVE_STRUCTURAL_CHAR_CAP;
        while cut > 0 && !note.is_char_boundary(cut) {
            cut -= 1;
        }
        note[..cut].to_string()
    } else {
        note
    }
}

/// Constraint clause, emitted only when constraints actually moved.
#[must_use]
pub fn constraint_note(delta: ConstraintDelta) -> Option<String> {
    struct ConstraintClause {
        applies: fn(ConstraintDelta) -> bool,
        text: &'static str,
    }
    static TABLE: OnceLock<Vec<ConstraintClause>> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        vec![
            ConstraintClause {
                applies: |delta| delta.hard > 0,
                text: "Fixes a hard constraint on the route.",
            },
            ConstraintClause {
                applies: |delta| delta.soft > 0,
                text: "Improves pacing constraints across the journey.",
            },
        ]
    });
    table
        .iter()
        .find(|clause| (clause.applies)(delta))
        .map(|clause| clause.text.to_string())
}

/// Director note for the active tilt, emitted only when the tilt visibly
/// shaped the outcome.
#[must_use]
pub fn tilt_note(ctx: &NarrativeContext) -> Option<String> {
    first_matching(tilt_clauses(), ctx).map(str::to_string)
}

/// Strip numeric and bracketed debug leakage from one line.
#[must_use]
pub fn guard_line(line: &str) -> String {
    let mut cleaned = String::with_capacity(line.len());
    let mut depth = 0usize;
    for ch in line.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            _ if ch.is_ascii_digit() => {}
            _ => cleaned.push(ch),
        }
    }
    let mut collapsed = String::with_capacity(cleaned.len());
    let mut last_space = false;
    for ch in cleaned.chars() {
        if ch == ' ' {
            if !last_space {
                collapsed.push(ch);
            }
            last_space = true;
        } else {
            collapsed.push(ch);
            last_space = false;
        }
    }
    collapsed.trim().to_string()
}

/// Translate the three streams into the final note lines.
///
/// The highest-priority clause leads (constraint over structural); a
/// non-redundant tilt clause may follow. Lines are guarded and capped.
#[must_use]
pub fn translate(
    structural: &str,
    constraint: Option<&str>,
    tilt: Option<&str>,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let lead = constraint.unwrap_or(structural);
    let lead = guard_line(lead);
    if !lead.is_empty() {
        lines.push(lead);
    }
    if let Some(tilt_line) = tilt {
        let guarded = guard_line(tilt_line);
        let redundant = lines.iter().any(|existing| {
            existing == &guarded
                || (existing.contains("later peak") && guarded.contains("later peak"))
        });
        if !guarded.is_empty() && !redundant {
            lines.push(guarded);
        }
    }
    lines.truncate(NARRATIVE_LINE_CAP);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_priority_prefers_hard_fixes() {
        let ctx = NarrativeContext {
            hard_fixed: true,
            peak_moved_later: true,
            friction_reduced: true,
            ..NarrativeContext::default()
        };
        let note = structural_note(&ctx);
        assert!(note.starts_with("Clears a hard constraint"));
        assert!(note.contains("shorter transfers"));
        assert!(note.len() <= 160);
    }

    #[test]
    fn primary_table_falls_through_in_order() {
        let quiet = NarrativeContext::default();
        assert!(structural_note(&quiet).starts_with("Smooths the flow"));

        let tapered = NarrativeContext {
            taper_improved: true,
            build_improved: true,
            ..NarrativeContext::default()
        };
        assert!(structural_note(&tapered).starts_with("Restores a calm wind-down"));
    }

    #[test]
    fn constraint_stream_tracks_deltas() {
        assert!(constraint_note(ConstraintDelta { hard: 1, soft: 0 })
            .unwrap()
            .starts_with("Fixes a hard constraint"));
        assert!(constraint_note(ConstraintDelta { hard: 0, soft: 2 })
            .unwrap()
            .starts_with("Improves pacing constraints"));
        assert!(constraint_note(ConstraintDelta::default()).is_none());
    }

    #[test]
    fn tilt_notes_require_influence() {
        let silent = NarrativeContext {
            tilt: PrefTilt {
                vibe: 0,
                walking: -1,
                peak: 0,
            },
            ..NarrativeContext::default()
        };
        assert!(tilt_note(&silent).is_none());

        let walking = NarrativeContext {
            friction_reduced: true,
            ..silent
        };
        assert_eq!(
            tilt_note(&walking).unwrap(),
            "Keeps transfers short for a low-walking evening."
        );
    }

    #[test]
    fn guard_strips_digits_and_brackets() {
        let guarded = guard_line("Saves 12 min [debug: delta=0.3] on the route.");
        assert!(!guarded.chars().any(|c| c.is_ascii_digit()));
        assert!(!guarded.contains('['));
        assert_eq!(guarded, "Saves min on the route.");
    }

    #[test]
    fn translate_caps_lines_and_avoids_redundancy() {
        let lines = translate(
            "Shifts the arc toward a later peak.",
            None,
            Some("Leans into a later peak, as directed."),
        );
        assert_eq!(lines.len(), 1, "later peak must appear once: {lines:?}");

        let lines = translate(
            "Builds the energy arc more steadily.",
            Some("Fixes a hard constraint on the route."),
            Some("Keeps transfers short for a low-walking evening."),
        );
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Fixes a hard constraint"));
        assert!(!lines.iter().any(|line| line.chars().any(|c| c.is_ascii_digit())));
    }
}

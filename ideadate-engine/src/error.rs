//! Engine error taxonomy.
//!
//! The engine recovers locally wherever possible; these errors only cross
//! the boundary when an input is structurally unusable or a patch would
//! break a plan invariant.

use thiserror::Error;

use crate::plan::SchemaError;

/// Errors surfaced by engine entry points.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A patch would violate a plan invariant; the patch is rejected whole.
    #[error("invariant violation: {detail}")]
    InvariantViolation { detail: String },

    /// The plan failed structural validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl EngineError {
    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            detail: detail.into(),
        }
    }
}

//! Core error types for representatives-core.
//!
//! Uses `thiserror` for structured, matchable variants covering the
//! failure modes of fingerprint computation and model parsing.

use thiserror::Error;

use crate::fingerprint::FieldKind;
use crate::kind::EntityKind;

/// Errors produced by the representatives-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A relation field in the hash recipe has no resolved fingerprint.
    #[error("missing dependency: {entity}.{field} does not reference a fingerprinted entity")]
    MissingDependency {
        entity: EntityKind,
        field: &'static str,
    },

    /// The entity could not produce a value for a declared recipe field.
    #[error("unknown recipe field: {entity}.{field}")]
    UnknownRecipeField {
        entity: EntityKind,
        field: &'static str,
    },

    /// A recipe field produced a value of the wrong kind.
    #[error("recipe field {entity}.{field} declared as {expected:?} produced another kind of value")]
    RecipeKindMismatch {
        entity: EntityKind,
        field: &'static str,
        expected: FieldKind,
    },

    /// A string is not a 40-character lowercase hex digest.
    #[error("invalid fingerprint: '{value}'")]
    InvalidFingerprint { value: String },

    /// An entity kind name or fixture model label was not recognized.
    #[error("unknown entity kind: '{name}'")]
    UnknownEntityKind { name: String },

    /// A gender code outside the known choices.
    #[error("unknown gender code: {code}")]
    UnknownGender { code: i64 },
}

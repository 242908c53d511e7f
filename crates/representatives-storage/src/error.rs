//! Storage error types for representatives-storage.
//!
//! [`StorageError`] covers every failure mode of the store: database and
//! migration failures, missing rows, fingerprint collisions, integrity
//! violations, and malformed fixtures. Fingerprint engine failures such as
//! a missing dependency arrive wrapped in [`StorageError::Core`].

use thiserror::Error;

use representatives_core::{CoreError, EntityKind, Fingerprint};

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying SQLite call failed.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The fingerprint engine rejected the entity.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// No entity of the given kind has this id.
    #[error("{entity} not found: id={id}")]
    NotFound { entity: EntityKind, id: i64 },

    /// Another entity of the same kind already carries this fingerprint.
    #[error("fingerprint collision: a {entity} with fingerprint {fingerprint} already exists")]
    FingerprintCollision {
        entity: EntityKind,
        fingerprint: Fingerprint,
    },

    /// A referential integrity or uniqueness constraint was violated.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },

    /// A fixture file could not be loaded.
    #[error("fixture error: {reason}")]
    Fixture { reason: String },
}

impl StorageError {
    /// Whether the error is a [`CoreError::MissingDependency`].
    pub fn is_missing_dependency(&self) -> bool {
        matches!(self, StorageError::Core(CoreError::MissingDependency { .. }))
    }
}

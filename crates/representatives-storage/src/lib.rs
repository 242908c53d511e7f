//! Storage for the representatives model.
//!
//! Provides the [`EntityStore`] trait defining the storage contract that all
//! backends implement, plus the [`InMemoryStore`] and [`SqliteStore`] as
//! first-class backends.
//!
//! # Architecture
//!
//! Every save goes through one pipeline shared by both backends: relations
//! are resolved to the referenced entities' stored fingerprints, the
//! fingerprint hook runs on a staged copy, the fingerprint is checked for
//! uniqueness within its kind, and only then is the staged copy written.
//! Fixture files are loaded through the same save path.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`traits`]: EntityStore trait definition
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: embedded migrations and connection setup
//! - [`sqlite`]: SqliteStore implementation
//! - [`fixture`]: fixture loading and unloading

pub mod error;
pub mod fixture;
pub mod memory;
mod save;
pub mod schema;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use fixture::{load_fixture, unload_fixture, FixtureReport};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::EntityStore;

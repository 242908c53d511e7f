//! Data model for political representatives and their content fingerprints.
//!
//! Hashable entities (representatives, groups, constituencies, mandates)
//! carry a SHA-1 fingerprint derived from a declared, ordered subset of
//! their fields. Relation fields contribute the referenced entity's own
//! fingerprint, so identity is stable across databases and re-imports.
//!
//! # Modules
//!
//! - [`fingerprint`]: the fingerprint engine and the recipe capability
//! - [`timestamps`]: the created/updated capability
//! - [`relation`]: references between entities
//! - [`country`], [`representative`], [`contact`], [`mandate`]: entity types
//! - [`entity`]: the base capability every stored type has
//! - [`id`], [`kind`], [`error`]: identifiers, kinds, and errors

pub mod contact;
pub mod country;
pub mod entity;
pub mod error;
pub mod fingerprint;
pub mod id;
pub mod kind;
pub mod mandate;
pub mod relation;
pub mod representative;
pub mod timestamps;

// Re-export commonly used types
pub use contact::{Address, Email, Phone, WebSite};
pub use country::Country;
pub use entity::Entity;
pub use error::CoreError;
pub use fingerprint::{
    compute_fingerprint, hash_input, on_save, FieldKind, Fingerprint, HashRecipe, Hashable,
    RecipeField, RecipeValue,
};
pub use id::{
    AddressId, ConstituencyId, CountryId, EmailId, GroupId, MandateId, PhoneId, RepresentativeId,
    WebSiteId,
};
pub use kind::EntityKind;
pub use mandate::{today, Constituency, Group, Mandate};
pub use relation::Related;
pub use representative::{Gender, Representative};
pub use timestamps::{Timestamped, Timestamps};

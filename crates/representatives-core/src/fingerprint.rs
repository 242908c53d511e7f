//! Deterministic content fingerprints for hashable entities using SHA-1.
//!
//! Each hashable entity type declares a *recipe*: an ordered list of field
//! descriptors, each tagged scalar or relation. The fingerprint is the SHA-1
//! digest of the recipe values concatenated in declared order with no
//! separator:
//!
//! - a scalar field contributes its canonical string form
//! - a relation field contributes the referenced entity's fingerprint
//!
//! Two entities with the same recipe values therefore always share a
//! fingerprint, which is what lets a re-import find an existing record by
//! recomputing the fingerprint from freshly scraped data.
//!
//! # Canonical scalar forms
//!
//! - text is used verbatim
//! - dates are `YYYY-MM-DD`
//! - an absent optional scalar is the literal `None`
//!
//! The relation case never substitutes a placeholder: an absent or
//! unresolved reference fails with [`CoreError::MissingDependency`].

use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::entity::Entity;
use crate::error::CoreError;
use crate::relation::Related;

/// Length of a hex-encoded SHA-1 digest.
pub const FINGERPRINT_LEN: usize = 40;

/// Canonical form of an absent optional scalar.
pub const ABSENT_SCALAR: &str = "None";

/// A 40-character lowercase hex SHA-1 digest identifying an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Validates and wraps an existing digest string.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let valid = value.len() == FINGERPRINT_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(CoreError::InvalidFingerprint {
                value: value.to_string(),
            });
        }
        Ok(Fingerprint(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Fingerprint::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}

/// Whether a recipe field holds a plain value or a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Relation,
}

/// One entry of a hash recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeField {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl RecipeField {
    pub const fn scalar(name: &'static str) -> Self {
        RecipeField {
            name,
            kind: FieldKind::Scalar,
        }
    }

    pub const fn relation(name: &'static str) -> Self {
        RecipeField {
            name,
            kind: FieldKind::Relation,
        }
    }
}

/// The value an entity supplies for one recipe field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeValue<'a> {
    /// Canonical string form of a scalar field.
    Scalar(Cow<'a, str>),
    /// Fingerprint of the referenced entity, if one is set and resolved.
    Relation(Option<&'a Fingerprint>),
}

impl<'a> RecipeValue<'a> {
    pub fn text(value: &'a str) -> Self {
        RecipeValue::Scalar(Cow::Borrowed(value))
    }

    pub fn date(value: Option<NaiveDate>) -> Self {
        match value {
            Some(date) => RecipeValue::Scalar(Cow::Owned(date.format("%Y-%m-%d").to_string())),
            None => RecipeValue::Scalar(Cow::Borrowed(ABSENT_SCALAR)),
        }
    }

    pub fn relation<I>(value: Option<&'a Related<I>>) -> Self {
        RecipeValue::Relation(value.and_then(Related::fingerprint))
    }
}

/// The fingerprint-recipe capability.
///
/// Implementors declare their ordered recipe once per type and expose
/// the current value of each recipe field by name.
pub trait HashRecipe: Entity {
    const RECIPE: &'static [RecipeField];

    /// Returns the current value of a recipe field, or `None` if the type
    /// has no field by that name.
    fn recipe_value(&self, field: &str) -> Option<RecipeValue<'_>>;
}

/// A recipe holder that also persists its computed fingerprint.
pub trait Hashable: HashRecipe {
    fn fingerprint(&self) -> Option<&Fingerprint>;
    fn set_fingerprint(&mut self, fingerprint: Fingerprint);
}

/// Walks the recipe in order, handing each contributed string to `sink`.
fn walk_recipe<E>(entity: &E, mut sink: impl FnMut(&str)) -> Result<(), CoreError>
where
    E: HashRecipe + ?Sized,
{
    for field in E::RECIPE {
        let value = entity
            .recipe_value(field.name)
            .ok_or(CoreError::UnknownRecipeField {
                entity: E::KIND,
                field: field.name,
            })?;
        match (field.kind, value) {
            (FieldKind::Scalar, RecipeValue::Scalar(s)) => sink(&s),
            (FieldKind::Relation, RecipeValue::Relation(Some(fp))) => sink(fp.as_str()),
            (FieldKind::Relation, RecipeValue::Relation(None)) => {
                return Err(CoreError::MissingDependency {
                    entity: E::KIND,
                    field: field.name,
                })
            }
            (expected, _) => {
                return Err(CoreError::RecipeKindMismatch {
                    entity: E::KIND,
                    field: field.name,
                    expected,
                })
            }
        }
    }
    Ok(())
}

/// SHA-1 over a sequence of string parts, with no separator.
pub fn digest_parts<'a>(parts: impl IntoIterator<Item = &'a str>) -> Fingerprint {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Computes the fingerprint of `entity` from its declared recipe.
///
/// Pure: the entity is not modified. Fails if a relation field has no
/// resolved fingerprint.
pub fn compute_fingerprint<E>(entity: &E) -> Result<Fingerprint, CoreError>
where
    E: HashRecipe + ?Sized,
{
    let mut hasher = Sha1::new();
    walk_recipe(entity, |part| hasher.update(part.as_bytes()))?;
    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

/// Returns the exact pre-image string that [`compute_fingerprint`] hashes.
pub fn hash_input<E>(entity: &E) -> Result<String, CoreError>
where
    E: HashRecipe + ?Sized,
{
    let mut input = String::new();
    walk_recipe(entity, |part| input.push_str(part))?;
    Ok(input)
}

/// Save hook: recomputes the fingerprint and stores it on the entity.
///
/// Must run after relation fields are resolved and before the store checks
/// fingerprint uniqueness. On error the entity's previous fingerprint is
/// left untouched.
pub fn on_save<E>(entity: &mut E) -> Result<Fingerprint, CoreError>
where
    E: Hashable + ?Sized,
{
    let fingerprint = compute_fingerprint(entity)?;
    entity.set_fingerprint(fingerprint.clone());
    Ok(fingerprint)
}

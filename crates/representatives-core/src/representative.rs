//! Representatives: the people holding mandates.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::fingerprint::{Fingerprint, HashRecipe, Hashable, RecipeField, RecipeValue};
use crate::id::RepresentativeId;
use crate::relation::Related;
use crate::timestamps::{timestamped, Timestamps};

/// Declared gender, stored as a small integer code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Gender {
    #[default]
    NotAvailable,
    Female,
    Male,
}

impl Gender {
    pub fn code(self) -> i64 {
        match self {
            Gender::NotAvailable => 0,
            Gender::Female => 1,
            Gender::Male => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, CoreError> {
        match code {
            0 => Ok(Gender::NotAvailable),
            1 => Ok(Gender::Female),
            2 => Ok(Gender::Male),
            _ => Err(CoreError::UnknownGender { code }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::NotAvailable => "N/A",
            Gender::Female => "F",
            Gender::Male => "M",
        }
    }
}

impl TryFrom<i64> for Gender {
    type Error = CoreError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Gender::from_code(code)
    }
}

impl From<Gender> for i64 {
    fn from(gender: Gender) -> Self {
        gender.code()
    }
}

/// An elected representative, identified externally by `remote_id`.
///
/// Hash recipe: `[remote_id]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Representative {
    pub id: Option<RepresentativeId>,
    pub fingerprint: Option<Fingerprint>,
    pub timestamps: Timestamps,
    pub slug: String,
    pub remote_id: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub gender: Gender,
    pub birth_place: String,
    pub birth_date: Option<NaiveDate>,
    pub cv: String,
    pub photo: Option<String>,
    pub active: bool,
}

impl Representative {
    pub fn new(remote_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Representative {
            remote_id: remote_id.into(),
            full_name: full_name.into(),
            ..Default::default()
        }
    }

    /// A resolved reference to this representative, once it is stored.
    pub fn as_related(&self) -> Option<Related<RepresentativeId>> {
        Some(Related::resolved(self.id?, self.fingerprint.clone()?))
    }
}

impl HashRecipe for Representative {
    const RECIPE: &'static [RecipeField] = &[RecipeField::scalar("remote_id")];

    fn recipe_value(&self, field: &str) -> Option<RecipeValue<'_>> {
        match field {
            "remote_id" => Some(RecipeValue::text(&self.remote_id)),
            _ => None,
        }
    }
}

impl Hashable for Representative {
    fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    fn set_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.fingerprint = Some(fingerprint);
    }
}

timestamped!(Representative);

impl fmt::Display for Representative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name, self.remote_id)
    }
}

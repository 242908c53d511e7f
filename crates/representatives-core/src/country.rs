//! Countries referenced by postal addresses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fingerprint::{digest_parts, Fingerprint, HashRecipe, RecipeField, RecipeValue};
use crate::id::CountryId;

/// A country, identified by name and ISO 3166-1 alpha-2 code.
///
/// Countries are not hashable: their fingerprint is computed on demand
/// over `(name, code)` and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub id: Option<CountryId>,
    pub name: String,
    pub code: String,
}

impl Country {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Country {
            id: None,
            name: name.into(),
            code: code.into(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        digest_parts([self.name.as_str(), self.code.as_str()])
    }
}

impl HashRecipe for Country {
    const RECIPE: &'static [RecipeField] =
        &[RecipeField::scalar("name"), RecipeField::scalar("code")];

    fn recipe_value(&self, field: &str) -> Option<RecipeValue<'_>> {
        match field {
            "name" => Some(RecipeValue::text(&self.name)),
            "code" => Some(RecipeValue::text(&self.code)),
            _ => None,
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.code)
    }
}

//! The closed set of entity types in the representatives model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Application label prefixed to model names in fixture files.
pub const APP_LABEL: &str = "representatives";

/// Every entity type the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Country,
    Representative,
    Email,
    WebSite,
    Address,
    Phone,
    Group,
    Constituency,
    Mandate,
}

impl EntityKind {
    pub const ALL: [EntityKind; 9] = [
        EntityKind::Country,
        EntityKind::Representative,
        EntityKind::Email,
        EntityKind::WebSite,
        EntityKind::Address,
        EntityKind::Phone,
        EntityKind::Group,
        EntityKind::Constituency,
        EntityKind::Mandate,
    ];

    /// Lowercase model name, as used in fixture labels and on the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Country => "country",
            EntityKind::Representative => "representative",
            EntityKind::Email => "email",
            EntityKind::WebSite => "website",
            EntityKind::Address => "address",
            EntityKind::Phone => "phone",
            EntityKind::Group => "group",
            EntityKind::Constituency => "constituency",
            EntityKind::Mandate => "mandate",
        }
    }

    /// Whether instances of this kind persist a unique fingerprint.
    pub fn is_hashable(self) -> bool {
        matches!(
            self,
            EntityKind::Representative
                | EntityKind::Group
                | EntityKind::Constituency
                | EntityKind::Mandate
        )
    }

    /// Parses a fixture model label such as `representatives.country`.
    ///
    /// The app prefix is optional; the model name is case-insensitive.
    pub fn from_model_label(label: &str) -> Result<Self, CoreError> {
        let model = match label.split_once('.') {
            Some((app, model)) if app.eq_ignore_ascii_case(APP_LABEL) => model,
            Some(_) => {
                return Err(CoreError::UnknownEntityKind {
                    name: label.to_string(),
                })
            }
            None => label,
        };
        model.parse()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownEntityKind {
                name: s.to_string(),
            })
    }
}

//! Groups, constituencies, and the mandates linking representatives to them.

use std::fmt;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::fingerprint::{Fingerprint, HashRecipe, Hashable, RecipeField, RecipeValue};
use crate::id::{ConstituencyId, GroupId, MandateId, RepresentativeId};
use crate::relation::Related;
use crate::timestamps::{timestamped, Timestamps};

/// The current local calendar date, used as "now" by activity checks.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// An entity a representative represents through a mandate, such as a
/// political group or a committee.
///
/// Hash recipe: `[name, abbreviation, kind]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: Option<GroupId>,
    pub fingerprint: Option<Fingerprint>,
    pub timestamps: Timestamps,
    pub name: String,
    pub abbreviation: String,
    pub kind: String,
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Group {
            name: name.into(),
            abbreviation: abbreviation.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn as_related(&self) -> Option<Related<GroupId>> {
        Some(Related::resolved(self.id?, self.fingerprint.clone()?))
    }
}

impl HashRecipe for Group {
    const RECIPE: &'static [RecipeField] = &[
        RecipeField::scalar("name"),
        RecipeField::scalar("abbreviation"),
        RecipeField::scalar("kind"),
    ];

    fn recipe_value(&self, field: &str) -> Option<RecipeValue<'_>> {
        match field {
            "name" => Some(RecipeValue::text(&self.name)),
            "abbreviation" => Some(RecipeValue::text(&self.abbreviation)),
            "kind" => Some(RecipeValue::text(&self.kind)),
            _ => None,
        }
    }
}

impl Hashable for Group {
    fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    fn set_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.fingerprint = Some(fingerprint);
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An authority for which a representative holds a mandate.
///
/// Hash recipe: `[name]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constituency {
    pub id: Option<ConstituencyId>,
    pub fingerprint: Option<Fingerprint>,
    pub timestamps: Timestamps,
    pub name: String,
}

impl Constituency {
    pub fn new(name: impl Into<String>) -> Self {
        Constituency {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn as_related(&self) -> Option<Related<ConstituencyId>> {
        Some(Related::resolved(self.id?, self.fingerprint.clone()?))
    }
}

impl HashRecipe for Constituency {
    const RECIPE: &'static [RecipeField] = &[RecipeField::scalar("name")];

    fn recipe_value(&self, field: &str) -> Option<RecipeValue<'_>> {
        match field {
            "name" => Some(RecipeValue::text(&self.name)),
            _ => None,
        }
    }
}

impl Hashable for Constituency {
    fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    fn set_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.fingerprint = Some(fingerprint);
    }
}

impl fmt::Display for Constituency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A representative's role in a group, for a constituency, over a period.
///
/// Hash recipe: `[group, constituency, role, begin_date, end_date,
/// representative]`, where `group`, `constituency` and `representative`
/// contribute the referenced entities' fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mandate {
    #[serde(default)]
    pub id: Option<MandateId>,
    #[serde(default)]
    pub fingerprint: Option<Fingerprint>,
    #[serde(default)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub group: Option<Related<GroupId>>,
    #[serde(default)]
    pub constituency: Option<Related<ConstituencyId>>,
    pub representative: Related<RepresentativeId>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub begin_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub link: String,
}

impl Mandate {
    pub fn new(representative: Related<RepresentativeId>) -> Self {
        Mandate {
            id: None,
            fingerprint: None,
            timestamps: Timestamps::default(),
            group: None,
            constituency: None,
            representative,
            role: String::new(),
            begin_date: None,
            end_date: None,
            link: String::new(),
        }
    }

    /// Whether the mandate is still running on `today`.
    ///
    /// The end date is inclusive. A mandate without an end date is
    /// open-ended and counts as active.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.end_date.map_or(true, |end| end >= today)
    }

    pub fn is_active(&self) -> bool {
        self.is_active_on(today())
    }

    /// Whether this mandate makes its group or constituency active on
    /// `today`. Only an explicit end date on or after `today` counts.
    pub fn keeps_active_on(&self, today: NaiveDate) -> bool {
        self.end_date.is_some_and(|end| end >= today)
    }
}

impl HashRecipe for Mandate {
    const RECIPE: &'static [RecipeField] = &[
        RecipeField::relation("group"),
        RecipeField::relation("constituency"),
        RecipeField::scalar("role"),
        RecipeField::scalar("begin_date"),
        RecipeField::scalar("end_date"),
        RecipeField::relation("representative"),
    ];

    fn recipe_value(&self, field: &str) -> Option<RecipeValue<'_>> {
        match field {
            "group" => Some(RecipeValue::relation(self.group.as_ref())),
            "constituency" => Some(RecipeValue::relation(self.constituency.as_ref())),
            "role" => Some(RecipeValue::text(&self.role)),
            "begin_date" => Some(RecipeValue::date(self.begin_date)),
            "end_date" => Some(RecipeValue::date(self.end_date)),
            "representative" => Some(RecipeValue::relation(Some(&self.representative))),
            _ => None,
        }
    }
}

impl Hashable for Mandate {
    fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    fn set_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.fingerprint = Some(fingerprint);
    }
}

timestamped!(Group, Constituency, Mandate);

//! Surrogate identifier newtypes for stored entities.
//!
//! Every entity type gets its own wrapper over `i64` so that a `GroupId`
//! cannot be passed where a `ConstituencyId` is expected. The inner value
//! aligns with SQLite's `INTEGER PRIMARY KEY`; identifiers are assigned by
//! the store on first save.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                $name(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Identifier of a stored [`Country`](crate::country::Country).
    CountryId
);
entity_id!(
    /// Identifier of a stored [`Representative`](crate::representative::Representative).
    RepresentativeId
);
entity_id!(
    /// Identifier of a stored [`Email`](crate::contact::Email).
    EmailId
);
entity_id!(
    /// Identifier of a stored [`WebSite`](crate::contact::WebSite).
    WebSiteId
);
entity_id!(
    /// Identifier of a stored [`Address`](crate::contact::Address).
    AddressId
);
entity_id!(
    /// Identifier of a stored [`Phone`](crate::contact::Phone).
    PhoneId
);
entity_id!(
    /// Identifier of a stored [`Group`](crate::mandate::Group).
    GroupId
);
entity_id!(
    /// Identifier of a stored [`Constituency`](crate::mandate::Constituency).
    ConstituencyId
);
entity_id!(
    /// Identifier of a stored [`Mandate`](crate::mandate::Mandate).
    MandateId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prints_inner_value() {
        assert_eq!(format!("{}", GroupId(7)), "7");
        assert_eq!(format!("{}", MandateId(-1)), "-1");
    }

    #[test]
    fn serde_is_transparent_number() {
        let json = serde_json::to_string(&RepresentativeId(42)).unwrap();
        assert_eq!(json, "42");
        let back: RepresentativeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RepresentativeId(42));
    }
}

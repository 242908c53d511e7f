//! Contact details owned by a representative.
//!
//! None of these are hashable; each belongs to exactly one representative
//! and is deleted with it.

use serde::{Deserialize, Serialize};

use crate::id::{AddressId, CountryId, EmailId, PhoneId, RepresentativeId, WebSiteId};
use crate::timestamps::{timestamped, Timestamps};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    #[serde(default)]
    pub id: Option<EmailId>,
    #[serde(default)]
    pub timestamps: Timestamps,
    pub representative: RepresentativeId,
    pub email: String,
    #[serde(default)]
    pub kind: String,
}

impl Email {
    pub fn new(representative: RepresentativeId, email: impl Into<String>) -> Self {
        Email {
            id: None,
            timestamps: Timestamps::default(),
            representative,
            email: email.into(),
            kind: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSite {
    #[serde(default)]
    pub id: Option<WebSiteId>,
    #[serde(default)]
    pub timestamps: Timestamps,
    pub representative: RepresentativeId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub kind: String,
}

impl WebSite {
    pub fn new(representative: RepresentativeId, url: impl Into<String>) -> Self {
        WebSite {
            id: None,
            timestamps: Timestamps::default(),
            representative,
            url: url.into(),
            kind: String::new(),
        }
    }
}

/// A postal address. Phones may be attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub id: Option<AddressId>,
    #[serde(default)]
    pub timestamps: Timestamps,
    pub representative: RepresentativeId,
    pub country: CountryId,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub floor: String,
    #[serde(default)]
    pub office_number: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
}

impl Address {
    pub fn new(representative: RepresentativeId, country: CountryId) -> Self {
        Address {
            id: None,
            timestamps: Timestamps::default(),
            representative,
            country,
            city: String::new(),
            street: String::new(),
            number: String::new(),
            postcode: String::new(),
            floor: String::new(),
            office_number: String::new(),
            kind: String::new(),
            name: String::new(),
            location: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    #[serde(default)]
    pub id: Option<PhoneId>,
    #[serde(default)]
    pub timestamps: Timestamps,
    pub representative: RepresentativeId,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub address: Option<AddressId>,
}

impl Phone {
    pub fn new(representative: RepresentativeId, number: impl Into<String>) -> Self {
        Phone {
            id: None,
            timestamps: Timestamps::default(),
            representative,
            number: number.into(),
            kind: String::new(),
            address: None,
        }
    }
}

timestamped!(Email, WebSite, Address, Phone);

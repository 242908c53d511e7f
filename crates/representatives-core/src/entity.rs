//! The base capability shared by every stored entity type.

use std::fmt;

use crate::contact::{Address, Email, Phone, WebSite};
use crate::country::Country;
use crate::id::{
    AddressId, ConstituencyId, CountryId, EmailId, GroupId, MandateId, PhoneId, RepresentativeId,
    WebSiteId,
};
use crate::kind::EntityKind;
use crate::mandate::{Constituency, Group, Mandate};
use crate::representative::Representative;

/// A storable entity with a store-assigned surrogate id.
///
/// `id()` is `None` until the entity is first saved; saving an entity
/// whose id is set updates the existing record.
pub trait Entity {
    type Id: Copy + Eq + Ord + fmt::Debug + fmt::Display + From<i64> + Into<i64>;
    const KIND: EntityKind;

    fn id(&self) -> Option<Self::Id>;
    fn set_id(&mut self, id: Self::Id);
}

macro_rules! entity {
    ($($ty:ty => $id:ty, $kind:ident;)*) => {
        $(
            impl Entity for $ty {
                type Id = $id;
                const KIND: EntityKind = EntityKind::$kind;

                fn id(&self) -> Option<$id> {
                    self.id
                }

                fn set_id(&mut self, id: $id) {
                    self.id = Some(id);
                }
            }
        )*
    };
}

entity! {
    Country => CountryId, Country;
    Representative => RepresentativeId, Representative;
    Email => EmailId, Email;
    WebSite => WebSiteId, WebSite;
    Address => AddressId, Address;
    Phone => PhoneId, Phone;
    Group => GroupId, Group;
    Constituency => ConstituencyId, Constituency;
    Mandate => MandateId, Mandate;
}

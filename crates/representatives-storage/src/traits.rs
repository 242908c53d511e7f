//! The [`EntityStore`] trait defining the storage contract for the
//! representatives model.
//!
//! Every `save_*` method follows the same contract:
//! - an entity without an id is inserted and receives a fresh surrogate id
//! - an entity with an id updates that record, or fails with `NotFound`
//! - on success the caller's entity is updated in place (id, timestamps,
//!   and fingerprint for hashable kinds); on failure it is left untouched
//!
//! For hashable kinds the save additionally resolves every relation field
//! to the referenced entity's *stored* fingerprint, runs the fingerprint
//! save hook, and rejects a fingerprint already used by another entity of
//! the same kind, all before anything is written.
//!
//! All backends ([`InMemoryStore`](crate::InMemoryStore),
//! [`SqliteStore`](crate::SqliteStore)) implement this trait with
//! identical semantics.

use chrono::NaiveDate;

use representatives_core::{
    Address, AddressId, Constituency, ConstituencyId, Country, CountryId, Email, EmailId,
    EntityKind, Fingerprint, Group, GroupId, Mandate, MandateId, Phone, PhoneId, Representative,
    RepresentativeId, Timestamps, WebSite, WebSiteId,
};

use crate::error::StorageError;

/// The storage contract for representatives and their related entities.
///
/// The trait is synchronous. Callers that share a store across threads
/// must serialize saves of the same entity themselves.
pub trait EntityStore {
    // -------------------------------------------------------------------
    // Countries
    // -------------------------------------------------------------------

    fn save_country(&mut self, country: &mut Country) -> Result<CountryId, StorageError>;

    fn get_country(&self, id: CountryId) -> Result<Country, StorageError>;

    /// Lists all countries ordered by id.
    fn list_countries(&self) -> Result<Vec<Country>, StorageError>;

    // -------------------------------------------------------------------
    // Representatives
    // -------------------------------------------------------------------

    fn save_representative(
        &mut self,
        representative: &mut Representative,
    ) -> Result<RepresentativeId, StorageError>;

    fn get_representative(&self, id: RepresentativeId) -> Result<Representative, StorageError>;

    fn find_representative(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Representative>, StorageError>;

    /// Deletes a representative together with its contacts and mandates.
    fn delete_representative(&mut self, id: RepresentativeId) -> Result<(), StorageError>;

    // -------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------

    fn save_email(&mut self, email: &mut Email) -> Result<EmailId, StorageError>;

    fn get_email(&self, id: EmailId) -> Result<Email, StorageError>;

    fn emails_of(&self, representative: RepresentativeId) -> Result<Vec<Email>, StorageError>;

    fn save_website(&mut self, website: &mut WebSite) -> Result<WebSiteId, StorageError>;

    fn get_website(&self, id: WebSiteId) -> Result<WebSite, StorageError>;

    fn websites_of(&self, representative: RepresentativeId)
        -> Result<Vec<WebSite>, StorageError>;

    fn save_address(&mut self, address: &mut Address) -> Result<AddressId, StorageError>;

    fn get_address(&self, id: AddressId) -> Result<Address, StorageError>;

    fn addresses_of(&self, representative: RepresentativeId)
        -> Result<Vec<Address>, StorageError>;

    fn save_phone(&mut self, phone: &mut Phone) -> Result<PhoneId, StorageError>;

    fn get_phone(&self, id: PhoneId) -> Result<Phone, StorageError>;

    fn phones_of(&self, representative: RepresentativeId) -> Result<Vec<Phone>, StorageError>;

    // -------------------------------------------------------------------
    // Groups and constituencies
    // -------------------------------------------------------------------

    fn save_group(&mut self, group: &mut Group) -> Result<GroupId, StorageError>;

    fn get_group(&self, id: GroupId) -> Result<Group, StorageError>;

    fn find_group(&self, fingerprint: &Fingerprint) -> Result<Option<Group>, StorageError>;

    /// Whether at least one mandate in the group has an explicit end date
    /// on or after `today`.
    fn group_is_active(&self, id: GroupId, today: NaiveDate) -> Result<bool, StorageError>;

    fn save_constituency(
        &mut self,
        constituency: &mut Constituency,
    ) -> Result<ConstituencyId, StorageError>;

    fn get_constituency(&self, id: ConstituencyId) -> Result<Constituency, StorageError>;

    fn find_constituency(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Constituency>, StorageError>;

    /// Whether at least one mandate for the constituency has an explicit
    /// end date on or after `today`.
    fn constituency_is_active(
        &self,
        id: ConstituencyId,
        today: NaiveDate,
    ) -> Result<bool, StorageError>;

    // -------------------------------------------------------------------
    // Mandates
    // -------------------------------------------------------------------

    fn save_mandate(&mut self, mandate: &mut Mandate) -> Result<MandateId, StorageError>;

    /// Retrieves a mandate with its relations resolved to current
    /// fingerprints.
    fn get_mandate(&self, id: MandateId) -> Result<Mandate, StorageError>;

    fn find_mandate(&self, fingerprint: &Fingerprint) -> Result<Option<Mandate>, StorageError>;

    /// Lists a representative's mandates ordered by id.
    fn mandates_of(&self, representative: RepresentativeId)
        -> Result<Vec<Mandate>, StorageError>;

    // -------------------------------------------------------------------
    // Bulk operations
    // -------------------------------------------------------------------

    /// Number of stored entities of `kind`.
    fn count(&self, kind: EntityKind) -> Result<usize, StorageError>;

    /// Deletes every entity of `kind`, cascading along foreign keys.
    ///
    /// Returns the number of `kind` entities removed.
    fn delete_all(&mut self, kind: EntityKind) -> Result<usize, StorageError>;

    /// Overwrites the stored creation and update instants of an entity.
    ///
    /// Only the instants given as `Some` are written. Imports use this to
    /// keep the history recorded in their source. Countries carry no
    /// timestamps, so the call is a no-op for them.
    fn restamp(
        &mut self,
        kind: EntityKind,
        id: i64,
        timestamps: Timestamps,
    ) -> Result<(), StorageError>;

    // -------------------------------------------------------------------
    // Units of work
    // -------------------------------------------------------------------

    /// Runs `f` as one unit of work.
    ///
    /// If `f` fails, every write it made through the store is undone and
    /// its error is returned. Nested calls are allowed.
    fn atomically<T, F>(&mut self, f: F) -> Result<T, StorageError>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, StorageError>;
}

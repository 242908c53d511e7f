//! In-memory implementation of [`EntityStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests, dry-run imports,
//! and anywhere persistence isn't needed. Each entity kind lives in its own
//! id-ordered table, and foreign-key checks and cascades are applied by
//! hand with the same semantics as the SQLite backend.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use representatives_core::{
    Address, AddressId, Constituency, ConstituencyId, Country, CountryId, Email, EmailId, Entity,
    EntityKind, Fingerprint, Group, GroupId, Hashable, Mandate, MandateId, Phone, PhoneId,
    Representative, RepresentativeId, Timestamped, Timestamps, WebSite, WebSiteId,
};

use crate::error::StorageError;
use crate::save::{resolve_mandate, stage_hashable, stage_plain, FingerprintLookup};
use crate::traits::EntityStore;

/// All stored entities of one kind, keyed by surrogate id.
#[derive(Debug, Clone)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
    next_id: i64,
}

impl<E: Entity + Clone> Table<E> {
    fn new() -> Self {
        Table {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn get(&self, id: E::Id) -> Result<E, StorageError> {
        self.rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                entity: E::KIND,
                id: id.into(),
            })
    }

    fn contains(&self, id: E::Id) -> bool {
        self.rows.contains_key(&id)
    }

    /// Fails with `NotFound` if `entity` claims an id that isn't stored.
    fn check_target(&self, entity: &E) -> Result<(), StorageError> {
        match entity.id() {
            Some(id) if !self.contains(id) => Err(StorageError::NotFound {
                entity: E::KIND,
                id: id.into(),
            }),
            _ => Ok(()),
        }
    }

    /// Writes a staged entity, allocating an id if it has none.
    fn commit(&mut self, mut staged: E) -> (E::Id, E) {
        let id = match staged.id() {
            Some(id) => id,
            None => {
                let id = E::Id::from(self.next_id);
                self.next_id += 1;
                staged.set_id(id);
                id
            }
        };
        self.rows.insert(id, staged.clone());
        (id, staged)
    }

    fn filter(&self, mut pred: impl FnMut(&E) -> bool) -> Vec<E> {
        self.rows.values().filter(|e| pred(e)).cloned().collect()
    }

    fn ids_where(&self, mut pred: impl FnMut(&E) -> bool) -> Vec<E::Id> {
        self.rows
            .iter()
            .filter(|(_, e)| pred(e))
            .map(|(id, _)| *id)
            .collect()
    }

    fn remove_where(&mut self, mut pred: impl FnMut(&E) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, e| !pred(e));
        before - self.rows.len()
    }
}

impl<E: Entity + Timestamped + Clone> Table<E> {
    /// Like [`Table::commit`], keeping the stored creation instant on update.
    fn commit_touched(&mut self, mut staged: E) -> (E::Id, E) {
        let stored_created = staged
            .id()
            .and_then(|id| self.rows.get(&id))
            .and_then(|row| row.timestamps().created);
        if let Some(created) = stored_created {
            staged.timestamps_mut().created = Some(created);
        }
        self.commit(staged)
    }

    fn restamp(&mut self, id: i64, timestamps: Timestamps) -> Result<(), StorageError> {
        let row = self
            .rows
            .get_mut(&E::Id::from(id))
            .ok_or(StorageError::NotFound {
                entity: E::KIND,
                id,
            })?;
        let stored = row.timestamps_mut();
        if let Some(created) = timestamps.created {
            stored.created = Some(created);
        }
        if let Some(updated) = timestamps.updated {
            stored.updated = Some(updated);
        }
        Ok(())
    }
}

impl<E: Hashable + Clone> Table<E> {
    fn find(&self, fingerprint: &Fingerprint) -> Option<E> {
        self.rows
            .values()
            .find(|e| e.fingerprint() == Some(fingerprint))
            .cloned()
    }

    fn holder_of(&self, fingerprint: &Fingerprint) -> Option<E::Id> {
        self.rows
            .iter()
            .find(|(_, e)| e.fingerprint() == Some(fingerprint))
            .map(|(id, _)| *id)
    }

    fn stored_fingerprint(&self, id: i64) -> Option<Fingerprint> {
        self.rows
            .get(&E::Id::from(id))
            .and_then(|e| e.fingerprint().cloned())
    }
}

/// In-memory implementation of [`EntityStore`].
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    countries: Table<Country>,
    representatives: Table<Representative>,
    emails: Table<Email>,
    websites: Table<WebSite>,
    addresses: Table<Address>,
    phones: Table<Phone>,
    groups: Table<Group>,
    constituencies: Table<Constituency>,
    mandates: Table<Mandate>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            countries: Table::new(),
            representatives: Table::new(),
            emails: Table::new(),
            websites: Table::new(),
            addresses: Table::new(),
            phones: Table::new(),
            groups: Table::new(),
            constituencies: Table::new(),
            mandates: Table::new(),
        }
    }

    fn integrity(reason: String) -> StorageError {
        StorageError::IntegrityError { reason }
    }

    fn require_representative(
        &self,
        owner: EntityKind,
        id: RepresentativeId,
    ) -> Result<(), StorageError> {
        if !self.representatives.contains(id) {
            return Err(Self::integrity(format!(
                "{owner} references missing representative {id}"
            )));
        }
        Ok(())
    }

    /// Re-resolves a stored mandate's relations to current fingerprints.
    fn refreshed(&self, mut mandate: Mandate) -> Result<Mandate, StorageError> {
        resolve_mandate(&mut mandate, self)?;
        Ok(mandate)
    }

    fn remove_addresses(&mut self, ids: &[AddressId]) -> usize {
        self.phones
            .remove_where(|p| p.address.is_some_and(|a| ids.contains(&a)));
        self.addresses.remove_where(|a| a.id.is_some_and(|id| ids.contains(&id)))
    }

    fn remove_representatives(&mut self, ids: &[RepresentativeId]) -> usize {
        let owned = |rep: &RepresentativeId| ids.contains(rep);
        self.emails.remove_where(|e| owned(&e.representative));
        self.websites.remove_where(|w| owned(&w.representative));
        self.phones.remove_where(|p| owned(&p.representative));
        let addresses = self.addresses.ids_where(|a| owned(&a.representative));
        self.remove_addresses(&addresses);
        self.mandates
            .remove_where(|m| owned(&m.representative.id));
        self.representatives
            .remove_where(|r| r.id.is_some_and(|id| owned(&id)))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FingerprintLookup for InMemoryStore {
    fn stored_fingerprint(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<Fingerprint>, StorageError> {
        Ok(match kind {
            EntityKind::Representative => self.representatives.stored_fingerprint(id),
            EntityKind::Group => self.groups.stored_fingerprint(id),
            EntityKind::Constituency => self.constituencies.stored_fingerprint(id),
            EntityKind::Mandate => self.mandates.stored_fingerprint(id),
            _ => None,
        })
    }
}

impl EntityStore for InMemoryStore {
    // -------------------------------------------------------------------
    // Countries
    // -------------------------------------------------------------------

    fn save_country(&mut self, country: &mut Country) -> Result<CountryId, StorageError> {
        self.countries.check_target(country)?;
        let (id, stored) = self.countries.commit(country.clone());
        *country = stored;
        Ok(id)
    }

    fn get_country(&self, id: CountryId) -> Result<Country, StorageError> {
        self.countries.get(id)
    }

    fn list_countries(&self) -> Result<Vec<Country>, StorageError> {
        Ok(self.countries.filter(|_| true))
    }

    // -------------------------------------------------------------------
    // Representatives
    // -------------------------------------------------------------------

    fn save_representative(
        &mut self,
        representative: &mut Representative,
    ) -> Result<RepresentativeId, StorageError> {
        self.representatives.check_target(representative)?;
        let staged = stage_hashable(&*representative, Utc::now(), |fp| {
            Ok(self.representatives.holder_of(fp))
        })?;
        let (id, stored) = self.representatives.commit_touched(staged);
        *representative = stored;
        Ok(id)
    }

    fn get_representative(&self, id: RepresentativeId) -> Result<Representative, StorageError> {
        self.representatives.get(id)
    }

    fn find_representative(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Representative>, StorageError> {
        Ok(self.representatives.find(fingerprint))
    }

    fn delete_representative(&mut self, id: RepresentativeId) -> Result<(), StorageError> {
        if !self.representatives.contains(id) {
            return Err(StorageError::NotFound {
                entity: EntityKind::Representative,
                id: id.0,
            });
        }
        self.remove_representatives(&[id]);
        debug!(representative = %id, "deleted representative");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------

    fn save_email(&mut self, email: &mut Email) -> Result<EmailId, StorageError> {
        self.emails.check_target(email)?;
        self.require_representative(EntityKind::Email, email.representative)?;
        let (id, stored) = self.emails.commit_touched(stage_plain(&*email, Utc::now()));
        *email = stored;
        Ok(id)
    }

    fn get_email(&self, id: EmailId) -> Result<Email, StorageError> {
        self.emails.get(id)
    }

    fn emails_of(&self, representative: RepresentativeId) -> Result<Vec<Email>, StorageError> {
        Ok(self.emails.filter(|e| e.representative == representative))
    }

    fn save_website(&mut self, website: &mut WebSite) -> Result<WebSiteId, StorageError> {
        self.websites.check_target(website)?;
        self.require_representative(EntityKind::WebSite, website.representative)?;
        let (id, stored) = self.websites.commit_touched(stage_plain(&*website, Utc::now()));
        *website = stored;
        Ok(id)
    }

    fn get_website(&self, id: WebSiteId) -> Result<WebSite, StorageError> {
        self.websites.get(id)
    }

    fn websites_of(
        &self,
        representative: RepresentativeId,
    ) -> Result<Vec<WebSite>, StorageError> {
        Ok(self.websites.filter(|w| w.representative == representative))
    }

    fn save_address(&mut self, address: &mut Address) -> Result<AddressId, StorageError> {
        self.addresses.check_target(address)?;
        self.require_representative(EntityKind::Address, address.representative)?;
        if !self.countries.contains(address.country) {
            return Err(Self::integrity(format!(
                "address references missing country {}",
                address.country
            )));
        }
        let (id, stored) = self.addresses.commit_touched(stage_plain(&*address, Utc::now()));
        *address = stored;
        Ok(id)
    }

    fn get_address(&self, id: AddressId) -> Result<Address, StorageError> {
        self.addresses.get(id)
    }

    fn addresses_of(
        &self,
        representative: RepresentativeId,
    ) -> Result<Vec<Address>, StorageError> {
        Ok(self.addresses.filter(|a| a.representative == representative))
    }

    fn save_phone(&mut self, phone: &mut Phone) -> Result<PhoneId, StorageError> {
        self.phones.check_target(phone)?;
        self.require_representative(EntityKind::Phone, phone.representative)?;
        if let Some(address) = phone.address {
            if !self.addresses.contains(address) {
                return Err(Self::integrity(format!(
                    "phone references missing address {address}"
                )));
            }
        }
        let (id, stored) = self.phones.commit_touched(stage_plain(&*phone, Utc::now()));
        *phone = stored;
        Ok(id)
    }

    fn get_phone(&self, id: PhoneId) -> Result<Phone, StorageError> {
        self.phones.get(id)
    }

    fn phones_of(&self, representative: RepresentativeId) -> Result<Vec<Phone>, StorageError> {
        Ok(self.phones.filter(|p| p.representative == representative))
    }

    // -------------------------------------------------------------------
    // Groups and constituencies
    // -------------------------------------------------------------------

    fn save_group(&mut self, group: &mut Group) -> Result<GroupId, StorageError> {
        self.groups.check_target(group)?;
        let staged = stage_hashable(&*group, Utc::now(), |fp| Ok(self.groups.holder_of(fp)))?;
        let (id, stored) = self.groups.commit_touched(staged);
        *group = stored;
        Ok(id)
    }

    fn get_group(&self, id: GroupId) -> Result<Group, StorageError> {
        self.groups.get(id)
    }

    fn find_group(&self, fingerprint: &Fingerprint) -> Result<Option<Group>, StorageError> {
        Ok(self.groups.find(fingerprint))
    }

    fn group_is_active(&self, id: GroupId, today: NaiveDate) -> Result<bool, StorageError> {
        self.groups.get(id)?;
        Ok(self.mandates.rows.values().any(|m| {
            m.group.as_ref().is_some_and(|g| g.id == id) && m.keeps_active_on(today)
        }))
    }

    fn save_constituency(
        &mut self,
        constituency: &mut Constituency,
    ) -> Result<ConstituencyId, StorageError> {
        self.constituencies.check_target(constituency)?;
        let staged = stage_hashable(&*constituency, Utc::now(), |fp| {
            Ok(self.constituencies.holder_of(fp))
        })?;
        let (id, stored) = self.constituencies.commit_touched(staged);
        *constituency = stored;
        Ok(id)
    }

    fn get_constituency(&self, id: ConstituencyId) -> Result<Constituency, StorageError> {
        self.constituencies.get(id)
    }

    fn find_constituency(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Constituency>, StorageError> {
        Ok(self.constituencies.find(fingerprint))
    }

    fn constituency_is_active(
        &self,
        id: ConstituencyId,
        today: NaiveDate,
    ) -> Result<bool, StorageError> {
        self.constituencies.get(id)?;
        Ok(self.mandates.rows.values().any(|m| {
            m.constituency.as_ref().is_some_and(|c| c.id == id) && m.keeps_active_on(today)
        }))
    }

    // -------------------------------------------------------------------
    // Mandates
    // -------------------------------------------------------------------

    fn save_mandate(&mut self, mandate: &mut Mandate) -> Result<MandateId, StorageError> {
        self.mandates.check_target(mandate)?;
        let mut resolved = mandate.clone();
        resolve_mandate(&mut resolved, &*self)?;
        let staged = stage_hashable(&resolved, Utc::now(), |fp| {
            Ok(self.mandates.holder_of(fp))
        })?;
        let (id, stored) = self.mandates.commit_touched(staged);
        *mandate = stored;
        Ok(id)
    }

    fn get_mandate(&self, id: MandateId) -> Result<Mandate, StorageError> {
        self.refreshed(self.mandates.get(id)?)
    }

    fn find_mandate(&self, fingerprint: &Fingerprint) -> Result<Option<Mandate>, StorageError> {
        self.mandates
            .find(fingerprint)
            .map(|m| self.refreshed(m))
            .transpose()
    }

    fn mandates_of(
        &self,
        representative: RepresentativeId,
    ) -> Result<Vec<Mandate>, StorageError> {
        self.mandates
            .filter(|m| m.representative.id == representative)
            .into_iter()
            .map(|m| self.refreshed(m))
            .collect()
    }

    // -------------------------------------------------------------------
    // Bulk operations
    // -------------------------------------------------------------------

    fn count(&self, kind: EntityKind) -> Result<usize, StorageError> {
        Ok(match kind {
            EntityKind::Country => self.countries.rows.len(),
            EntityKind::Representative => self.representatives.rows.len(),
            EntityKind::Email => self.emails.rows.len(),
            EntityKind::WebSite => self.websites.rows.len(),
            EntityKind::Address => self.addresses.rows.len(),
            EntityKind::Phone => self.phones.rows.len(),
            EntityKind::Group => self.groups.rows.len(),
            EntityKind::Constituency => self.constituencies.rows.len(),
            EntityKind::Mandate => self.mandates.rows.len(),
        })
    }

    fn delete_all(&mut self, kind: EntityKind) -> Result<usize, StorageError> {
        let removed = match kind {
            EntityKind::Country => {
                let countries: Vec<CountryId> = self.countries.rows.keys().copied().collect();
                let addresses = self.addresses.ids_where(|a| countries.contains(&a.country));
                self.remove_addresses(&addresses);
                self.countries.remove_where(|_| true)
            }
            EntityKind::Representative => {
                let ids: Vec<RepresentativeId> =
                    self.representatives.rows.keys().copied().collect();
                self.remove_representatives(&ids)
            }
            EntityKind::Email => self.emails.remove_where(|_| true),
            EntityKind::WebSite => self.websites.remove_where(|_| true),
            EntityKind::Address => {
                let ids: Vec<AddressId> = self.addresses.rows.keys().copied().collect();
                self.remove_addresses(&ids)
            }
            EntityKind::Phone => self.phones.remove_where(|_| true),
            EntityKind::Group => {
                self.mandates.remove_where(|m| m.group.is_some());
                self.groups.remove_where(|_| true)
            }
            EntityKind::Constituency => {
                self.mandates.remove_where(|m| m.constituency.is_some());
                self.constituencies.remove_where(|_| true)
            }
            EntityKind::Mandate => self.mandates.remove_where(|_| true),
        };
        debug!(entity = %kind, removed, "deleted all");
        Ok(removed)
    }

    fn restamp(
        &mut self,
        kind: EntityKind,
        id: i64,
        timestamps: Timestamps,
    ) -> Result<(), StorageError> {
        match kind {
            EntityKind::Country => Ok(()),
            EntityKind::Representative => self.representatives.restamp(id, timestamps),
            EntityKind::Email => self.emails.restamp(id, timestamps),
            EntityKind::WebSite => self.websites.restamp(id, timestamps),
            EntityKind::Address => self.addresses.restamp(id, timestamps),
            EntityKind::Phone => self.phones.restamp(id, timestamps),
            EntityKind::Group => self.groups.restamp(id, timestamps),
            EntityKind::Constituency => self.constituencies.restamp(id, timestamps),
            EntityKind::Mandate => self.mandates.restamp(id, timestamps),
        }
    }

    // -------------------------------------------------------------------
    // Units of work
    // -------------------------------------------------------------------

    fn atomically<T, F>(&mut self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Self) -> Result<T, StorageError>,
    {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
            debug!("rolled back unit of work");
        }
        result
    }
}

//! The save pipeline shared by every backend.
//!
//! A hashable entity is never written directly. The backend first builds a
//! *staged* copy:
//!
//! 1. relation fields are resolved to the referenced entities' stored
//!    fingerprints ([`resolve_mandate`])
//! 2. the fingerprint save hook runs on the staged copy
//! 3. the backend's uniqueness probe rejects a fingerprint already used by
//!    another entity of the same kind
//! 4. timestamps are touched
//!
//! Only the staged copy is written, and it replaces the caller's entity
//! once the write has committed. A failure at any step leaves both the
//! store and the caller's entity unchanged.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use representatives_core::{
    on_save, CoreError, Entity, EntityKind, Fingerprint, Hashable, Mandate, Timestamped,
};

use crate::error::StorageError;

/// Looks up the stored fingerprint of a hashable entity by kind and id.
///
/// Returns `Ok(None)` when no such entity exists.
pub(crate) trait FingerprintLookup {
    fn stored_fingerprint(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<Fingerprint>, StorageError>;
}

fn missing(field: &'static str) -> StorageError {
    StorageError::Core(CoreError::MissingDependency {
        entity: Mandate::KIND,
        field,
    })
}

/// Replaces the cached fingerprint of every relation in `mandate` with the
/// referenced entity's stored one.
///
/// An absent optional relation is left absent; the fingerprint hook
/// reports it. A relation pointing at a missing entity fails here.
pub(crate) fn resolve_mandate(
    mandate: &mut Mandate,
    lookup: &impl FingerprintLookup,
) -> Result<(), StorageError> {
    if let Some(group) = mandate.group.as_mut() {
        let fp = lookup
            .stored_fingerprint(EntityKind::Group, group.id.into())?
            .ok_or_else(|| missing("group"))?;
        group.resolve(fp);
    }
    if let Some(constituency) = mandate.constituency.as_mut() {
        let fp = lookup
            .stored_fingerprint(EntityKind::Constituency, constituency.id.into())?
            .ok_or_else(|| missing("constituency"))?;
        constituency.resolve(fp);
    }
    let fp = lookup
        .stored_fingerprint(
            EntityKind::Representative,
            mandate.representative.id.into(),
        )?
        .ok_or_else(|| missing("representative"))?;
    mandate.representative.resolve(fp);
    Ok(())
}

/// Builds the staged copy of a hashable entity.
///
/// `taken_by` reports the id of the entity currently holding a fingerprint
/// of this kind, if any.
pub(crate) fn stage_hashable<E>(
    entity: &E,
    now: DateTime<Utc>,
    taken_by: impl FnOnce(&Fingerprint) -> Result<Option<E::Id>, StorageError>,
) -> Result<E, StorageError>
where
    E: Hashable + Timestamped + Clone,
{
    let mut staged = entity.clone();
    let fingerprint = on_save(&mut staged)?;

    if let Some(holder) = taken_by(&fingerprint)? {
        if Some(holder) != staged.id() {
            warn!(
                entity = %E::KIND,
                %fingerprint,
                holder = %holder,
                "rejected save: fingerprint already in use"
            );
            return Err(StorageError::FingerprintCollision {
                entity: E::KIND,
                fingerprint,
            });
        }
    }

    staged.touch(now);
    debug!(entity = %E::KIND, %fingerprint, recipe_len = E::RECIPE.len(), "staged hashable save");
    Ok(staged)
}

/// Builds the staged copy of a non-hashable timestamped entity.
pub(crate) fn stage_plain<E>(entity: &E, now: DateTime<Utc>) -> E
where
    E: Entity + Timestamped + Clone,
{
    let mut staged = entity.clone();
    staged.touch(now);
    staged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use representatives_core::fingerprint::digest_parts;
    use representatives_core::{Group, GroupId, Related, Representative, RepresentativeId};

    struct Lookup(HashMap<(EntityKind, i64), Fingerprint>);

    impl FingerprintLookup for Lookup {
        fn stored_fingerprint(
            &self,
            kind: EntityKind,
            id: i64,
        ) -> Result<Option<Fingerprint>, StorageError> {
            Ok(self.0.get(&(kind, id)).cloned())
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_430_196_900, 0).unwrap()
    }

    #[test]
    fn resolve_overwrites_stale_relation_fingerprints() {
        let current = digest_parts(["current"]);
        let lookup = Lookup(HashMap::from([
            ((EntityKind::Representative, 1), current.clone()),
            ((EntityKind::Group, 2), digest_parts(["group"])),
        ]));

        let mut mandate = Mandate::new(Related::resolved(
            RepresentativeId(1),
            digest_parts(["stale"]),
        ));
        mandate.group = Some(Related::new(GroupId(2)));
        resolve_mandate(&mut mandate, &lookup).unwrap();

        assert_eq!(mandate.representative.fingerprint(), Some(&current));
        assert_eq!(
            mandate.group.as_ref().unwrap().fingerprint(),
            Some(&digest_parts(["group"]))
        );
        assert!(mandate.constituency.is_none());
    }

    #[test]
    fn resolve_fails_on_dangling_relation() {
        let lookup = Lookup(HashMap::new());
        let mut mandate = Mandate::new(Related::new(RepresentativeId(9)));
        let err = resolve_mandate(&mut mandate, &lookup).unwrap_err();
        assert!(err.is_missing_dependency());
    }

    #[test]
    fn stage_rejects_fingerprint_held_by_another_entity() {
        let group = Group::new("EPP", "EPP", "political");
        let err = stage_hashable(&group, now(), |_| Ok(Some(GroupId(4)))).unwrap_err();
        assert!(matches!(
            err,
            StorageError::FingerprintCollision {
                entity: EntityKind::Group,
                ..
            }
        ));
    }

    #[test]
    fn stage_allows_entity_to_keep_its_own_fingerprint() {
        let mut rep = Representative::new("MEP-1", "A");
        rep.id = Some(RepresentativeId(3));
        let staged = stage_hashable(&rep, now(), |_| Ok(Some(RepresentativeId(3)))).unwrap();
        assert!(staged.fingerprint.is_some());
        assert_eq!(staged.timestamps.created, Some(now()));
        assert!(rep.fingerprint.is_none(), "caller's entity is untouched");
    }
}

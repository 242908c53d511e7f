//! Behavioral tests run against every backend.

use chrono::NaiveDate;

use representatives_core::{
    Address, Constituency, ConstituencyId, Country, Email, EntityKind, Fingerprint, Group,
    GroupId, Mandate, Phone, Related, Representative, RepresentativeId, Timestamps, WebSite,
};
use representatives_storage::{
    load_fixture, unload_fixture, EntityStore, InMemoryStore, SqliteStore, StorageError,
};

const REP_FP: &str = "654fdf6a3018c3fe38ee3f66227d301c6a7dd8fa";
const EPP_FP: &str = "aa26732d0e718ad518ba9cf29bd0bce94045e4e0";
const PRESIDENT_MANDATE_FP: &str = "3616ba51a8dc854f63451e25f1dbd6dd11f3e037";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn fp(s: &str) -> Fingerprint {
    Fingerprint::parse(s).unwrap()
}

fn seed_rep<S: EntityStore>(store: &mut S, remote_id: &str) -> Representative {
    let mut rep = Representative::new(remote_id, "Jane Doe");
    store.save_representative(&mut rep).unwrap();
    rep
}

/// Saves the EPP group, the France constituency and MEP-12345, and builds
/// the unsaved "President" mandate linking them by id only.
fn seed_president<S: EntityStore>(store: &mut S) -> (GroupId, ConstituencyId, Mandate) {
    let mut group = Group::new("EPP", "EPP", "political");
    let group_id = store.save_group(&mut group).unwrap();
    let mut constituency = Constituency::new("France");
    let constituency_id = store.save_constituency(&mut constituency).unwrap();
    let rep = seed_rep(store, "MEP-12345");

    let mut mandate = Mandate::new(Related::new(rep.id.unwrap()));
    mandate.group = Some(Related::new(group_id));
    mandate.constituency = Some(Related::new(constituency_id));
    mandate.role = "President".into();
    mandate.begin_date = Some(date(2019, 7, 2));
    mandate.end_date = Some(date(2024, 7, 15));
    (group_id, constituency_id, mandate)
}

// ---------------------------------------------------------------------------
// Checks shared by every backend
// ---------------------------------------------------------------------------

fn test_save_assigns_id_fingerprint_and_timestamps<S: EntityStore>(store: &mut S) {
    let mut rep = Representative::new("MEP-12345", "Jane Doe");
    let id = store.save_representative(&mut rep).unwrap();

    assert_eq!(rep.id, Some(id));
    assert_eq!(rep.fingerprint, Some(fp(REP_FP)));
    assert!(rep.timestamps.created.is_some());
    assert_eq!(rep.timestamps.created, rep.timestamps.updated);

    let loaded = store.get_representative(id).unwrap();
    assert_eq!(loaded, rep);
    assert_eq!(
        store.find_representative(&fp(REP_FP)).unwrap().map(|r| r.id),
        Some(Some(id))
    );
}

fn test_update_refreshes_fingerprint_and_keeps_created<S: EntityStore>(store: &mut S) {
    let mut rep = seed_rep(store, "MEP-1");
    let id = rep.id.unwrap();
    let created = rep.timestamps.created;
    let old_fp = rep.fingerprint.clone().unwrap();

    rep.remote_id = "MEP-2".into();
    assert_eq!(store.save_representative(&mut rep).unwrap(), id);

    assert_eq!(rep.timestamps.created, created);
    assert_ne!(rep.fingerprint.as_ref(), Some(&old_fp));
    assert!(store.find_representative(&old_fp).unwrap().is_none());
    assert_eq!(store.get_representative(id).unwrap().remote_id, "MEP-2");
    assert_eq!(store.count(EntityKind::Representative).unwrap(), 1);
}

fn test_duplicate_fingerprint_is_rejected<S: EntityStore>(store: &mut S) {
    seed_rep(store, "MEP-12345");

    let mut twin = Representative::new("MEP-12345", "Someone Else");
    let err = store.save_representative(&mut twin).unwrap_err();
    match err {
        StorageError::FingerprintCollision {
            entity,
            fingerprint,
        } => {
            assert_eq!(entity, EntityKind::Representative);
            assert_eq!(fingerprint.as_str(), REP_FP);
        }
        other => panic!("expected FingerprintCollision, got: {:?}", other),
    }
    assert!(twin.id.is_none(), "failed save leaves the entity untouched");
    assert!(twin.fingerprint.is_none());
    assert_eq!(store.count(EntityKind::Representative).unwrap(), 1);
}

fn test_identical_groups_collide<S: EntityStore>(store: &mut S) {
    let mut first = Group::new("EPP", "EPP", "political");
    store.save_group(&mut first).unwrap();
    assert_eq!(first.fingerprint, Some(fp(EPP_FP)));

    let mut second = Group::new("EPP", "EPP", "political");
    assert!(matches!(
        store.save_group(&mut second),
        Err(StorageError::FingerprintCollision { .. })
    ));

    // A different kind is a different group.
    let mut committee = Group::new("EPP", "EPP", "committee");
    store.save_group(&mut committee).unwrap();
    assert_eq!(store.count(EntityKind::Group).unwrap(), 2);
}

fn test_update_of_unknown_id_is_not_found<S: EntityStore>(store: &mut S) {
    let mut rep = Representative::new("MEP-1", "A");
    rep.id = Some(RepresentativeId(404));
    match store.save_representative(&mut rep).unwrap_err() {
        StorageError::NotFound { entity, id } => {
            assert_eq!(entity, EntityKind::Representative);
            assert_eq!(id, 404);
        }
        other => panic!("expected NotFound, got: {:?}", other),
    }
    assert_eq!(store.count(EntityKind::Representative).unwrap(), 0);
}

fn test_mandate_hashes_stored_relation_fingerprints<S: EntityStore>(store: &mut S) {
    let (_, _, mut mandate) = seed_president(store);
    let id = store.save_mandate(&mut mandate).unwrap();

    assert_eq!(mandate.fingerprint, Some(fp(PRESIDENT_MANDATE_FP)));
    assert!(mandate.representative.is_resolved());

    let loaded = store.get_mandate(id).unwrap();
    assert_eq!(loaded.fingerprint, Some(fp(PRESIDENT_MANDATE_FP)));
    assert_eq!(loaded.representative.fingerprint(), Some(&fp(REP_FP)));
    assert_eq!(
        loaded.group.as_ref().and_then(|g| g.fingerprint()),
        Some(&fp(EPP_FP))
    );
}

fn test_stale_relation_fingerprint_is_replaced<S: EntityStore>(store: &mut S) {
    let (_, _, mut mandate) = seed_president(store);
    let rep_id = mandate.representative.id;
    // Whatever the caller cached is ignored in favor of the stored value.
    mandate.representative = Related::resolved(rep_id, fp(EPP_FP));
    store.save_mandate(&mut mandate).unwrap();
    assert_eq!(mandate.fingerprint, Some(fp(PRESIDENT_MANDATE_FP)));
}

fn test_dangling_relation_is_missing_dependency<S: EntityStore>(store: &mut S) {
    let mut mandate = Mandate::new(Related::new(RepresentativeId(99)));
    let err = store.save_mandate(&mut mandate).unwrap_err();
    assert!(err.is_missing_dependency(), "got: {:?}", err);
    assert!(mandate.fingerprint.is_none());
    assert_eq!(store.count(EntityKind::Mandate).unwrap(), 0);
}

fn test_absent_optional_relation_is_missing_dependency<S: EntityStore>(store: &mut S) {
    let (_, _, mut mandate) = seed_president(store);
    mandate.group = None;
    let err = store.save_mandate(&mut mandate).unwrap_err();
    assert!(err.is_missing_dependency(), "got: {:?}", err);
}

fn test_relation_indirection<S: EntityStore>(store: &mut S) {
    let (_, _, mut mandate) = seed_president(store);
    let mandate_id = store.save_mandate(&mut mandate).unwrap();
    let rep_id = mandate.representative.id;

    // A non-recipe change on the representative leaves the mandate alone.
    let mut rep = store.get_representative(rep_id).unwrap();
    rep.full_name = "Jane Q. Doe".into();
    rep.cv = "Long career".into();
    store.save_representative(&mut rep).unwrap();
    let mut again = store.get_mandate(mandate_id).unwrap();
    store.save_mandate(&mut again).unwrap();
    assert_eq!(again.fingerprint, Some(fp(PRESIDENT_MANDATE_FP)));

    // A recipe change propagates on the mandate's next save.
    rep.remote_id = "MEP-54321".into();
    store.save_representative(&mut rep).unwrap();
    let mut moved = store.get_mandate(mandate_id).unwrap();
    assert_eq!(moved.representative.fingerprint(), rep.fingerprint.as_ref());
    store.save_mandate(&mut moved).unwrap();
    assert_ne!(moved.fingerprint, Some(fp(PRESIDENT_MANDATE_FP)));
}

fn test_contacts_belong_to_representative<S: EntityStore>(store: &mut S) {
    let rep = seed_rep(store, "MEP-1");
    let rep_id = rep.id.unwrap();
    let mut france = Country::new("France", "FR");
    let country_id = store.save_country(&mut france).unwrap();

    let mut email = Email::new(rep_id, "jane@europarl.eu");
    email.kind = "official".into();
    store.save_email(&mut email).unwrap();
    store
        .save_website(&mut WebSite::new(rep_id, "https://example.eu"))
        .unwrap();
    let mut address = Address::new(rep_id, country_id);
    address.city = "Strasbourg".into();
    let address_id = store.save_address(&mut address).unwrap();
    let mut phone = Phone::new(rep_id, "+33 3 88 17 40 01");
    phone.address = Some(address_id);
    store.save_phone(&mut phone).unwrap();

    assert_eq!(store.emails_of(rep_id).unwrap(), vec![email]);
    assert_eq!(store.websites_of(rep_id).unwrap().len(), 1);
    assert_eq!(store.addresses_of(rep_id).unwrap()[0].city, "Strasbourg");
    assert_eq!(store.phones_of(rep_id).unwrap()[0].address, Some(address_id));
    assert_eq!(store.list_countries().unwrap(), vec![france]);
}

fn test_contact_for_missing_representative_is_rejected<S: EntityStore>(store: &mut S) {
    let mut email = Email::new(RepresentativeId(7), "ghost@europarl.eu");
    let err = store.save_email(&mut email).unwrap_err();
    assert!(
        matches!(err, StorageError::IntegrityError { .. }),
        "got: {:?}",
        err
    );
    assert!(email.id.is_none());
}

fn test_delete_representative_cascades<S: EntityStore>(store: &mut S) {
    let (group_id, _, mut mandate) = seed_president(store);
    store.save_mandate(&mut mandate).unwrap();
    let rep_id = mandate.representative.id;
    let mut france = Country::new("France", "FR");
    let country_id = store.save_country(&mut france).unwrap();
    let address_id = store
        .save_address(&mut Address::new(rep_id, country_id))
        .unwrap();
    let mut phone = Phone::new(rep_id, "1");
    phone.address = Some(address_id);
    store.save_phone(&mut phone).unwrap();
    store
        .save_email(&mut Email::new(rep_id, "a@b.eu"))
        .unwrap();

    store.delete_representative(rep_id).unwrap();

    for kind in [
        EntityKind::Representative,
        EntityKind::Email,
        EntityKind::Address,
        EntityKind::Phone,
        EntityKind::Mandate,
    ] {
        assert_eq!(store.count(kind).unwrap(), 0, "{kind} left behind");
    }
    assert!(store.get_group(group_id).is_ok());
    assert_eq!(store.count(EntityKind::Country).unwrap(), 1);
    assert!(matches!(
        store.delete_representative(rep_id),
        Err(StorageError::NotFound { .. })
    ));
}

fn test_delete_all_cascades_along_relations<S: EntityStore>(store: &mut S) {
    let (_, _, mut mandate) = seed_president(store);
    store.save_mandate(&mut mandate).unwrap();

    assert_eq!(store.delete_all(EntityKind::Group).unwrap(), 1);
    assert_eq!(store.count(EntityKind::Mandate).unwrap(), 0);
    assert_eq!(store.count(EntityKind::Constituency).unwrap(), 1);
    assert_eq!(store.count(EntityKind::Representative).unwrap(), 1);
}

fn test_activity_counts_explicit_end_dates_only<S: EntityStore>(store: &mut S) {
    let today = date(2024, 7, 15);
    let (group_id, constituency_id, mut mandate) = seed_president(store);
    mandate.end_date = Some(today);
    store.save_mandate(&mut mandate).unwrap();
    assert!(store.group_is_active(group_id, today).unwrap());
    assert!(store.constituency_is_active(constituency_id, today).unwrap());
    assert!(mandate.is_active_on(today));

    mandate.end_date = today.pred_opt();
    store.save_mandate(&mut mandate).unwrap();
    assert!(!store.group_is_active(group_id, today).unwrap());
    assert!(!mandate.is_active_on(today));

    mandate.end_date = None;
    store.save_mandate(&mut mandate).unwrap();
    assert!(mandate.is_active_on(today));
    assert!(!store.group_is_active(group_id, today).unwrap());
    assert!(!store.constituency_is_active(constituency_id, today).unwrap());

    assert!(matches!(
        store.group_is_active(GroupId(999), today),
        Err(StorageError::NotFound { .. })
    ));
}

fn test_fixture_round_trip<S: EntityStore>(store: &mut S) {
    let fixture = r#"[
      {"model": "representatives.mandate", "pk": 10,
       "fields": {"group": 3, "constituency": 4, "representative": 5,
                  "role": "President", "begin_date": "2019-07-02",
                  "end_date": "2024-07-15", "link": "",
                  "fingerprint": "ffffffffffffffffffffffffffffffffffffffff"}},
      {"model": "representatives.group", "pk": 3,
       "fields": {"name": "EPP", "abbreviation": "EPP", "kind": "political",
                  "created": "2015-04-28T04:55:00Z"}},
      {"model": "representatives.constituency", "pk": 4, "fields": {"name": "France"}},
      {"model": "representatives.representative", "pk": 5,
       "fields": {"remote_id": "MEP-12345", "full_name": "Jane Doe", "gender": 1,
                  "birth_date": "1970-01-31", "photo": null, "active": true}},
      {"model": "representatives.country", "pk": 1, "fields": {"name": "France", "code": "FR"}},
      {"model": "representatives.address", "pk": 2,
       "fields": {"representative": 5, "country": 1, "city": "Brussels"}},
      {"model": "representatives.phone", "pk": 8,
       "fields": {"representative": 5, "address": 2, "number": "+32 2 284 21 11"}},
      {"model": "representatives.phone", "pk": 9,
       "fields": {"representative": 5, "address": null, "number": "+33 1"}}
    ]"#;

    let report = load_fixture(store, fixture.as_bytes()).unwrap();
    assert_eq!(report.total(), 8);
    assert_eq!(report.created.get(&EntityKind::Phone), Some(&2));

    let mandate = store
        .find_mandate(&fp(PRESIDENT_MANDATE_FP))
        .unwrap()
        .expect("mandate fingerprint recomputed from loaded relations");
    let rep = store
        .get_representative(mandate.representative.id)
        .unwrap();
    assert_eq!(rep.birth_date, Some(date(1970, 1, 31)));
    assert!(rep.active);
    assert_eq!(store.phones_of(rep.id.unwrap()).unwrap().len(), 2);

    let group = store.get_group(mandate.group.as_ref().unwrap().id).unwrap();
    assert_eq!(
        group.timestamps.created.map(|t| t.to_rfc3339()),
        Some("2015-04-28T04:55:00+00:00".to_string())
    );

    // Reloading merges every record into the entity it produced before.
    let counts = |store: &S| {
        [
            EntityKind::Country,
            EntityKind::Representative,
            EntityKind::Address,
            EntityKind::Phone,
            EntityKind::Group,
            EntityKind::Constituency,
            EntityKind::Mandate,
        ]
        .map(|kind| store.count(kind).unwrap())
    };
    let before = counts(&*store);
    let again = load_fixture(store, fixture.as_bytes()).unwrap();
    assert!(again.created.is_empty(), "created: {:?}", again.created);
    assert_eq!(again.merged.values().sum::<usize>(), 8);
    assert_eq!(counts(&*store), before);
    assert_eq!(store.phones_of(rep.id.unwrap()).unwrap().len(), 2);

    assert_eq!(unload_fixture(store, EntityKind::Representative).unwrap(), 1);
    assert_eq!(store.count(EntityKind::Mandate).unwrap(), 0);
    assert_eq!(store.count(EntityKind::Phone).unwrap(), 0);
}

fn test_failed_fixture_load_leaves_no_trace<S: EntityStore>(store: &mut S) {
    let fixture = r#"[
      {"model": "representatives.country", "pk": 1, "fields": {"name": "France", "code": "FR"}},
      {"model": "representatives.representative", "pk": 5,
       "fields": {"remote_id": "MEP-12345", "full_name": "Jane Doe"}},
      {"model": "representatives.email", "pk": 3,
       "fields": {"representative": 5, "email": "jane@europarl.eu"}},
      {"model": "representatives.mandate", "pk": 10,
       "fields": {"representative": 5, "role": "Member"}}
    ]"#;

    let err = load_fixture(store, fixture.as_bytes()).unwrap_err();
    assert!(err.is_missing_dependency(), "got: {:?}", err);
    for kind in [
        EntityKind::Country,
        EntityKind::Representative,
        EntityKind::Email,
        EntityKind::Mandate,
    ] {
        assert_eq!(store.count(kind).unwrap(), 0, "{kind}");
    }

    // The store stays usable and ids are not burned by the failed load.
    let rep = seed_rep(store, "MEP-12345");
    assert_eq!(rep.id, Some(RepresentativeId(1)));
}

fn test_atomically_undoes_every_write_on_error<S: EntityStore>(store: &mut S) {
    seed_rep(store, "MEP-1");

    let err = store
        .atomically(|store| {
            seed_rep(store, "MEP-2");
            let mut group = Group::new("EPP", "EPP", "political");
            store.save_group(&mut group)?;
            let mut twin = Representative::new("MEP-1", "Twin");
            store.save_representative(&mut twin)
        })
        .unwrap_err();

    assert!(matches!(err, StorageError::FingerprintCollision { .. }));
    assert_eq!(store.count(EntityKind::Representative).unwrap(), 1);
    assert_eq!(store.count(EntityKind::Group).unwrap(), 0);

    let kept = store
        .atomically(|store| {
            let mut group = Group::new("EPP", "EPP", "political");
            store.save_group(&mut group)
        })
        .unwrap();
    assert_eq!(store.get_group(kept).unwrap().fingerprint, Some(fp(EPP_FP)));
}

fn test_restamp_overwrites_given_instants<S: EntityStore>(store: &mut S) {
    let rep = seed_rep(store, "MEP-1");
    let id = rep.id.unwrap();
    let saved_updated = rep.timestamps.updated;
    let created = chrono::DateTime::parse_from_rfc3339("2015-04-28T04:55:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);

    store
        .restamp(
            EntityKind::Representative,
            id.0,
            Timestamps {
                created: Some(created),
                updated: None,
            },
        )
        .unwrap();
    let loaded = store.get_representative(id).unwrap();
    assert_eq!(loaded.timestamps.created, Some(created));
    assert_eq!(loaded.timestamps.updated, saved_updated);

    match store
        .restamp(EntityKind::Email, 404, Timestamps::default())
        .unwrap_err()
    {
        StorageError::NotFound { entity, id } => {
            assert_eq!(entity, EntityKind::Email);
            assert_eq!(id, 404);
        }
        other => panic!("expected NotFound, got: {:?}", other),
    }
}

macro_rules! backend_tests {
    ($backend:ident, $make:expr, [$($check:ident),* $(,)?]) => {
        mod $backend {
            use super::*;

            $(
                #[test]
                fn $check() {
                    let mut store = $make;
                    super::$check(&mut store);
                }
            )*
        }
    };
}

macro_rules! all_backends {
    ($($check:ident),* $(,)?) => {
        backend_tests!(memory, InMemoryStore::new(), [$($check),*]);
        backend_tests!(sqlite, SqliteStore::in_memory().unwrap(), [$($check),*]);
    };
}

all_backends!(
    test_save_assigns_id_fingerprint_and_timestamps,
    test_update_refreshes_fingerprint_and_keeps_created,
    test_duplicate_fingerprint_is_rejected,
    test_identical_groups_collide,
    test_update_of_unknown_id_is_not_found,
    test_mandate_hashes_stored_relation_fingerprints,
    test_stale_relation_fingerprint_is_replaced,
    test_dangling_relation_is_missing_dependency,
    test_absent_optional_relation_is_missing_dependency,
    test_relation_indirection,
    test_contacts_belong_to_representative,
    test_contact_for_missing_representative_is_rejected,
    test_delete_representative_cascades,
    test_delete_all_cascades_along_relations,
    test_activity_counts_explicit_end_dates_only,
    test_fixture_round_trip,
    test_failed_fixture_load_leaves_no_trace,
    test_atomically_undoes_every_write_on_error,
    test_restamp_overwrites_given_instants,
);

// ---------------------------------------------------------------------------
// On-disk SQLite
// ---------------------------------------------------------------------------

#[test]
fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("representatives.db");
    let path = path.to_str().unwrap();

    let (mandate_id, created) = {
        let mut store = SqliteStore::new(path).unwrap();
        let (_, _, mut mandate) = seed_president(&mut store);
        let id = store.save_mandate(&mut mandate).unwrap();
        (id, mandate.timestamps.created)
    };

    let store = SqliteStore::new(path).unwrap();
    assert_eq!(
        store.schema_version().unwrap(),
        representatives_storage::schema::latest_version()
    );
    let mandate = store.get_mandate(mandate_id).unwrap();
    assert_eq!(mandate.fingerprint, Some(fp(PRESIDENT_MANDATE_FP)));
    assert_eq!(mandate.timestamps.created, created);
    assert_eq!(mandate.begin_date, Some(date(2019, 7, 2)));
}

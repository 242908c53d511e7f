//! Fixture loading and unloading.
//!
//! A fixture is a JSON array of records in the dump format of the
//! representatives app:
//!
//! ```json
//! [{"model": "representatives.group", "pk": 3,
//!   "fields": {"name": "EPP", "abbreviation": "EPP", "kind": "political"}}]
//! ```
//!
//! Records are saved through the regular [`EntityStore`] save path, so every
//! hashable record is fingerprinted exactly as an interactive save would be.
//! A `fingerprint` field in the file is ignored and recomputed.
//!
//! Relation fields hold fixture primary keys. The loader builds a
//! dependency graph over the records and saves them in topological order,
//! so a referenced entity always carries its final fingerprint before
//! anything that hashes it is saved. A reference to a pk that is not in the
//! file is taken to be a store id and must exist there.
//!
//! Reloading a fixture is idempotent. A hashable record whose fingerprint
//! already belongs to a stored entity is merged into that entity. A record
//! without a fingerprint is merged into a stored entity of the same owner
//! with identical content. `created` and `updated` values in the file are
//! kept.
//!
//! The whole load is one unit of work: if any record fails, the store is
//! left as it was.

use std::collections::{HashMap, VecDeque};
use std::io::Read;

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use representatives_core::{
    Address, AddressId, Constituency, ConstituencyId, Country, CountryId, Email, EmailId, Entity,
    EntityKind, Fingerprint, Group, GroupId, Mandate, MandateId, Phone, PhoneId, Representative,
    RepresentativeId, Timestamps, WebSite, WebSiteId,
};

use crate::error::StorageError;
use crate::traits::EntityStore;

/// One record of a fixture file.
#[derive(Debug, Clone, Deserialize)]
struct Record {
    model: String,
    pk: i64,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// A relation field of a fixture record.
struct Reference {
    field: &'static str,
    target: EntityKind,
    nullable: bool,
}

const fn required(field: &'static str, target: EntityKind) -> Reference {
    Reference {
        field,
        target,
        nullable: false,
    }
}

const fn optional(field: &'static str, target: EntityKind) -> Reference {
    Reference {
        field,
        target,
        nullable: true,
    }
}

const CONTACT_REFERENCES: &[Reference] = &[required("representative", EntityKind::Representative)];

const ADDRESS_REFERENCES: &[Reference] = &[
    required("representative", EntityKind::Representative),
    required("country", EntityKind::Country),
];

const PHONE_REFERENCES: &[Reference] = &[
    required("representative", EntityKind::Representative),
    optional("address", EntityKind::Address),
];

const MANDATE_REFERENCES: &[Reference] = &[
    optional("group", EntityKind::Group),
    optional("constituency", EntityKind::Constituency),
    required("representative", EntityKind::Representative),
];

/// Relation fields of each entity kind.
fn references(kind: EntityKind) -> &'static [Reference] {
    match kind {
        EntityKind::Email | EntityKind::WebSite => CONTACT_REFERENCES,
        EntityKind::Address => ADDRESS_REFERENCES,
        EntityKind::Phone => PHONE_REFERENCES,
        EntityKind::Mandate => MANDATE_REFERENCES,
        EntityKind::Country
        | EntityKind::Representative
        | EntityKind::Group
        | EntityKind::Constituency => &[],
    }
}

/// Outcome of a fixture load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixtureReport {
    /// Newly inserted entities per kind, in the order kinds were first saved.
    pub created: IndexMap<EntityKind, usize>,
    /// Records merged into an entity already stored, by fingerprint for
    /// hashable kinds and by content otherwise.
    pub merged: IndexMap<EntityKind, usize>,
}

impl FixtureReport {
    /// Number of records saved.
    pub fn total(&self) -> usize {
        self.created.values().sum::<usize>() + self.merged.values().sum::<usize>()
    }

    fn record(&mut self, kind: EntityKind, merged: bool) {
        let counts = if merged {
            &mut self.merged
        } else {
            &mut self.created
        };
        *counts.entry(kind).or_insert(0) += 1;
    }
}

fn fixture_error(reason: impl Into<String>) -> StorageError {
    StorageError::Fixture {
        reason: reason.into(),
    }
}

/// Loads every record of the fixture in `reader` into `store`.
///
/// Stops at the first failing record and undoes every save made before it.
pub fn load_fixture<S, R>(store: &mut S, reader: R) -> Result<FixtureReport, StorageError>
where
    S: EntityStore,
    R: Read,
{
    let records: Vec<Record> = serde_json::from_reader(reader)?;
    let kinds = records
        .iter()
        .map(|r| {
            EntityKind::from_model_label(&r.model)
                .map_err(|e| fixture_error(format!("{} pk={}: {e}", r.model, r.pk)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let order = load_order(store, &records, &kinds)?;
    debug!(records = records.len(), "fixture load order resolved");

    let report = store.atomically(|store| {
        let mut store_ids: HashMap<(EntityKind, i64), i64> = HashMap::new();
        let mut report = FixtureReport::default();
        for idx in order {
            let record = &records[idx];
            let kind = kinds[idx];
            let (fields, timestamps) = remap_fields(kind, record, &store_ids)?;
            let (id, merged) = save_record(store, kind, record.pk, fields)?;
            if timestamps != Timestamps::default() {
                store.restamp(kind, id, timestamps)?;
            }
            store_ids.insert((kind, record.pk), id);
            report.record(kind, merged);
        }
        Ok(report)
    })?;

    info!(
        total = report.total(),
        created = ?report.created,
        merged = ?report.merged,
        "loaded fixture"
    );
    Ok(report)
}

/// Deletes every entity of `kind`, cascading along relations.
///
/// Returns the number of `kind` entities removed.
pub fn unload_fixture<S>(store: &mut S, kind: EntityKind) -> Result<usize, StorageError>
where
    S: EntityStore + ?Sized,
{
    let removed = store.delete_all(kind)?;
    info!(entity = %kind, removed, "unloaded fixture");
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Orders records so every record comes after the records it references.
///
/// Kahn's algorithm seeded in file order, so independent records keep
/// their relative order.
fn load_order<S: EntityStore + ?Sized>(
    store: &S,
    records: &[Record],
    kinds: &[EntityKind],
) -> Result<Vec<usize>, StorageError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(records.len(), records.len());
    let nodes: Vec<NodeIndex> = (0..records.len()).map(|i| graph.add_node(i)).collect();

    let mut by_pk: HashMap<(EntityKind, i64), usize> = HashMap::new();
    for (idx, (record, kind)) in records.iter().zip(kinds).enumerate() {
        if by_pk.insert((*kind, record.pk), idx).is_some() {
            return Err(fixture_error(format!(
                "duplicate record {} pk={}",
                record.model, record.pk
            )));
        }
    }

    for (idx, (record, kind)) in records.iter().zip(kinds).enumerate() {
        for reference in references(*kind) {
            let Some(pk) = reference_pk(record, reference)? else {
                continue;
            };
            match by_pk.get(&(reference.target, pk)) {
                Some(&dep) => {
                    graph.add_edge(nodes[dep], nodes[idx], ());
                }
                None if exists(store, reference.target, pk)? => {}
                None => {
                    return Err(fixture_error(format!(
                        "{} pk={}: {} references missing {} {pk}",
                        record.model, record.pk, reference.field, reference.target
                    )));
                }
            }
        }
    }

    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.edges_directed(n, Direction::Incoming).count())
        .collect();
    let mut queue: VecDeque<NodeIndex> = nodes
        .iter()
        .copied()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();

    let mut sorted = Vec::with_capacity(records.len());
    while let Some(node) = queue.pop_front() {
        sorted.push(graph[node]);
        for edge in graph.edges_directed(node, Direction::Outgoing) {
            let target = edge.target();
            in_degree[target.index()] -= 1;
            if in_degree[target.index()] == 0 {
                queue.push_back(target);
            }
        }
    }

    if sorted.len() != records.len() {
        return Err(fixture_error("cycle detected between fixture records"));
    }
    Ok(sorted)
}

/// The fixture pk held by a relation field, if set.
fn reference_pk(record: &Record, reference: &Reference) -> Result<Option<i64>, StorageError> {
    match record.fields.get(reference.field) {
        None | Some(Value::Null) if reference.nullable => Ok(None),
        None | Some(Value::Null) => Err(fixture_error(format!(
            "{} pk={}: missing required relation {}",
            record.model, record.pk, reference.field
        ))),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            fixture_error(format!(
                "{} pk={}: relation {} must be a primary key, got {value}",
                record.model, record.pk, reference.field
            ))
        }),
    }
}

/// Whether `store` holds an entity of `kind` with surrogate id `id`.
fn exists<S: EntityStore + ?Sized>(
    store: &S,
    kind: EntityKind,
    id: i64,
) -> Result<bool, StorageError> {
    let found = match kind {
        EntityKind::Country => store.get_country(CountryId(id)).map(drop),
        EntityKind::Representative => store.get_representative(RepresentativeId(id)).map(drop),
        EntityKind::Email => store.get_email(EmailId(id)).map(drop),
        EntityKind::WebSite => store.get_website(WebSiteId(id)).map(drop),
        EntityKind::Address => store.get_address(AddressId(id)).map(drop),
        EntityKind::Phone => store.get_phone(PhoneId(id)).map(drop),
        EntityKind::Group => store.get_group(GroupId(id)).map(drop),
        EntityKind::Constituency => store.get_constituency(ConstituencyId(id)).map(drop),
        EntityKind::Mandate => store.get_mandate(MandateId(id)).map(drop),
    };
    match found {
        Ok(()) => Ok(true),
        Err(StorageError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Saving
// ---------------------------------------------------------------------------

/// Rewrites relation fields from fixture pks to store ids, in the shape the
/// entity type deserializes, and takes out the dumped timestamps.
fn remap_fields(
    kind: EntityKind,
    record: &Record,
    store_ids: &HashMap<(EntityKind, i64), i64>,
) -> Result<(Map<String, Value>, Timestamps), StorageError> {
    let mut fields = record.fields.clone();
    fields.remove("id");
    fields.remove("fingerprint");
    let timestamps = Timestamps {
        created: dumped_instant(record, "created", fields.remove("created"))?,
        updated: dumped_instant(record, "updated", fields.remove("updated"))?,
    };

    for reference in references(kind) {
        let Some(pk) = fields.get(reference.field).and_then(Value::as_i64) else {
            continue;
        };
        let id = store_ids
            .get(&(reference.target, pk))
            .copied()
            .unwrap_or(pk);
        // Mandate relations carry a resolvable fingerprint alongside the id.
        let value = if kind == EntityKind::Mandate {
            json!({ "id": id })
        } else {
            json!(id)
        };
        fields.insert(reference.field.to_string(), value);
    }
    Ok((fields, timestamps))
}

/// Parses a dumped `created`/`updated` value. Dumps made without time zone
/// support hold naive instants, read as UTC.
fn dumped_instant(
    record: &Record,
    field: &str,
    value: Option<Value>,
) -> Result<Option<DateTime<Utc>>, StorageError> {
    let raw = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(raw)) => raw,
        Some(other) => {
            return Err(fixture_error(format!(
                "{} pk={}: {field} must be a timestamp, got {other}",
                record.model, record.pk
            )))
        }
    };
    DateTime::parse_from_rfc3339(&raw)
        .map(|instant| instant.with_timezone(&Utc))
        .or_else(|_| raw.parse::<NaiveDateTime>().map(|naive| naive.and_utc()))
        .map(Some)
        .map_err(|e| {
            fixture_error(format!(
                "{} pk={}: {field} {raw:?}: {e}",
                record.model, record.pk
            ))
        })
}

fn decode<E: DeserializeOwned>(
    kind: EntityKind,
    pk: i64,
    fields: Map<String, Value>,
) -> Result<E, StorageError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| fixture_error(format!("{kind} pk={pk}: {e}")))
}

/// An entity without a fingerprint, compared by content.
trait Content: Entity + Clone + PartialEq {
    /// The entity with its surrogate id and timestamps cleared.
    fn content(&self) -> Self;
}

impl Content for Country {
    fn content(&self) -> Self {
        Country {
            id: None,
            ..self.clone()
        }
    }
}

macro_rules! timestamped_content {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Content for $ty {
                fn content(&self) -> Self {
                    $ty {
                        id: None,
                        timestamps: Timestamps::default(),
                        ..self.clone()
                    }
                }
            }
        )*
    };
}

timestamped_content!(Email, WebSite, Address, Phone);

/// Saves a hashable entity, merging it into the stored entity that already
/// holds its fingerprint.
fn save_or_merge<S: EntityStore + ?Sized, E: Entity>(
    store: &mut S,
    mut entity: E,
    save: fn(&mut S, &mut E) -> Result<E::Id, StorageError>,
    find: fn(&S, &Fingerprint) -> Result<Option<E>, StorageError>,
) -> Result<(i64, bool), StorageError> {
    match save(store, &mut entity) {
        Ok(id) => Ok((id.into(), false)),
        Err(StorageError::FingerprintCollision {
            entity: kind,
            fingerprint,
        }) => {
            let holder = find(store, &fingerprint)?.and_then(|stored| stored.id());
            let Some(holder) = holder else {
                return Err(StorageError::FingerprintCollision {
                    entity: kind,
                    fingerprint,
                });
            };
            debug!(entity = %kind, %fingerprint, id = %holder, "merging fixture record");
            entity.set_id(holder);
            let id = save(store, &mut entity)?;
            Ok((id.into(), true))
        }
        Err(e) => Err(e),
    }
}

/// Saves an entity without a fingerprint, merging it into the first of
/// `siblings` with the same content.
fn save_or_reuse<S: EntityStore + ?Sized, E: Content>(
    store: &mut S,
    mut entity: E,
    siblings: Vec<E>,
    save: fn(&mut S, &mut E) -> Result<E::Id, StorageError>,
) -> Result<(i64, bool), StorageError> {
    let content = entity.content();
    let twin = siblings
        .iter()
        .filter(|stored| stored.content() == content)
        .find_map(|stored| stored.id());
    if let Some(id) = twin {
        debug!(entity = %E::KIND, %id, "merging fixture record");
        entity.set_id(id);
    }
    let id = save(store, &mut entity)?;
    Ok((id.into(), twin.is_some()))
}

/// Saves one record and returns its store id and whether it was merged
/// into an entity already stored.
fn save_record<S: EntityStore + ?Sized>(
    store: &mut S,
    kind: EntityKind,
    pk: i64,
    fields: Map<String, Value>,
) -> Result<(i64, bool), StorageError> {
    match kind {
        EntityKind::Country => {
            let country: Country = decode(kind, pk, fields)?;
            let siblings = store.list_countries()?;
            save_or_reuse(store, country, siblings, S::save_country)
        }
        EntityKind::Representative => {
            let rep: Representative = decode(kind, pk, fields)?;
            save_or_merge(store, rep, S::save_representative, S::find_representative)
        }
        EntityKind::Email => {
            let email: Email = decode(kind, pk, fields)?;
            let siblings = store.emails_of(email.representative)?;
            save_or_reuse(store, email, siblings, S::save_email)
        }
        EntityKind::WebSite => {
            let website: WebSite = decode(kind, pk, fields)?;
            let siblings = store.websites_of(website.representative)?;
            save_or_reuse(store, website, siblings, S::save_website)
        }
        EntityKind::Address => {
            let address: Address = decode(kind, pk, fields)?;
            let siblings = store.addresses_of(address.representative)?;
            save_or_reuse(store, address, siblings, S::save_address)
        }
        EntityKind::Phone => {
            let phone: Phone = decode(kind, pk, fields)?;
            let siblings = store.phones_of(phone.representative)?;
            save_or_reuse(store, phone, siblings, S::save_phone)
        }
        EntityKind::Group => {
            let group: Group = decode(kind, pk, fields)?;
            save_or_merge(store, group, S::save_group, S::find_group)
        }
        EntityKind::Constituency => {
            let constituency: Constituency = decode(kind, pk, fields)?;
            save_or_merge(store, constituency, S::save_constituency, S::find_constituency)
        }
        EntityKind::Mandate => {
            let mandate: Mandate = decode(kind, pk, fields)?;
            save_or_merge(store, mandate, S::save_mandate, S::find_mandate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    fn load(store: &mut InMemoryStore, json: &str) -> Result<FixtureReport, StorageError> {
        load_fixture(store, json.as_bytes())
    }

    #[test]
    fn records_load_in_dependency_order() {
        let mut store = InMemoryStore::new();
        // The mandate comes first in the file but depends on everything else.
        let report = load(
            &mut store,
            r#"[
              {"model": "representatives.mandate", "pk": 1,
               "fields": {"group": 7, "constituency": 2, "representative": 5, "role": "Member"}},
              {"model": "representatives.group", "pk": 7,
               "fields": {"name": "EPP", "abbreviation": "EPP", "kind": "political"}},
              {"model": "representatives.constituency", "pk": 2, "fields": {"name": "France"}},
              {"model": "representatives.representative", "pk": 5,
               "fields": {"remote_id": "MEP-1", "full_name": "A B"}}
            ]"#,
        )
        .unwrap();

        let kinds: Vec<_> = report.created.keys().copied().collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::Group,
                EntityKind::Constituency,
                EntityKind::Representative,
                EntityKind::Mandate
            ]
        );
        assert_eq!(report.total(), 4);
        assert_eq!(store.count(EntityKind::Mandate).unwrap(), 1);
    }

    #[test]
    fn file_fingerprints_are_recomputed() {
        let mut store = InMemoryStore::new();
        load(
            &mut store,
            r#"[{"model": "representatives.representative", "pk": 1,
                 "fields": {"remote_id": "MEP-12345", "full_name": "X",
                            "fingerprint": "0000000000000000000000000000000000000000"}}]"#,
        )
        .unwrap();
        let rep = store.get_representative(RepresentativeId(1)).unwrap();
        assert_eq!(
            rep.fingerprint.unwrap().as_str(),
            "654fdf6a3018c3fe38ee3f66227d301c6a7dd8fa"
        );
    }

    #[test]
    fn duplicate_pks_are_rejected() {
        let mut store = InMemoryStore::new();
        let err = load(
            &mut store,
            r#"[{"model": "representatives.group", "pk": 1, "fields": {"name": "EPP"}},
                {"model": "representatives.group", "pk": 1, "fields": {"name": "S&D"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Fixture { .. }));
        assert_eq!(store.count(EntityKind::Group).unwrap(), 0);
    }

    #[test]
    fn dangling_reference_is_a_fixture_error() {
        let mut store = InMemoryStore::new();
        let err = load(
            &mut store,
            r#"[{"model": "representatives.email", "pk": 1,
                 "fields": {"representative": 99, "email": "a@b.eu"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Fixture { .. }));
        assert_eq!(store.count(EntityKind::Email).unwrap(), 0);
    }

    #[test]
    fn unknown_model_is_a_fixture_error() {
        let mut store = InMemoryStore::new();
        let err = load(
            &mut store,
            r#"[{"model": "auth.user", "pk": 1, "fields": {}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Fixture { .. }));
    }

    const FEED: &str = r#"[
      {"model": "representatives.representative", "pk": 1,
       "fields": {"remote_id": "MEP-1", "full_name": "A B"}},
      {"model": "representatives.constituency", "pk": 1, "fields": {"name": "France"}},
      {"model": "representatives.country", "pk": 1, "fields": {"name": "France", "code": "FR"}},
      {"model": "representatives.email", "pk": 1,
       "fields": {"representative": 1, "email": "a@b.eu", "kind": "official"}},
      {"model": "representatives.address", "pk": 1,
       "fields": {"representative": 1, "country": 1, "city": "Brussels"}},
      {"model": "representatives.phone", "pk": 1,
       "fields": {"representative": 1, "address": 1, "number": "+32 2"}}
    ]"#;

    const FEED_KINDS: [EntityKind; 6] = [
        EntityKind::Representative,
        EntityKind::Constituency,
        EntityKind::Country,
        EntityKind::Email,
        EntityKind::Address,
        EntityKind::Phone,
    ];

    #[test]
    fn reloading_is_idempotent() {
        let mut store = InMemoryStore::new();
        load(&mut store, FEED).unwrap();
        let second = load(&mut store, FEED).unwrap();

        assert!(second.created.is_empty(), "created: {:?}", second.created);
        assert_eq!(second.total(), 6);
        for kind in FEED_KINDS {
            assert_eq!(store.count(kind).unwrap(), 1, "{kind}");
        }
    }

    #[test]
    fn changed_contact_is_added_next_to_the_stored_one() {
        let mut store = InMemoryStore::new();
        load(&mut store, FEED).unwrap();
        let report = load(&mut store, &FEED.replace("a@b.eu", "c@d.eu")).unwrap();

        assert_eq!(report.created.get(&EntityKind::Email), Some(&1));
        assert_eq!(report.merged.get(&EntityKind::Representative), Some(&1));
        assert_eq!(store.count(EntityKind::Email).unwrap(), 2);
    }

    #[test]
    fn failed_load_leaves_store_untouched() {
        let mut store = InMemoryStore::new();
        let err = load(
            &mut store,
            r#"[
              {"model": "representatives.country", "pk": 1, "fields": {"name": "France", "code": "FR"}},
              {"model": "representatives.representative", "pk": 5,
               "fields": {"remote_id": "MEP-1", "full_name": "A B"}},
              {"model": "representatives.mandate", "pk": 1,
               "fields": {"representative": 5, "role": "Member"}}
            ]"#,
        )
        .unwrap_err();

        assert!(err.is_missing_dependency(), "got: {:?}", err);
        assert_eq!(store.count(EntityKind::Country).unwrap(), 0);
        assert_eq!(store.count(EntityKind::Representative).unwrap(), 0);
    }

    #[test]
    fn dumped_timestamps_are_kept() {
        let mut store = InMemoryStore::new();
        load(
            &mut store,
            r#"[
              {"model": "representatives.representative", "pk": 1,
               "fields": {"remote_id": "MEP-1", "full_name": "A B",
                          "created": "2015-04-28T04:55:00.123Z",
                          "updated": "2015-05-01T12:00:00"}},
              {"model": "representatives.email", "pk": 1,
               "fields": {"representative": 1, "email": "a@b.eu"}}
            ]"#,
        )
        .unwrap();

        let rep = store.get_representative(RepresentativeId(1)).unwrap();
        assert_eq!(
            rep.timestamps.created.map(|t| t.to_rfc3339()),
            Some("2015-04-28T04:55:00.123+00:00".to_string())
        );
        assert_eq!(
            rep.timestamps.updated.map(|t| t.to_rfc3339()),
            Some("2015-05-01T12:00:00+00:00".to_string())
        );

        // Records without dumped timestamps are stamped at load time.
        let email = store.get_email(EmailId(1)).unwrap();
        assert!(email.timestamps.created.unwrap() > rep.timestamps.updated.unwrap());
    }

    #[test]
    fn malformed_timestamp_is_a_fixture_error() {
        let mut store = InMemoryStore::new();
        let err = load(
            &mut store,
            r#"[{"model": "representatives.constituency", "pk": 1,
                 "fields": {"name": "France", "created": "yesterday"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Fixture { .. }));
        assert_eq!(store.count(EntityKind::Constituency).unwrap(), 0);
    }

    #[test]
    fn unload_removes_every_entity_of_kind() {
        let mut store = InMemoryStore::new();
        load(
            &mut store,
            r#"[{"model": "representatives.country", "pk": 1, "fields": {"name": "France", "code": "FR"}},
                {"model": "representatives.country", "pk": 2, "fields": {"name": "Belgium", "code": "BE"}}]"#,
        )
        .unwrap();
        assert_eq!(unload_fixture(&mut store, EntityKind::Country).unwrap(), 2);
        assert_eq!(store.count(EntityKind::Country).unwrap(), 0);
    }
}

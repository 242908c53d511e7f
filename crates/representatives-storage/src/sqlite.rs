//! SQLite implementation of [`EntityStore`].
//!
//! [`SqliteStore`] persists the representatives model in a SQLite database
//! with WAL mode, foreign keys with `ON DELETE CASCADE`, and automatic schema
//! migrations. Every save runs inside one savepoint: relation resolution,
//! the fingerprint hook, the uniqueness probe and the write either all
//! happen or none do. Savepoints nest, so saves made inside
//! [`EntityStore::atomically`] commit or roll back with the whole unit.
//!
//! Saves use a single upsert per entity (`INSERT .. ON CONFLICT(id) DO
//! UPDATE .. RETURNING`) so inserts and updates share their column lists;
//! `created` is never overwritten by an update.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use representatives_core::{
    Address, AddressId, Constituency, CoreError, ConstituencyId, Country, CountryId, Email, EmailId, Entity,
    EntityKind, Fingerprint, Gender, Group, GroupId, Mandate, MandateId, Phone, PhoneId, Related,
    Representative, RepresentativeId, Timestamped, Timestamps, WebSite, WebSiteId,
};

use crate::error::StorageError;
use crate::save::{resolve_mandate, stage_hashable, stage_plain, FingerprintLookup};
use crate::traits::EntityStore;

/// Table holding entities of `kind`.
fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Country => "representatives_country",
        EntityKind::Representative => "representatives_representative",
        EntityKind::Email => "representatives_email",
        EntityKind::WebSite => "representatives_website",
        EntityKind::Address => "representatives_address",
        EntityKind::Phone => "representatives_phone",
        EntityKind::Group => "representatives_group",
        EntityKind::Constituency => "representatives_constituency",
        EntityKind::Mandate => "representatives_mandate",
    }
}

// ---------------------------------------------------------------------------
// Column lists and row decoding
// ---------------------------------------------------------------------------

const COUNTRY_COLUMNS: &str = "id, name, code";

const REPRESENTATIVE_COLUMNS: &str = "id, fingerprint, created, updated, slug, remote_id, \
     first_name, last_name, full_name, gender, birth_place, birth_date, cv, photo, active";

const EMAIL_COLUMNS: &str = "id, created, updated, representative_id, email, kind";

const WEBSITE_COLUMNS: &str = "id, created, updated, representative_id, url, kind";

const ADDRESS_COLUMNS: &str = "id, created, updated, representative_id, country_id, city, \
     street, number, postcode, floor, office_number, kind, name, location";

const PHONE_COLUMNS: &str = "id, created, updated, representative_id, number, kind, address_id";

const GROUP_COLUMNS: &str = "id, fingerprint, created, updated, name, abbreviation, kind";

const CONSTITUENCY_COLUMNS: &str = "id, fingerprint, created, updated, name";

/// Mandates are always read with their relations' current fingerprints.
const MANDATE_SELECT: &str = "SELECT m.id, m.fingerprint, m.created, m.updated, \
     m.group_id, g.fingerprint, m.constituency_id, c.fingerprint, \
     m.representative_id, r.fingerprint, m.role, m.begin_date, m.end_date, m.link \
     FROM representatives_mandate m \
     LEFT JOIN representatives_group g ON g.id = m.group_id \
     LEFT JOIN representatives_constituency c ON c.id = m.constituency_id \
     JOIN representatives_representative r ON r.id = m.representative_id";

fn conversion_error(idx: usize, ty: Type, err: CoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn fingerprint_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Fingerprint> {
    let raw: String = row.get(idx)?;
    Fingerprint::parse(&raw).map_err(|e| conversion_error(idx, Type::Text, e))
}

fn opt_fingerprint_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Fingerprint>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Fingerprint::parse(&s).map_err(|e| conversion_error(idx, Type::Text, e)))
        .transpose()
}

fn timestamps_at(row: &Row<'_>, created: usize) -> rusqlite::Result<Timestamps> {
    Ok(Timestamps {
        created: Some(row.get(created)?),
        updated: Some(row.get(created + 1)?),
    })
}

fn related_at<I: From<i64>>(
    row: &Row<'_>,
    id_idx: usize,
) -> rusqlite::Result<Option<Related<I>>> {
    let id: Option<i64> = row.get(id_idx)?;
    let fingerprint = opt_fingerprint_at(row, id_idx + 1)?;
    Ok(id.map(|id| match fingerprint {
        Some(fp) => Related::resolved(I::from(id), fp),
        None => Related::new(I::from(id)),
    }))
}

fn country_from_row(row: &Row<'_>) -> rusqlite::Result<Country> {
    Ok(Country {
        id: Some(CountryId(row.get(0)?)),
        name: row.get(1)?,
        code: row.get(2)?,
    })
}

fn representative_from_row(row: &Row<'_>) -> rusqlite::Result<Representative> {
    let gender_code: i64 = row.get(9)?;
    let gender =
        Gender::from_code(gender_code).map_err(|e| conversion_error(9, Type::Integer, e))?;
    Ok(Representative {
        id: Some(RepresentativeId(row.get(0)?)),
        fingerprint: Some(fingerprint_at(row, 1)?),
        timestamps: timestamps_at(row, 2)?,
        slug: row.get(4)?,
        remote_id: row.get(5)?,
        first_name: row.get(6)?,
        last_name: row.get(7)?,
        full_name: row.get(8)?,
        gender,
        birth_place: row.get(10)?,
        birth_date: row.get(11)?,
        cv: row.get(12)?,
        photo: row.get(13)?,
        active: row.get(14)?,
    })
}

fn email_from_row(row: &Row<'_>) -> rusqlite::Result<Email> {
    Ok(Email {
        id: Some(EmailId(row.get(0)?)),
        timestamps: timestamps_at(row, 1)?,
        representative: RepresentativeId(row.get(3)?),
        email: row.get(4)?,
        kind: row.get(5)?,
    })
}

fn website_from_row(row: &Row<'_>) -> rusqlite::Result<WebSite> {
    Ok(WebSite {
        id: Some(WebSiteId(row.get(0)?)),
        timestamps: timestamps_at(row, 1)?,
        representative: RepresentativeId(row.get(3)?),
        url: row.get(4)?,
        kind: row.get(5)?,
    })
}

fn address_from_row(row: &Row<'_>) -> rusqlite::Result<Address> {
    Ok(Address {
        id: Some(AddressId(row.get(0)?)),
        timestamps: timestamps_at(row, 1)?,
        representative: RepresentativeId(row.get(3)?),
        country: CountryId(row.get(4)?),
        city: row.get(5)?,
        street: row.get(6)?,
        number: row.get(7)?,
        postcode: row.get(8)?,
        floor: row.get(9)?,
        office_number: row.get(10)?,
        kind: row.get(11)?,
        name: row.get(12)?,
        location: row.get(13)?,
    })
}

fn phone_from_row(row: &Row<'_>) -> rusqlite::Result<Phone> {
    let address: Option<i64> = row.get(6)?;
    Ok(Phone {
        id: Some(PhoneId(row.get(0)?)),
        timestamps: timestamps_at(row, 1)?,
        representative: RepresentativeId(row.get(3)?),
        number: row.get(4)?,
        kind: row.get(5)?,
        address: address.map(AddressId),
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: Some(GroupId(row.get(0)?)),
        fingerprint: Some(fingerprint_at(row, 1)?),
        timestamps: timestamps_at(row, 2)?,
        name: row.get(4)?,
        abbreviation: row.get(5)?,
        kind: row.get(6)?,
    })
}

fn constituency_from_row(row: &Row<'_>) -> rusqlite::Result<Constituency> {
    Ok(Constituency {
        id: Some(ConstituencyId(row.get(0)?)),
        fingerprint: Some(fingerprint_at(row, 1)?),
        timestamps: timestamps_at(row, 2)?,
        name: row.get(4)?,
    })
}

fn mandate_from_row(row: &Row<'_>) -> rusqlite::Result<Mandate> {
    let representative_id: i64 = row.get(8)?;
    Ok(Mandate {
        id: Some(MandateId(row.get(0)?)),
        fingerprint: Some(fingerprint_at(row, 1)?),
        timestamps: timestamps_at(row, 2)?,
        group: related_at(row, 4)?,
        constituency: related_at(row, 6)?,
        representative: Related::resolved(
            RepresentativeId(representative_id),
            fingerprint_at(row, 9)?,
        ),
        role: row.get(10)?,
        begin_date: row.get(11)?,
        end_date: row.get(12)?,
        link: row.get(13)?,
    })
}

// ---------------------------------------------------------------------------
// Write helpers
// ---------------------------------------------------------------------------

/// Maps constraint failures to storage integrity errors.
fn write_error(err: rusqlite::Error) -> StorageError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            StorageError::IntegrityError {
                reason: msg.clone().unwrap_or_else(|| e.to_string()),
            }
        }
        _ => StorageError::Sqlite(err),
    }
}

/// Like [`write_error`], but reports a unique-constraint failure on the
/// fingerprint column as a collision.
fn hashable_write_error(
    err: rusqlite::Error,
    kind: EntityKind,
    fingerprint: Option<&Fingerprint>,
) -> StorageError {
    if let (rusqlite::Error::SqliteFailure(e, Some(msg)), Some(fp)) = (&err, fingerprint) {
        if e.code == ErrorCode::ConstraintViolation && msg.contains(".fingerprint") {
            return StorageError::FingerprintCollision {
                entity: kind,
                fingerprint: fp.clone(),
            };
        }
    }
    write_error(err)
}

/// Fails with `NotFound` if `id` is set but not stored.
fn ensure_stored<I: Into<i64>>(
    conn: &Connection,
    kind: EntityKind,
    id: Option<I>,
) -> Result<(), StorageError> {
    let Some(id) = id else {
        return Ok(());
    };
    let id: i64 = id.into();
    if !row_exists(conn, kind, id)? {
        return Err(StorageError::NotFound { entity: kind, id });
    }
    Ok(())
}

fn row_exists(conn: &Connection, kind: EntityKind, id: i64) -> Result<bool, StorageError> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table(kind));
    Ok(conn.query_row(&sql, params![id], |row| row.get(0))?)
}

/// Id of the entity of `kind` holding `fingerprint`, if any.
fn holder_of(
    conn: &Connection,
    kind: EntityKind,
    fingerprint: &Fingerprint,
) -> Result<Option<i64>, StorageError> {
    let sql = format!("SELECT id FROM {} WHERE fingerprint = ?1", table(kind));
    Ok(conn
        .query_row(&sql, params![fingerprint.as_str()], |row| row.get(0))
        .optional()?)
}

/// Decodes the `RETURNING id, created` row of an upsert.
fn returned(row: &Row<'_>) -> rusqlite::Result<(i64, DateTime<Utc>)> {
    Ok((row.get(0)?, row.get(1)?))
}

/// Applies the stored id and creation instant to a committed entity.
fn finish<E: Entity + Timestamped>(
    mut staged: E,
    (id, created): (i64, DateTime<Utc>),
) -> (E::Id, E) {
    let id = E::Id::from(id);
    staged.set_id(id);
    staged.timestamps_mut().created = Some(created);
    (id, staged)
}

impl FingerprintLookup for Connection {
    fn stored_fingerprint(
        &self,
        kind: EntityKind,
        id: i64,
    ) -> Result<Option<Fingerprint>, StorageError> {
        if !kind.is_hashable() {
            return Ok(None);
        }
        let sql = format!("SELECT fingerprint FROM {} WHERE id = ?1", table(kind));
        let raw: Option<String> = self
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?;
        Ok(raw.map(|s| Fingerprint::parse(&s)).transpose()?)
    }
}

/// SQLite-backed implementation of [`EntityStore`].
///
/// Every write operation is wrapped in a savepoint for atomicity.
/// The database uses WAL mode for performance and foreign keys for integrity.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    /// Schema version recorded in the database.
    pub fn schema_version(&self) -> Result<usize, StorageError> {
        crate::schema::schema_version(&self.conn)
    }

    fn query_one<T>(
        &self,
        kind: EntityKind,
        sql: &str,
        id: i64,
        decode: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, StorageError> {
        self.conn
            .query_row(sql, params![id], decode)
            .optional()?
            .ok_or(StorageError::NotFound { entity: kind, id })
    }

    fn query_opt<T>(
        &self,
        sql: &str,
        fingerprint: &Fingerprint,
        decode: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, StorageError> {
        Ok(self
            .conn
            .query_row(sql, params![fingerprint.as_str()], decode)
            .optional()?)
    }

    fn query_many<T>(
        &self,
        sql: &str,
        id: i64,
        decode: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StorageError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![id], decode)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn mandate_is_keeping_active(
        &self,
        kind: EntityKind,
        column: &str,
        id: i64,
        today: NaiveDate,
    ) -> Result<bool, StorageError> {
        ensure_stored(&self.conn, kind, Some(id))?;
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM representatives_mandate WHERE {column} = ?1 AND end_date >= ?2)"
        );
        Ok(self
            .conn
            .query_row(&sql, params![id, today], |row| row.get(0))?)
    }

    fn upsert_representative(
        tx: &Connection,
        rep: &Representative,
    ) -> Result<(i64, DateTime<Utc>), StorageError> {
        tx.query_row(
            "INSERT INTO representatives_representative (id, fingerprint, created, updated, slug, remote_id, first_name, last_name, full_name, gender, birth_place, birth_date, cv, photo, active) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15) \
             ON CONFLICT(id) DO UPDATE SET fingerprint = excluded.fingerprint, updated = excluded.updated, slug = excluded.slug, remote_id = excluded.remote_id, first_name = excluded.first_name, last_name = excluded.last_name, full_name = excluded.full_name, gender = excluded.gender, birth_place = excluded.birth_place, birth_date = excluded.birth_date, cv = excluded.cv, photo = excluded.photo, active = excluded.active \
             RETURNING id, created",
            params![
                rep.id.map(|id| id.0),
                rep.fingerprint.as_ref().map(Fingerprint::as_str),
                rep.timestamps.created,
                rep.timestamps.updated,
                rep.slug,
                rep.remote_id,
                rep.first_name,
                rep.last_name,
                rep.full_name,
                rep.gender.code(),
                rep.birth_place,
                rep.birth_date,
                rep.cv,
                rep.photo,
                rep.active,
            ],
            returned,
        )
        .map_err(|e| {
            hashable_write_error(e, EntityKind::Representative, rep.fingerprint.as_ref())
        })
    }

    fn upsert_mandate(
        tx: &Connection,
        mandate: &Mandate,
    ) -> Result<(i64, DateTime<Utc>), StorageError> {
        tx.query_row(
            "INSERT INTO representatives_mandate (id, fingerprint, created, updated, group_id, constituency_id, representative_id, role, begin_date, end_date, link) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT(id) DO UPDATE SET fingerprint = excluded.fingerprint, updated = excluded.updated, group_id = excluded.group_id, constituency_id = excluded.constituency_id, representative_id = excluded.representative_id, role = excluded.role, begin_date = excluded.begin_date, end_date = excluded.end_date, link = excluded.link \
             RETURNING id, created",
            params![
                mandate.id.map(|id| id.0),
                mandate.fingerprint.as_ref().map(Fingerprint::as_str),
                mandate.timestamps.created,
                mandate.timestamps.updated,
                mandate.group.as_ref().map(|g| g.id.0),
                mandate.constituency.as_ref().map(|c| c.id.0),
                mandate.representative.id.0,
                mandate.role,
                mandate.begin_date,
                mandate.end_date,
                mandate.link,
            ],
            returned,
        )
        .map_err(|e| hashable_write_error(e, EntityKind::Mandate, mandate.fingerprint.as_ref()))
    }
}

impl EntityStore for SqliteStore {
    // -------------------------------------------------------------------
    // Countries
    // -------------------------------------------------------------------

    fn save_country(&mut self, country: &mut Country) -> Result<CountryId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::Country, country.id)?;
        let raw: i64 = tx
            .query_row(
                "INSERT INTO representatives_country (id, name, code) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name, code = excluded.code \
                 RETURNING id",
                params![country.id.map(|id| id.0), country.name, country.code],
                |row| row.get(0),
            )
            .map_err(write_error)?;
        tx.commit()?;
        let id = CountryId(raw);
        country.id = Some(id);
        Ok(id)
    }

    fn get_country(&self, id: CountryId) -> Result<Country, StorageError> {
        let sql = format!("SELECT {COUNTRY_COLUMNS} FROM representatives_country WHERE id = ?1");
        self.query_one(EntityKind::Country, &sql, id.0, country_from_row)
    }

    fn list_countries(&self) -> Result<Vec<Country>, StorageError> {
        let sql = format!("SELECT {COUNTRY_COLUMNS} FROM representatives_country ORDER BY id");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map([], country_from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    // -------------------------------------------------------------------
    // Representatives
    // -------------------------------------------------------------------

    fn save_representative(
        &mut self,
        representative: &mut Representative,
    ) -> Result<RepresentativeId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::Representative, representative.id)?;
        let staged = stage_hashable(&*representative, Utc::now(), |fp| {
            Ok(holder_of(&tx, EntityKind::Representative, fp)?.map(RepresentativeId))
        })?;
        let returned = Self::upsert_representative(&tx, &staged)?;
        tx.commit()?;
        let (id, stored) = finish(staged, returned);
        *representative = stored;
        Ok(id)
    }

    fn get_representative(&self, id: RepresentativeId) -> Result<Representative, StorageError> {
        let sql = format!(
            "SELECT {REPRESENTATIVE_COLUMNS} FROM representatives_representative WHERE id = ?1"
        );
        self.query_one(EntityKind::Representative, &sql, id.0, representative_from_row)
    }

    fn find_representative(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Representative>, StorageError> {
        let sql = format!(
            "SELECT {REPRESENTATIVE_COLUMNS} FROM representatives_representative WHERE fingerprint = ?1"
        );
        self.query_opt(&sql, fingerprint, representative_from_row)
    }

    fn delete_representative(&mut self, id: RepresentativeId) -> Result<(), StorageError> {
        let tx = self.conn.savepoint()?;
        let rows = tx.execute(
            "DELETE FROM representatives_representative WHERE id = ?1",
            params![id.0],
        )?;
        tx.commit()?;
        if rows == 0 {
            return Err(StorageError::NotFound {
                entity: EntityKind::Representative,
                id: id.0,
            });
        }
        tracing::debug!(representative = %id, "deleted representative");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Contacts
    // -------------------------------------------------------------------

    fn save_email(&mut self, email: &mut Email) -> Result<EmailId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::Email, email.id)?;
        let staged = stage_plain(&*email, Utc::now());
        let returned = tx
            .query_row(
                "INSERT INTO representatives_email (id, created, updated, representative_id, email, kind) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(id) DO UPDATE SET updated = excluded.updated, representative_id = excluded.representative_id, email = excluded.email, kind = excluded.kind \
                 RETURNING id, created",
                params![
                    staged.id.map(|id| id.0),
                    staged.timestamps.created,
                    staged.timestamps.updated,
                    staged.representative.0,
                    staged.email,
                    staged.kind,
                ],
                returned,
            )
            .map_err(write_error)?;
        tx.commit()?;
        let (id, stored) = finish(staged, returned);
        *email = stored;
        Ok(id)
    }

    fn get_email(&self, id: EmailId) -> Result<Email, StorageError> {
        let sql = format!("SELECT {EMAIL_COLUMNS} FROM representatives_email WHERE id = ?1");
        self.query_one(EntityKind::Email, &sql, id.0, email_from_row)
    }

    fn emails_of(&self, representative: RepresentativeId) -> Result<Vec<Email>, StorageError> {
        let sql = format!(
            "SELECT {EMAIL_COLUMNS} FROM representatives_email WHERE representative_id = ?1 ORDER BY id"
        );
        self.query_many(&sql, representative.0, email_from_row)
    }

    fn save_website(&mut self, website: &mut WebSite) -> Result<WebSiteId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::WebSite, website.id)?;
        let staged = stage_plain(&*website, Utc::now());
        let returned = tx
            .query_row(
                "INSERT INTO representatives_website (id, created, updated, representative_id, url, kind) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(id) DO UPDATE SET updated = excluded.updated, representative_id = excluded.representative_id, url = excluded.url, kind = excluded.kind \
                 RETURNING id, created",
                params![
                    staged.id.map(|id| id.0),
                    staged.timestamps.created,
                    staged.timestamps.updated,
                    staged.representative.0,
                    staged.url,
                    staged.kind,
                ],
                returned,
            )
            .map_err(write_error)?;
        tx.commit()?;
        let (id, stored) = finish(staged, returned);
        *website = stored;
        Ok(id)
    }

    fn get_website(&self, id: WebSiteId) -> Result<WebSite, StorageError> {
        let sql = format!("SELECT {WEBSITE_COLUMNS} FROM representatives_website WHERE id = ?1");
        self.query_one(EntityKind::WebSite, &sql, id.0, website_from_row)
    }

    fn websites_of(
        &self,
        representative: RepresentativeId,
    ) -> Result<Vec<WebSite>, StorageError> {
        let sql = format!(
            "SELECT {WEBSITE_COLUMNS} FROM representatives_website WHERE representative_id = ?1 ORDER BY id"
        );
        self.query_many(&sql, representative.0, website_from_row)
    }

    fn save_address(&mut self, address: &mut Address) -> Result<AddressId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::Address, address.id)?;
        let staged = stage_plain(&*address, Utc::now());
        let returned = tx
            .query_row(
                "INSERT INTO representatives_address (id, created, updated, representative_id, country_id, city, street, number, postcode, floor, office_number, kind, name, location) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14) \
                 ON CONFLICT(id) DO UPDATE SET updated = excluded.updated, representative_id = excluded.representative_id, country_id = excluded.country_id, city = excluded.city, street = excluded.street, number = excluded.number, postcode = excluded.postcode, floor = excluded.floor, office_number = excluded.office_number, kind = excluded.kind, name = excluded.name, location = excluded.location \
                 RETURNING id, created",
                params![
                    staged.id.map(|id| id.0),
                    staged.timestamps.created,
                    staged.timestamps.updated,
                    staged.representative.0,
                    staged.country.0,
                    staged.city,
                    staged.street,
                    staged.number,
                    staged.postcode,
                    staged.floor,
                    staged.office_number,
                    staged.kind,
                    staged.name,
                    staged.location,
                ],
                returned,
            )
            .map_err(write_error)?;
        tx.commit()?;
        let (id, stored) = finish(staged, returned);
        *address = stored;
        Ok(id)
    }

    fn get_address(&self, id: AddressId) -> Result<Address, StorageError> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM representatives_address WHERE id = ?1");
        self.query_one(EntityKind::Address, &sql, id.0, address_from_row)
    }

    fn addresses_of(
        &self,
        representative: RepresentativeId,
    ) -> Result<Vec<Address>, StorageError> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM representatives_address WHERE representative_id = ?1 ORDER BY id"
        );
        self.query_many(&sql, representative.0, address_from_row)
    }

    fn save_phone(&mut self, phone: &mut Phone) -> Result<PhoneId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::Phone, phone.id)?;
        let staged = stage_plain(&*phone, Utc::now());
        let returned = tx
            .query_row(
                "INSERT INTO representatives_phone (id, created, updated, representative_id, number, kind, address_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT(id) DO UPDATE SET updated = excluded.updated, representative_id = excluded.representative_id, number = excluded.number, kind = excluded.kind, address_id = excluded.address_id \
                 RETURNING id, created",
                params![
                    staged.id.map(|id| id.0),
                    staged.timestamps.created,
                    staged.timestamps.updated,
                    staged.representative.0,
                    staged.number,
                    staged.kind,
                    staged.address.map(|a| a.0),
                ],
                returned,
            )
            .map_err(write_error)?;
        tx.commit()?;
        let (id, stored) = finish(staged, returned);
        *phone = stored;
        Ok(id)
    }

    fn get_phone(&self, id: PhoneId) -> Result<Phone, StorageError> {
        let sql = format!("SELECT {PHONE_COLUMNS} FROM representatives_phone WHERE id = ?1");
        self.query_one(EntityKind::Phone, &sql, id.0, phone_from_row)
    }

    fn phones_of(&self, representative: RepresentativeId) -> Result<Vec<Phone>, StorageError> {
        let sql = format!(
            "SELECT {PHONE_COLUMNS} FROM representatives_phone WHERE representative_id = ?1 ORDER BY id"
        );
        self.query_many(&sql, representative.0, phone_from_row)
    }

    // -------------------------------------------------------------------
    // Groups and constituencies
    // -------------------------------------------------------------------

    fn save_group(&mut self, group: &mut Group) -> Result<GroupId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::Group, group.id)?;
        let staged = stage_hashable(&*group, Utc::now(), |fp| {
            Ok(holder_of(&tx, EntityKind::Group, fp)?.map(GroupId))
        })?;
        let returned = tx
            .query_row(
                "INSERT INTO representatives_group (id, fingerprint, created, updated, name, abbreviation, kind) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT(id) DO UPDATE SET fingerprint = excluded.fingerprint, updated = excluded.updated, name = excluded.name, abbreviation = excluded.abbreviation, kind = excluded.kind \
                 RETURNING id, created",
                params![
                    staged.id.map(|id| id.0),
                    staged.fingerprint.as_ref().map(Fingerprint::as_str),
                    staged.timestamps.created,
                    staged.timestamps.updated,
                    staged.name,
                    staged.abbreviation,
                    staged.kind,
                ],
                returned,
            )
            .map_err(|e| hashable_write_error(e, EntityKind::Group, staged.fingerprint.as_ref()))?;
        tx.commit()?;
        let (id, stored) = finish(staged, returned);
        *group = stored;
        Ok(id)
    }

    fn get_group(&self, id: GroupId) -> Result<Group, StorageError> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM representatives_group WHERE id = ?1");
        self.query_one(EntityKind::Group, &sql, id.0, group_from_row)
    }

    fn find_group(&self, fingerprint: &Fingerprint) -> Result<Option<Group>, StorageError> {
        let sql =
            format!("SELECT {GROUP_COLUMNS} FROM representatives_group WHERE fingerprint = ?1");
        self.query_opt(&sql, fingerprint, group_from_row)
    }

    fn group_is_active(&self, id: GroupId, today: NaiveDate) -> Result<bool, StorageError> {
        self.mandate_is_keeping_active(EntityKind::Group, "group_id", id.0, today)
    }

    fn save_constituency(
        &mut self,
        constituency: &mut Constituency,
    ) -> Result<ConstituencyId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::Constituency, constituency.id)?;
        let staged = stage_hashable(&*constituency, Utc::now(), |fp| {
            Ok(holder_of(&tx, EntityKind::Constituency, fp)?.map(ConstituencyId))
        })?;
        let returned = tx
            .query_row(
                "INSERT INTO representatives_constituency (id, fingerprint, created, updated, name) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(id) DO UPDATE SET fingerprint = excluded.fingerprint, updated = excluded.updated, name = excluded.name \
                 RETURNING id, created",
                params![
                    staged.id.map(|id| id.0),
                    staged.fingerprint.as_ref().map(Fingerprint::as_str),
                    staged.timestamps.created,
                    staged.timestamps.updated,
                    staged.name,
                ],
                returned,
            )
            .map_err(|e| {
                hashable_write_error(e, EntityKind::Constituency, staged.fingerprint.as_ref())
            })?;
        tx.commit()?;
        let (id, stored) = finish(staged, returned);
        *constituency = stored;
        Ok(id)
    }

    fn get_constituency(&self, id: ConstituencyId) -> Result<Constituency, StorageError> {
        let sql = format!(
            "SELECT {CONSTITUENCY_COLUMNS} FROM representatives_constituency WHERE id = ?1"
        );
        self.query_one(EntityKind::Constituency, &sql, id.0, constituency_from_row)
    }

    fn find_constituency(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<Constituency>, StorageError> {
        let sql = format!(
            "SELECT {CONSTITUENCY_COLUMNS} FROM representatives_constituency WHERE fingerprint = ?1"
        );
        self.query_opt(&sql, fingerprint, constituency_from_row)
    }

    fn constituency_is_active(
        &self,
        id: ConstituencyId,
        today: NaiveDate,
    ) -> Result<bool, StorageError> {
        self.mandate_is_keeping_active(EntityKind::Constituency, "constituency_id", id.0, today)
    }

    // -------------------------------------------------------------------
    // Mandates
    // -------------------------------------------------------------------

    fn save_mandate(&mut self, mandate: &mut Mandate) -> Result<MandateId, StorageError> {
        let tx = self.conn.savepoint()?;
        ensure_stored(&tx, EntityKind::Mandate, mandate.id)?;
        let mut resolved = mandate.clone();
        resolve_mandate(&mut resolved, &*tx)?;
        let staged = stage_hashable(&resolved, Utc::now(), |fp| {
            Ok(holder_of(&tx, EntityKind::Mandate, fp)?.map(MandateId))
        })?;
        let returned = Self::upsert_mandate(&tx, &staged)?;
        tx.commit()?;
        let (id, stored) = finish(staged, returned);
        *mandate = stored;
        Ok(id)
    }

    fn get_mandate(&self, id: MandateId) -> Result<Mandate, StorageError> {
        let sql = format!("{MANDATE_SELECT} WHERE m.id = ?1");
        self.query_one(EntityKind::Mandate, &sql, id.0, mandate_from_row)
    }

    fn find_mandate(&self, fingerprint: &Fingerprint) -> Result<Option<Mandate>, StorageError> {
        let sql = format!("{MANDATE_SELECT} WHERE m.fingerprint = ?1");
        self.query_opt(&sql, fingerprint, mandate_from_row)
    }

    fn mandates_of(
        &self,
        representative: RepresentativeId,
    ) -> Result<Vec<Mandate>, StorageError> {
        let sql = format!("{MANDATE_SELECT} WHERE m.representative_id = ?1 ORDER BY m.id");
        self.query_many(&sql, representative.0, mandate_from_row)
    }

    // -------------------------------------------------------------------
    // Bulk operations
    // -------------------------------------------------------------------

    fn count(&self, kind: EntityKind) -> Result<usize, StorageError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table(kind));
        let n: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    fn delete_all(&mut self, kind: EntityKind) -> Result<usize, StorageError> {
        let tx = self.conn.savepoint()?;
        let removed = tx.execute(&format!("DELETE FROM {}", table(kind)), [])?;
        tx.commit()?;
        tracing::debug!(entity = %kind, removed, "deleted all");
        Ok(removed)
    }

    fn restamp(
        &mut self,
        kind: EntityKind,
        id: i64,
        timestamps: Timestamps,
    ) -> Result<(), StorageError> {
        if kind == EntityKind::Country {
            return Ok(());
        }
        let sql = format!(
            "UPDATE {} SET created = COALESCE(?1, created), updated = COALESCE(?2, updated) WHERE id = ?3",
            table(kind)
        );
        let rows = self
            .conn
            .execute(&sql, params![timestamps.created, timestamps.updated, id])?;
        if rows == 0 {
            return Err(StorageError::NotFound { entity: kind, id });
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Units of work
    // -------------------------------------------------------------------

    fn atomically<T, F>(&mut self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Self) -> Result<T, StorageError>,
    {
        self.conn.execute_batch("SAVEPOINT unit_of_work")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("RELEASE unit_of_work")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self
                    .conn
                    .execute_batch("ROLLBACK TO unit_of_work; RELEASE unit_of_work")
                {
                    tracing::warn!(error = %rollback, "failed to roll back unit of work");
                }
                Err(e)
            }
        }
    }
}

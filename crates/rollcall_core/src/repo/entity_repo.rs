//! Generic sync-tracked repository over one table descriptor.
//!
//! # Responsibility
//! - Provide CRUD and bulk-load APIs for every sync-tracked record type.
//! - Encapsulate the sync-state transition rules applied on update/delete.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - `create` always persists `PendingCreate`.
//! - `update` keeps `PendingCreate`, otherwise moves to `PendingUpdate`.
//!   Tombstoned rows are not editable and report `NotFound`.
//! - `delete` of a `PendingCreate` record removes the row regardless of the
//!   requested softness; other soft deletes tombstone with `PendingDelete`.
//! - Each operation runs in one transaction; store failures are returned as
//!   values with the original error text, never panics.

use crate::db::{DbError, LocalStore};
use crate::model::{ModelError, SyncStatus};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Params, Row};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for local persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying store failure (constraint violation, closed store, ...).
    Db(DbError),
    /// Record failed validation or date normalization.
    Validation(ModelError),
    /// Operation target is absent locally.
    NotFound { kind: &'static str, id: String },
    /// Persisted data cannot be converted into a valid record.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "local store write failed: {err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ModelError> for RepoError {
    fn from(value: ModelError) -> Self {
        Self::Validation(value)
    }
}

/// How a delete request was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Row removed locally; nothing to send remotely.
    Hard,
    /// Row kept with `deleted=true` and `PendingDelete`.
    Soft,
}

/// Table descriptor implemented by every sync-tracked record.
pub trait SyncRecord: Sized {
    /// Create input, normalized by `from_draft`.
    type Draft;
    /// Partial update input.
    type Patch;

    /// Record kind used in messages and log events.
    const KIND: &'static str;
    const TABLE: &'static str;
    /// Column names in binding order. `id` must come first.
    const COLUMNS: &'static [&'static str];

    fn from_draft(draft: Self::Draft) -> Result<Self, ModelError>;
    fn apply_patch(&mut self, patch: Self::Patch) -> Result<(), ModelError>;
    fn validate(&self) -> Result<(), ModelError>;

    fn id(&self) -> &str;
    fn sync_status(&self) -> SyncStatus;
    fn set_sync_status(&mut self, status: SyncStatus);
    fn is_deleted(&self) -> bool;
    fn mark_deleted(&mut self);
    fn clear_deleted(&mut self);

    /// Values bound in `COLUMNS` order.
    fn to_row_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> RepoResult<Self>;

    /// Applies dependent-record effects of deleting `id`.
    fn cascade_delete(_conn: &Connection, _id: &str) -> RepoResult<()> {
        Ok(())
    }
}

/// SQLite-backed repository for one `SyncRecord` type.
pub struct Repository<E> {
    store: LocalStore,
    _record: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _record: PhantomData,
        }
    }
}

impl<E> Debug for Repository<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("store", &self.store)
            .finish()
    }
}

impl<E: SyncRecord> Repository<E> {
    pub fn new(store: LocalStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn get_all(&self) -> RepoResult<Vec<E>> {
        self.store
            .with_conn(|conn| query_records::<E, _>(conn, "1 = 1 ORDER BY id ASC", params![]))
    }

    pub fn get_by_id(&self, id: &str) -> RepoResult<Option<E>> {
        self.store.with_conn(|conn| load_record::<E>(conn, id))
    }

    /// Persists a new record as `PendingCreate` and returns its id.
    pub fn create(&self, draft: E::Draft) -> RepoResult<String> {
        let result = E::from_draft(draft)
            .map_err(RepoError::from)
            .and_then(|mut record| {
                record.set_sync_status(SyncStatus::PendingCreate);
                record.clear_deleted();
                record.validate()?;
                self.store.with_tx(|tx| {
                    insert_record(tx, &record, false)?;
                    Ok(record.id().to_string())
                })
            });

        match &result {
            Ok(id) => info!(
                "event=record_create module=repo status=ok kind={} id={}",
                E::KIND,
                id
            ),
            Err(err) => warn!(
                "event=record_create module=repo status=error kind={} error={}",
                E::KIND,
                err
            ),
        }
        result
    }

    /// Applies a partial change and the local-update state transition.
    pub fn update(&self, id: &str, patch: E::Patch) -> RepoResult<()> {
        let result = self.store.with_tx(|tx| -> RepoResult<SyncStatus> {
            let mut record = require_record::<E>(tx, id)?;
            if record.is_deleted() {
                return Err(RepoError::NotFound {
                    kind: E::KIND,
                    id: id.to_string(),
                });
            }
            record.apply_patch(patch)?;
            let next = record.sync_status().after_local_update();
            record.set_sync_status(next);
            record.validate()?;
            write_record(tx, &record)?;
            Ok(next)
        });

        match &result {
            Ok(next) => info!(
                "event=record_update module=repo status=ok kind={} id={} sync_status={}",
                E::KIND,
                id,
                next.as_db_str()
            ),
            Err(err) => warn!(
                "event=record_update module=repo status=error kind={} id={} error={}",
                E::KIND,
                id,
                err
            ),
        }
        result.map(|_| ())
    }

    /// Deletes a record, overriding `soft` for records never seen remotely.
    pub fn delete(&self, id: &str, soft: bool) -> RepoResult<DeleteOutcome> {
        let result = self
            .store
            .with_tx(|tx| delete_record::<E>(tx, id, soft));

        match &result {
            Ok(outcome) => info!(
                "event=record_delete module=repo status=ok kind={} id={} mode={}",
                E::KIND,
                id,
                outcome_label(*outcome)
            ),
            Err(err) => warn!(
                "event=record_delete module=repo status=error kind={} id={} error={}",
                E::KIND,
                id,
                err
            ),
        }
        result
    }

    /// Appends remote records (cold load). Existing rows with the same id are
    /// overwritten with the remote version.
    pub fn bulk_load(&self, records: &[E]) -> RepoResult<usize> {
        let loaded = self.store.with_tx(|tx| -> RepoResult<usize> {
            for record in records {
                record.validate()?;
                insert_record(tx, record, true)?;
            }
            Ok(records.len())
        })?;
        debug!(
            "event=bulk_load module=repo status=ok kind={} count={}",
            E::KIND,
            loaded
        );
        Ok(loaded)
    }

    /// Records that still need remote reconciliation.
    pub fn list_pending(&self) -> RepoResult<Vec<E>> {
        self.store.with_conn(|conn| {
            query_records::<E, _>(
                conn,
                "sync_status <> 'synced' OR deleted = 1 ORDER BY id ASC",
                params![],
            )
        })
    }

    pub fn count_pending(&self) -> RepoResult<usize> {
        self.store.with_conn(|conn| {
            let count: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE sync_status <> 'synced' OR deleted = 1;",
                    E::TABLE
                ),
                [],
                |row| row.get(0),
            )?;
            usize::try_from(count)
                .map_err(|_| RepoError::InvalidData(format!("negative count in {}", E::TABLE)))
        })
    }

    /// Finalizes a remote acknowledgement: `Synced` and `deleted=false`.
    pub fn mark_synced(&self, id: &str) -> RepoResult<()> {
        self.store.with_tx(|tx| {
            let mut record = require_record::<E>(tx, id)?;
            record.set_sync_status(SyncStatus::Synced);
            record.clear_deleted();
            write_record(tx, &record)
        })
    }

    /// Overwrites the sync status without touching other fields.
    pub fn set_status(&self, id: &str, status: SyncStatus) -> RepoResult<()> {
        self.store.with_tx(|tx| {
            let mut record = require_record::<E>(tx, id)?;
            record.set_sync_status(status);
            write_record(tx, &record)
        })
    }

    /// Removes a row after the remote service confirmed its deletion.
    pub fn remove(&self, id: &str) -> RepoResult<()> {
        self.store.with_tx(|tx| {
            if remove_record::<E>(tx, id)? == 0 {
                return Err(RepoError::NotFound {
                    kind: E::KIND,
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }
}

pub(crate) fn select_sql<E: SyncRecord>() -> String {
    format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
}

pub(crate) fn query_records<E: SyncRecord, P: Params>(
    conn: &Connection,
    where_clause: &str,
    params: P,
) -> RepoResult<Vec<E>> {
    let mut stmt = conn.prepare(&format!("{} WHERE {where_clause};", select_sql::<E>()))?;
    let mut rows = stmt.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(E::from_row(row)?);
    }
    Ok(records)
}

pub(crate) fn load_record<E: SyncRecord>(conn: &Connection, id: &str) -> RepoResult<Option<E>> {
    let mut records = query_records::<E, _>(conn, "id = ?1", [id])?;
    Ok(records.pop())
}

fn require_record<E: SyncRecord>(conn: &Connection, id: &str) -> RepoResult<E> {
    load_record::<E>(conn, id)?.ok_or_else(|| RepoError::NotFound {
        kind: E::KIND,
        id: id.to_string(),
    })
}

fn insert_record<E: SyncRecord>(conn: &Connection, record: &E, replace: bool) -> RepoResult<()> {
    let placeholders = (1..=E::COLUMNS.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    let verb = if replace {
        "INSERT OR REPLACE"
    } else {
        "INSERT"
    };
    conn.execute(
        &format!(
            "{verb} INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            E::COLUMNS.join(", ")
        ),
        params_from_iter(record.to_row_values()),
    )?;
    Ok(())
}

fn write_record<E: SyncRecord>(conn: &Connection, record: &E) -> RepoResult<()> {
    let assignments = E::COLUMNS
        .iter()
        .enumerate()
        .skip(1)
        .map(|(index, column)| format!("{column} = ?{}", index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let changed = conn.execute(
        &format!("UPDATE {} SET {assignments} WHERE id = ?1;", E::TABLE),
        params_from_iter(record.to_row_values()),
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            kind: E::KIND,
            id: record.id().to_string(),
        });
    }
    Ok(())
}

fn remove_record<E: SyncRecord>(conn: &Connection, id: &str) -> RepoResult<usize> {
    let removed = conn.execute(&format!("DELETE FROM {} WHERE id = ?1;", E::TABLE), [id])?;
    Ok(removed)
}

/// Delete rule shared by direct deletes and cascades.
pub(crate) fn delete_record<E: SyncRecord>(
    conn: &Connection,
    id: &str,
    soft: bool,
) -> RepoResult<DeleteOutcome> {
    let mut record = require_record::<E>(conn, id)?;
    let outcome = if !soft || record.sync_status().deletes_locally() {
        remove_record::<E>(conn, id)?;
        DeleteOutcome::Hard
    } else {
        record.mark_deleted();
        record.set_sync_status(SyncStatus::PendingDelete);
        write_record(conn, &record)?;
        DeleteOutcome::Soft
    };

    E::cascade_delete(conn, id)?;
    Ok(outcome)
}

fn outcome_label(outcome: DeleteOutcome) -> &'static str {
    match outcome {
        DeleteOutcome::Hard => "hard",
        DeleteOutcome::Soft => "soft",
    }
}

pub(crate) fn text_value(value: Option<&str>) -> Value {
    match value {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Null,
    }
}

pub(crate) fn integer_value(value: Option<i64>) -> Value {
    match value {
        Some(number) => Value::Integer(number),
        None => Value::Null,
    }
}

pub(crate) fn bool_value(value: bool) -> Value {
    Value::Integer(if value { 1 } else { 0 })
}

pub(crate) fn parse_status_column(row: &Row<'_>, table: &str) -> RepoResult<SyncStatus> {
    let raw: String = row.get("sync_status")?;
    SyncStatus::parse_db(&raw).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid sync_status `{raw}` in {table}.sync_status"))
    })
}

pub(crate) fn parse_bool_column(
    row: &Row<'_>,
    table: &str,
    column: &'static str,
) -> RepoResult<bool> {
    match row.get::<_, i64>(column)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in {table}.{column}"
        ))),
    }
}

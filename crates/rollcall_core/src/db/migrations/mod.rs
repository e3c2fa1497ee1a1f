//! Ordered schema migrations for the local store.
//!
//! # Invariants
//! - Versions are contiguous, starting at 1.
//! - All pending steps run in one transaction; `PRAGMA user_version` ends at
//!   the last applied step.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// Transactional tables (`activities`, `sessions`, `attendances`).
const V1_SYNC_TABLES: &str = include_str!("0001_init.sql");
/// Reference tables filled by cold load.
const V2_REFERENCE_TABLES: &str = include_str!("0002_reference_tables.sql");

const STEPS: &[(u32, &str)] = &[(1, V1_SYNC_TABLES), (2, V2_REFERENCE_TABLES)];

/// Returns the schema version this build migrates to.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |(version, _)| *version)
}

/// Brings `conn` to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
/// - `Sqlite` when a step fails; no step is kept in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending = STEPS
        .iter()
        .filter(|(version, _)| *version > from)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (version, sql) in &pending {
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} steps={}",
        from,
        latest,
        pending.len()
    );
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get::<_, u32>(0))?)
}

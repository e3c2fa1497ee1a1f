//! Injectable local store handle.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by core behavior.
//! - Trigger schema migrations before returning a usable store.
//! - Serialize access to the single connection for repositories, views and
//!   the sync engine.
//!
//! # Invariants
//! - Returned stores have `foreign_keys=ON` and migrations fully applied.
//! - The connection lock is never held across an `.await`; every closure
//!   passed to `with_conn`/`with_tx` is synchronous.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Cheaply clonable handle to the shared local database.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl Debug for LocalStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("open", &self.is_open())
            .finish()
    }
}

impl LocalStore {
    /// Opens a SQLite database file and applies all pending migrations.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let conn = open_connection("file", || Connection::open(path))?;
        Ok(Self::from_connection(conn))
    }

    /// Opens an in-memory SQLite database and applies all pending migrations.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = open_connection("memory", Connection::open_in_memory)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    /// Closes the underlying connection for every clone of this handle.
    ///
    /// Closing an already closed store is a no-op.
    pub fn close(&self) -> DbResult<()> {
        let mut guard = self.lock()?;
        let Some(conn) = guard.take() else {
            return Ok(());
        };

        if let Err((conn, err)) = conn.close() {
            error!("event=db_close module=db status=error error={err}");
            *guard = Some(conn);
            return Err(err.into());
        }

        info!("event=db_close module=db status=ok");
        Ok(())
    }

    /// Returns whether the store still owns an open connection.
    pub fn is_open(&self) -> bool {
        self.conn
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Runs `f` against the open connection.
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let guard = self.lock()?;
        let conn = guard.as_ref().ok_or(DbError::Closed)?;
        f(conn)
    }

    /// Runs `f` inside an immediate transaction, committing when it returns `Ok`.
    pub fn with_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut guard = self.lock()?;
        let conn = guard.as_mut().ok_or(DbError::Closed)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DbError::from)?;
        let value = f(&tx)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Option<Connection>>> {
        self.conn.lock().map_err(|_| {
            warn!("event=db_lock module=db status=error error_code=poisoned");
            DbError::Poisoned
        })
    }
}

fn open_connection(
    mode: &'static str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    apply_migrations(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::LocalStore;
    use crate::db::DbError;

    #[test]
    fn closed_store_rejects_operations() {
        let store = LocalStore::open_in_memory().unwrap();
        let clone = store.clone();
        store.close().unwrap();

        assert!(!clone.is_open());
        let err = clone
            .with_conn(|conn| {
                conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))
                    .map_err(DbError::from)
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Closed));

        store.close().unwrap();
    }

    #[test]
    fn failed_transaction_is_rolled_back() {
        let store = LocalStore::open_in_memory().unwrap();
        let result: Result<(), DbError> = store.with_tx(|tx| {
            tx.execute("INSERT INTO sites (id, name) VALUES ('S1', 'North');", [])?;
            Err(DbError::Poisoned)
        });
        assert!(result.is_err());

        let count: i64 = store
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM sites;", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}

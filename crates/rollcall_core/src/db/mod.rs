//! Local store bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure the SQLite-backed local store.
//! - Apply schema migrations in deterministic order.
//! - Hand out an injectable store handle with an explicit open/close lifecycle.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - A closed store rejects every later operation with `DbError::Closed`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod store;

pub use store::LocalStore;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The store was closed through `LocalStore::close`.
    Closed,
    /// A writer panicked while holding the connection lock.
    Poisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Closed => write!(f, "local store is closed"),
            Self::Poisoned => write!(f, "local store lock is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::Closed => None,
            Self::Poisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

//! Repository layer over the local store.
//!
//! # Responsibility
//! - Expose one generic repository per sync-tracked record type.
//! - Own reference-table replacement and lookups.
//! - Isolate SQLite query details from sync and view orchestration.
//!
//! # Invariants
//! - Repository writes validate records before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to store
//!   failures; nothing panics on bad input.

pub mod activity_repo;
pub mod entity_repo;
mod records;
pub mod reference_repo;
mod session_repo;

use crate::db::LocalStore;
use crate::model::{Activity, Attendance, Session};
use serde::Serialize;

pub use activity_repo::{ActivityEditContext, ActivityFormContext};
pub use entity_repo::{DeleteOutcome, RepoError, RepoResult, Repository, SyncRecord};
pub use reference_repo::{ReferenceRecord, ReferenceRepository};

pub type ActivityRepository = Repository<Activity>;
pub type SessionRepository = Repository<Session>;
pub type AttendanceRepository = Repository<Attendance>;

/// Records still waiting for remote reconciliation, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingSummary {
    pub activities: usize,
    pub sessions: usize,
    pub attendances: usize,
}

impl PendingSummary {
    pub fn collect(store: &LocalStore) -> RepoResult<Self> {
        Ok(Self {
            activities: ActivityRepository::new(store.clone()).count_pending()?,
            sessions: SessionRepository::new(store.clone()).count_pending()?,
            attendances: AttendanceRepository::new(store.clone()).count_pending()?,
        })
    }

    pub fn total(&self) -> usize {
        self.activities + self.sessions + self.attendances
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

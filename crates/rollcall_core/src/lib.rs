//! Offline-first data layer for activity scheduling and attendance.
//! This crate is the single source of truth for local sync-state rules.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod remote;
pub mod repo;
pub mod sync;
pub mod view;

pub use config::{ConfigError, SyncConfig};
pub use db::{DbError, DbResult, LocalStore};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{
    Activity, ActivityDraft, ActivityPatch, ActivityState, Attendance, AttendanceDraft,
    AttendancePatch, DateInput, ModelError, Session, SessionDraft, SessionPatch, SyncStatus,
};
pub use remote::{GatewayError, MutationReply, RemoteGateway, RemoteTransport};
pub use repo::{
    ActivityRepository, AttendanceRepository, DeleteOutcome, PendingSummary,
    ReferenceRepository, RepoError, RepoResult, SessionRepository,
};
pub use sync::{
    ColdLoadError, ColdLoadReport, ColdLoader, SyncEngine, SyncHandle, SyncReport, SyncScheduler,
};
pub use view::{AttendanceRoster, CalendarEvent, CalendarView, RosterView};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

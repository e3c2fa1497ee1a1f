//! Domain model for activities, sessions, attendance and reference data.
//!
//! # Responsibility
//! - Define canonical records shared by repositories, views and sync.
//! - Own the local synchronization-state transition rules.
//! - Normalize date-like user input into comparable epoch milliseconds.
//!
//! # Invariants
//! - Every mutable record carries exactly one `SyncStatus`.
//! - Stored dates are UTC-midnight epoch milliseconds.

pub mod activity;
pub mod attendance;
pub mod date;
pub mod reference;
pub mod session;
pub mod sync_status;
pub mod validation;

pub use activity::{Activity, ActivityDraft, ActivityPatch, ActivityState};
pub use attendance::{Attendance, AttendanceDraft, AttendancePatch};
pub use date::{parse_calendar_date, to_calendar_date, DateInput};
pub use reference::{
    GroupMember, Parameter, Partner, Person, Site, User, PARAMETER_SET_ACTIVITY_TYPE,
    PARAMETER_SET_FREQUENCY,
};
pub use session::{Session, SessionDraft, SessionPatch};
pub use sync_status::SyncStatus;
pub use validation::ModelError;

/// Returns a fresh identity for records created locally without one.
pub(crate) fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

//! Read-side projections consumed by the UI.
//!
//! # Responsibility
//! - Join activities, sessions and attendance into calendar events.
//! - Resolve the attendance roster of one session.
//!
//! # Invariants
//! - Views never write to the local store.
//! - Attendee counts are recomputed from live attendance rows on every read.

pub mod calendar;
pub mod roster;

pub use crate::repo::{ActivityEditContext, ActivityFormContext};
pub use calendar::{CalendarEvent, CalendarEventProps, CalendarView};
pub use roster::{AttendanceRoster, RosterEntry, RosterView};

//! Remote reconciliation: per-cycle engine, background scheduler and the
//! one-shot cold load.
//!
//! # Invariants
//! - The sync path never surfaces errors to callers; it reports and logs.
//! - Cold load runs before the scheduler starts.

pub mod cold_load;
pub mod engine;
pub mod scheduler;

pub use cold_load::{ColdLoadError, ColdLoadReport, ColdLoader};
pub use engine::{PhaseReport, SyncEngine, SyncReport, PING_ANSWER};
pub use scheduler::{SyncHandle, SyncScheduler};

//! One reconciliation cycle between the local store and the remote service.
//!
//! # Responsibility
//! - Gate each cycle on a successful ping.
//! - Push pending activities, sessions and attendance groups, in that order.
//! - Finalize local sync state from remote acknowledgements.
//!
//! # Invariants
//! - One record's (or one session group's) failure never blocks the others.
//! - Business failures and transport errors both leave records pending.
//! - `run_cycle` never returns an error; outcomes are logged and counted.

use crate::db::LocalStore;
use crate::model::{Attendance, Session, SyncStatus};
use crate::remote::{
    ActivityPayload, AttendanceBatchPayload, GatewayResult, MutationReply, RemoteGateway,
    RemoteTransport, SessionPayload,
};
use crate::repo::{
    ActivityRepository, AttendanceRepository, RepoResult, SessionRepository,
};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Expected answer of a reachable remote service.
pub const PING_ANSWER: &str = "pong";

/// Counters for one phase of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseReport {
    /// Remote calls issued.
    pub attempted: usize,
    /// Calls acknowledged and finalized locally.
    pub synced: usize,
    /// Calls rejected, failed in transport, or not finalized locally.
    pub failed: usize,
}

impl PhaseReport {
    fn record(&mut self, finalized: bool) {
        if finalized {
            self.synced += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub reachable: bool,
    pub activities: PhaseReport,
    pub sessions: PhaseReport,
    /// Counted per session group, not per attendance row.
    pub attendances: PhaseReport,
}

impl SyncReport {
    pub fn total_attempted(&self) -> usize {
        self.activities.attempted + self.sessions.attempted + self.attendances.attempted
    }

    pub fn total_failed(&self) -> usize {
        self.activities.failed + self.sessions.failed + self.attendances.failed
    }
}

/// Orchestrates pending-work reconciliation over injected collaborators.
pub struct SyncEngine<T> {
    gateway: RemoteGateway<T>,
    activities: ActivityRepository,
    sessions: SessionRepository,
    attendances: AttendanceRepository,
}

impl<T: RemoteTransport> SyncEngine<T> {
    pub fn new(store: LocalStore, gateway: RemoteGateway<T>) -> Self {
        Self {
            gateway,
            activities: ActivityRepository::new(store.clone()),
            sessions: SessionRepository::new(store.clone()),
            attendances: AttendanceRepository::new(store),
        }
    }

    pub fn gateway(&self) -> &RemoteGateway<T> {
        &self.gateway
    }

    /// Runs the gate and all three phases once.
    pub async fn run_cycle(&self) -> SyncReport {
        let started_at = Instant::now();
        info!("event=sync_cycle module=sync status=start");

        match self.gateway.ping().await {
            Ok(answer) if answer == PING_ANSWER => {}
            Ok(_) => {
                warn!(
                    "event=sync_cycle module=sync status=skip error_code=unexpected_ping_answer"
                );
                return SyncReport::default();
            }
            Err(err) => {
                warn!("event=sync_cycle module=sync status=skip error_code=remote_unreachable error={err}");
                return SyncReport::default();
            }
        }

        let report = SyncReport {
            reachable: true,
            activities: self.sync_activities().await,
            sessions: self.sync_sessions().await,
            attendances: self.sync_attendances().await,
        };

        info!(
            "event=sync_cycle module=sync status=ok duration_ms={} attempted={} failed={}",
            started_at.elapsed().as_millis(),
            report.total_attempted(),
            report.total_failed()
        );
        report
    }

    async fn sync_activities(&self) -> PhaseReport {
        let mut phase = PhaseReport::default();
        let Some(pending) = load_pending("activities", self.activities.list_pending()) else {
            return phase;
        };

        for activity in pending {
            phase.attempted += 1;
            let outcome = self
                .gateway
                .create_activity(&ActivityPayload::from(&activity))
                .await;
            let finalized = acknowledged("createActivity", &activity.id, outcome)
                && finalize(&activity.id, self.activities.mark_synced(&activity.id));
            phase.record(finalized);
        }
        phase
    }

    async fn sync_sessions(&self) -> PhaseReport {
        let mut phase = PhaseReport::default();
        let Some(mut pending) = load_pending("sessions", self.sessions.list_pending()) else {
            return phase;
        };

        for session in pending.iter_mut() {
            if session.deleted && session.sync_status != SyncStatus::PendingDelete {
                match self
                    .sessions
                    .set_status(&session.id, SyncStatus::PendingDelete)
                {
                    Ok(()) => session.sync_status = SyncStatus::PendingDelete,
                    Err(err) => error!(
                        "event=sync_record module=sync status=error kind=session id={} error_code=status_write_failed error={}",
                        session.id, err
                    ),
                }
            }
        }

        for session in &pending {
            match session.sync_status {
                SyncStatus::PendingCreate | SyncStatus::PendingUpdate => {
                    phase.attempted += 1;
                    phase.record(self.push_session(session).await);
                }
                SyncStatus::PendingDelete => {
                    phase.attempted += 1;
                    let outcome = self.gateway.delete_session(&session.id).await;
                    let finalized = acknowledged("deleteSession", &session.id, outcome)
                        && finalize(&session.id, self.sessions.remove(&session.id));
                    phase.record(finalized);
                }
                SyncStatus::Synced => debug!(
                    "event=sync_record module=sync status=skip kind=session id={} reason=no_pending_state",
                    session.id
                ),
            }
        }
        phase
    }

    async fn push_session(&self, session: &Session) -> bool {
        let attendee_count = match self.attendances.count_by_session(&session.id) {
            Ok(count) => count,
            Err(err) => {
                error!(
                    "event=sync_record module=sync status=error kind=session id={} error_code=count_failed error={}",
                    session.id, err
                );
                return false;
            }
        };

        let payload = SessionPayload::new(session, attendee_count);
        let (operation, outcome) = if session.sync_status == SyncStatus::PendingCreate {
            ("createSession", self.gateway.create_session(&payload).await)
        } else {
            ("updateSession", self.gateway.update_session(&payload).await)
        };

        acknowledged(operation, &session.id, outcome)
            && finalize(&session.id, self.sessions.mark_synced(&session.id))
    }

    async fn sync_attendances(&self) -> PhaseReport {
        let mut phase = PhaseReport::default();
        let Some(pending) = load_pending("attendances", self.attendances.list_pending()) else {
            return phase;
        };

        let mut groups: BTreeMap<String, Vec<Attendance>> = BTreeMap::new();
        let mut orphaned = 0usize;
        for record in pending {
            match record.session_id.clone() {
                Some(session_id) => groups.entry(session_id).or_default().push(record),
                None => orphaned += 1,
            }
        }
        if orphaned > 0 {
            debug!(
                "event=sync_phase module=sync status=skip phase=attendances reason=missing_session count={}",
                orphaned
            );
        }

        for (session_id, group) in &groups {
            phase.attempted += 1;
            phase.record(self.push_attendance_group(session_id, group).await);
        }
        phase
    }

    async fn push_attendance_group(&self, session_id: &str, group: &[Attendance]) -> bool {
        let roster = match self.attendances.list_by_session(session_id) {
            Ok(roster) => roster,
            Err(err) => {
                error!(
                    "event=sync_record module=sync status=error kind=attendance session_id={} error_code=roster_read_failed error={}",
                    session_id, err
                );
                return false;
            }
        };
        let activity_id = group
            .iter()
            .chain(roster.iter())
            .find_map(|record| record.activity_id.clone());

        let payload = AttendanceBatchPayload::new(session_id, activity_id, &roster);
        let outcome = self.gateway.save_attendance(&payload).await;
        if !acknowledged("saveAttendance", session_id, outcome) {
            return false;
        }

        let mut all_finalized = true;
        for record in group {
            let result = if record.deleted {
                self.attendances.remove(&record.id)
            } else {
                self.attendances.mark_synced(&record.id)
            };
            all_finalized &= finalize(&record.id, result);
        }
        all_finalized
    }
}

fn load_pending<E>(phase: &str, result: RepoResult<Vec<E>>) -> Option<Vec<E>> {
    match result {
        Ok(records) => {
            debug!(
                "event=sync_phase module=sync status=start phase={} pending={}",
                phase,
                records.len()
            );
            Some(records)
        }
        Err(err) => {
            error!(
                "event=sync_phase module=sync status=error phase={} error_code=pending_read_failed error={}",
                phase, err
            );
            None
        }
    }
}

fn acknowledged(operation: &str, id: &str, outcome: GatewayResult<MutationReply>) -> bool {
    match outcome {
        Ok(reply) if reply.ok => true,
        Ok(reply) => {
            warn!(
                "event=sync_record module=sync status=error operation={} id={} error_code=remote_rejected message={}",
                operation, id, reply.message
            );
            false
        }
        Err(err) => {
            warn!(
                "event=sync_record module=sync status=error operation={} id={} error_code=remote_failed error={}",
                operation, id, err
            );
            false
        }
    }
}

fn finalize(id: &str, result: RepoResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            error!(
                "event=sync_record module=sync status=error id={} error_code=finalize_failed error={}",
                id, err
            );
            false
        }
    }
}

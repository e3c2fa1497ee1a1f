//! Attendance-taking roster for one session.
//!
//! # Invariants
//! - Recorded attendance is returned with `removable=false`.
//! - Without recorded attendance, the previous session's attendees are
//!   carried over with `removable=true`.

use crate::db::LocalStore;
use crate::model::{Attendance, Person};
use crate::repo::{
    ActivityRepository, AttendanceRepository, ReferenceRepository, RepoResult, SessionRepository,
};
use log::debug;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub person_id: String,
    /// Falls back to the person id when the person is not loaded locally.
    pub full_name: String,
    pub removable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRoster {
    pub session_id: String,
    pub activity_id: String,
    /// Policy flag of the activity type.
    pub photo_required: bool,
    /// Members of the activity's beneficiary interest group.
    pub candidates: Vec<Person>,
    pub attendees: Vec<RosterEntry>,
    /// Session the attendees were carried over from, if any.
    pub carried_over_from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RosterView {
    activities: ActivityRepository,
    sessions: SessionRepository,
    attendances: AttendanceRepository,
    references: ReferenceRepository,
}

impl RosterView {
    pub fn new(store: LocalStore) -> Self {
        Self {
            activities: ActivityRepository::new(store.clone()),
            sessions: SessionRepository::new(store.clone()),
            attendances: AttendanceRepository::new(store.clone()),
            references: ReferenceRepository::new(store),
        }
    }

    /// Roster of `session_id`; `None` when the session is absent or deleted.
    pub fn build(&self, session_id: &str) -> RepoResult<Option<AttendanceRoster>> {
        let Some(session) = self.sessions.get_by_id(session_id)? else {
            return Ok(None);
        };
        if session.deleted {
            return Ok(None);
        }

        let activity = self.activities.get_by_id(&session.activity_id)?;
        let photo_required = match activity
            .as_ref()
            .and_then(|activity| activity.activity_type_id.as_deref())
        {
            Some(type_id) => self
                .references
                .parameter(type_id)?
                .map(|parameter| parameter.requires_photo)
                .unwrap_or(false),
            None => false,
        };
        let candidates = match activity
            .as_ref()
            .and_then(|activity| activity.interest_group_id.as_deref())
        {
            Some(group_id) => self.references.people_in_group(group_id)?,
            None => Vec::new(),
        };

        let recorded = self.attendances.list_by_session(&session.id)?;
        let (attendees, carried_over_from) = if !recorded.is_empty() {
            (self.entries(&recorded, false)?, None)
        } else {
            match self.sessions.previous_session(&session)? {
                Some(previous) => {
                    let carried = self.attendances.list_by_session(&previous.id)?;
                    (self.entries(&carried, true)?, Some(previous.id))
                }
                None => (Vec::new(), None),
            }
        };

        debug!(
            "event=roster_build module=view status=ok session_id={} attendees={} carried_over={}",
            session.id,
            attendees.len(),
            carried_over_from.is_some()
        );

        Ok(Some(AttendanceRoster {
            session_id: session.id,
            activity_id: session.activity_id,
            photo_required,
            candidates,
            attendees,
            carried_over_from,
        }))
    }

    fn entries(&self, records: &[Attendance], removable: bool) -> RepoResult<Vec<RosterEntry>> {
        records
            .iter()
            .map(|record| {
                let full_name = self
                    .references
                    .person(&record.person_id)?
                    .map(|person| person.full_name())
                    .unwrap_or_else(|| record.person_id.clone());
                Ok(RosterEntry {
                    person_id: record.person_id.clone(),
                    full_name,
                    removable,
                })
            })
            .collect()
    }
}

//! Calendar projection of the sessions a user can see.

use crate::db::LocalStore;
use crate::model::{to_calendar_date, Activity, DateInput, Session, SyncStatus};
use crate::repo::{ActivityRepository, AttendanceRepository, RepoResult, SessionRepository};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    /// Local-naive `YYYY-MM-DDTHH:MM:00`.
    pub start: String,
    pub end: String,
    pub extended_props: CalendarEventProps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventProps {
    pub activity_id: String,
    pub session_id: String,
    /// Live attendance rows, recomputed on every build.
    pub attendee_count: i64,
    pub sync_status: SyncStatus,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CalendarView {
    activities: ActivityRepository,
    sessions: SessionRepository,
    attendances: AttendanceRepository,
}

impl CalendarView {
    pub fn new(store: LocalStore) -> Self {
        Self {
            activities: ActivityRepository::new(store.clone()),
            sessions: SessionRepository::new(store.clone()),
            attendances: AttendanceRepository::new(store),
        }
    }

    /// Events for every visible session dated within `[from, to]`.
    pub fn build(
        &self,
        user_id: &str,
        from: &DateInput,
        to: &DateInput,
    ) -> RepoResult<Vec<CalendarEvent>> {
        let from = from.to_epoch_ms("from")?;
        let to = to.to_epoch_ms("to")?;

        let activities = self.activities.list_by_user(user_id)?;
        let activity_ids = activities
            .iter()
            .map(|activity| activity.id.clone())
            .collect::<Vec<_>>();
        let by_id: HashMap<&str, &Activity> = activities
            .iter()
            .map(|activity| (activity.id.as_str(), activity))
            .collect();

        let sessions = self.sessions.list_in_range(&activity_ids, from, to)?;
        let session_ids = sessions
            .iter()
            .map(|session| session.id.clone())
            .collect::<Vec<_>>();
        let counts: HashMap<String, i64> = self
            .attendances
            .counts_by_sessions(&session_ids)?
            .into_iter()
            .collect();

        let events = sessions
            .iter()
            .filter_map(|session| {
                let activity = by_id.get(session.activity_id.as_str())?;
                let count = counts.get(&session.id).copied().unwrap_or(0);
                to_event(session, activity, count)
            })
            .collect::<Vec<_>>();

        debug!(
            "event=calendar_build module=view status=ok user_id={} sessions={} events={}",
            user_id,
            sessions.len(),
            events.len()
        );
        Ok(events)
    }
}

fn to_event(session: &Session, activity: &Activity, attendee_count: i64) -> Option<CalendarEvent> {
    let day = to_calendar_date(session.date?)?;
    let start = local_timestamp(&day, session.start_time.as_deref());
    let end = match session.end_time.as_deref() {
        Some(end_time) => local_timestamp(&day, Some(end_time)),
        None => start.clone(),
    };

    Some(CalendarEvent {
        id: session.id.clone(),
        title: activity.name.clone(),
        start,
        end,
        extended_props: CalendarEventProps {
            activity_id: activity.id.clone(),
            session_id: session.id.clone(),
            attendee_count,
            sync_status: session.sync_status,
            description: session.description.clone(),
        },
    })
}

fn local_timestamp(day: &str, time: Option<&str>) -> String {
    let hour_minute = time
        .map(str::trim)
        .and_then(|value| value.get(..5))
        .unwrap_or("00:00");
    format!("{day}T{hour_minute}:00")
}

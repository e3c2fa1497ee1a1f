//! Table descriptors for activities, sessions and attendance.
//!
//! # Invariants
//! - Deleting an activity applies the session delete rule to every live
//!   child session independently.
//! - Removing a session row drops its attendance that never reached the
//!   remote.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::model::{
    Activity, ActivityDraft, ActivityPatch, ActivityState, Attendance, AttendanceDraft,
    AttendancePatch, ModelError, Session, SessionDraft, SessionPatch, SyncStatus,
};
use crate::repo::entity_repo::{
    bool_value, delete_record, integer_value, parse_bool_column, parse_status_column, text_value,
    RepoError, RepoResult, SyncRecord,
};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};

impl SyncRecord for Activity {
    type Draft = ActivityDraft;
    type Patch = ActivityPatch;

    const KIND: &'static str = "activity";
    const TABLE: &'static str = "activities";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "program_id",
        "site_id",
        "activity_type_id",
        "owner_id",
        "partner_id",
        "frequency_id",
        "interest_group_id",
        "name",
        "description",
        "date",
        "start_time",
        "end_time",
        "state",
        "sync_status",
        "deleted",
    ];

    fn from_draft(draft: ActivityDraft) -> Result<Self, ModelError> {
        draft.into_activity()
    }

    fn apply_patch(&mut self, patch: ActivityPatch) -> Result<(), ModelError> {
        patch.apply_to(self)
    }

    fn validate(&self) -> Result<(), ModelError> {
        Activity::validate(self)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self) {
        Activity::mark_deleted(self);
    }

    fn clear_deleted(&mut self) {
        self.deleted = false;
    }

    fn to_row_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            text_value(self.program_id.as_deref()),
            text_value(self.site_id.as_deref()),
            text_value(self.activity_type_id.as_deref()),
            text_value(self.owner_id.as_deref()),
            text_value(self.partner_id.as_deref()),
            text_value(self.frequency_id.as_deref()),
            text_value(self.interest_group_id.as_deref()),
            Value::Text(self.name.clone()),
            text_value(self.description.as_deref()),
            integer_value(self.date),
            text_value(self.start_time.as_deref()),
            text_value(self.end_time.as_deref()),
            Value::Text(self.state.as_db_str().to_string()),
            Value::Text(self.sync_status.as_db_str().to_string()),
            bool_value(self.deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let state_text: String = row.get("state")?;
        let state = ActivityState::parse_db(&state_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid state `{state_text}` in activities.state"))
        })?;

        Ok(Self {
            id: row.get("id")?,
            program_id: row.get("program_id")?,
            site_id: row.get("site_id")?,
            activity_type_id: row.get("activity_type_id")?,
            owner_id: row.get("owner_id")?,
            partner_id: row.get("partner_id")?,
            frequency_id: row.get("frequency_id")?,
            interest_group_id: row.get("interest_group_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            date: row.get("date")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            state,
            sync_status: parse_status_column(row, Self::TABLE)?,
            deleted: parse_bool_column(row, Self::TABLE, "deleted")?,
        })
    }

    fn cascade_delete(conn: &Connection, id: &str) -> RepoResult<()> {
        let mut stmt = conn.prepare(
            "SELECT id
             FROM sessions
             WHERE activity_id = ?1
               AND deleted = 0
             ORDER BY id ASC;",
        )?;
        let session_ids = stmt
            .query_map([id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        for session_id in &session_ids {
            delete_record::<Session>(conn, session_id, true)?;
        }

        debug!(
            "event=activity_cascade module=repo status=ok activity_id={} sessions={}",
            id,
            session_ids.len()
        );
        Ok(())
    }
}

impl SyncRecord for Session {
    type Draft = SessionDraft;
    type Patch = SessionPatch;

    const KIND: &'static str = "session";
    const TABLE: &'static str = "sessions";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "activity_id",
        "date",
        "start_time",
        "end_time",
        "attendee_count",
        "description",
        "media_ref",
        "sync_status",
        "deleted",
    ];

    fn from_draft(draft: SessionDraft) -> Result<Self, ModelError> {
        draft.into_session()
    }

    fn apply_patch(&mut self, patch: SessionPatch) -> Result<(), ModelError> {
        patch.apply_to(self)
    }

    fn validate(&self) -> Result<(), ModelError> {
        Session::validate(self)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn clear_deleted(&mut self) {
        self.deleted = false;
    }

    fn to_row_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            Value::Text(self.activity_id.clone()),
            integer_value(self.date),
            text_value(self.start_time.as_deref()),
            text_value(self.end_time.as_deref()),
            Value::Integer(self.attendee_count),
            text_value(self.description.as_deref()),
            text_value(self.media_ref.as_deref()),
            Value::Text(self.sync_status.as_db_str().to_string()),
            bool_value(self.deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            activity_id: row.get("activity_id")?,
            date: row.get("date")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            attendee_count: row.get("attendee_count")?,
            description: row.get("description")?,
            media_ref: row.get("media_ref")?,
            sync_status: parse_status_column(row, Self::TABLE)?,
            deleted: parse_bool_column(row, Self::TABLE, "deleted")?,
        })
    }

    fn cascade_delete(conn: &Connection, id: &str) -> RepoResult<()> {
        let still_stored: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        if still_stored {
            return Ok(());
        }

        let dropped = conn.execute(
            "DELETE FROM attendances
             WHERE session_id = ?1
               AND sync_status = 'pending_create';",
            [id],
        )?;
        debug!(
            "event=session_cascade module=repo status=ok session_id={} attendances_dropped={}",
            id, dropped
        );
        Ok(())
    }
}

impl SyncRecord for Attendance {
    type Draft = AttendanceDraft;
    type Patch = AttendancePatch;

    const KIND: &'static str = "attendance";
    const TABLE: &'static str = "attendances";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "session_id",
        "activity_id",
        "person_id",
        "sync_status",
        "deleted",
    ];

    fn from_draft(draft: AttendanceDraft) -> Result<Self, ModelError> {
        Ok(draft.into_attendance())
    }

    fn apply_patch(&mut self, patch: AttendancePatch) -> Result<(), ModelError> {
        patch.apply_to(self);
        Ok(())
    }

    fn validate(&self) -> Result<(), ModelError> {
        Attendance::validate(self)
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn set_sync_status(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    fn clear_deleted(&mut self) {
        self.deleted = false;
    }

    fn to_row_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            text_value(self.session_id.as_deref()),
            text_value(self.activity_id.as_deref()),
            Value::Text(self.person_id.clone()),
            Value::Text(self.sync_status.as_db_str().to_string()),
            bool_value(self.deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            session_id: row.get("session_id")?,
            activity_id: row.get("activity_id")?,
            person_id: row.get("person_id")?,
            sync_status: parse_status_column(row, Self::TABLE)?,
            deleted: parse_bool_column(row, Self::TABLE, "deleted")?,
        })
    }
}

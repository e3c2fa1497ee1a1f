//! Session (single dated occurrence of an activity) record.

use crate::model::activity::replace_if_some;
use crate::model::date::{deserialize_optional_date, normalize_optional, DateInput};
use crate::model::sync_status::SyncStatus;
use crate::model::validation::{check_time_range, require_text, ModelError};
use crate::model::new_record_id;
use serde::{Deserialize, Serialize};

/// One dated occurrence of an activity.
///
/// `attendee_count` is informational only; views recompute it from
/// non-deleted attendance rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(alias = "id_sesion")]
    pub id: String,
    #[serde(alias = "id_actividad")]
    pub activity_id: String,
    #[serde(
        default,
        alias = "fecha_sesion",
        deserialize_with = "deserialize_optional_date"
    )]
    pub date: Option<i64>,
    #[serde(default, alias = "hora_inicio")]
    pub start_time: Option<String>,
    #[serde(default, alias = "hora_fin")]
    pub end_time: Option<String>,
    #[serde(default, alias = "nro_asistentes")]
    pub attendee_count: i64,
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
    /// Reference to the photographic evidence attached to this session.
    #[serde(default, alias = "img")]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub deleted: bool,
}

impl Session {
    pub fn validate(&self) -> Result<(), ModelError> {
        require_text("id", &self.id)?;
        require_text("activity_id", &self.activity_id)?;
        if self.attendee_count < 0 {
            return Err(ModelError::NegativeCount("attendee_count"));
        }
        check_time_range(self.start_time.as_deref(), self.end_time.as_deref())
    }
}

/// Create input for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDraft {
    pub id: Option<String>,
    pub activity_id: String,
    pub date: Option<DateInput>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub media_ref: Option<String>,
}

impl SessionDraft {
    pub fn into_session(self) -> Result<Session, ModelError> {
        let date = normalize_optional("date", self.date.as_ref())?;
        Ok(Session {
            id: self.id.unwrap_or_else(new_record_id),
            activity_id: self.activity_id,
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            attendee_count: 0,
            description: self.description,
            media_ref: self.media_ref,
            sync_status: SyncStatus::PendingCreate,
            deleted: false,
        })
    }
}

/// Partial update for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPatch {
    pub date: Option<DateInput>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub attendee_count: Option<i64>,
    pub description: Option<String>,
    pub media_ref: Option<String>,
}

impl SessionPatch {
    pub fn apply_to(self, session: &mut Session) -> Result<(), ModelError> {
        if let Some(date) = normalize_optional("date", self.date.as_ref())? {
            session.date = Some(date);
        }
        replace_if_some(&mut session.start_time, self.start_time);
        replace_if_some(&mut session.end_time, self.end_time);
        replace_if_some(&mut session.description, self.description);
        replace_if_some(&mut session.media_ref, self.media_ref);
        if let Some(count) = self.attendee_count {
            session.attendee_count = count;
        }
        Ok(())
    }
}

//! Attendance (one person at one session) record.

use crate::model::activity::replace_if_some;
use crate::model::sync_status::SyncStatus;
use crate::model::validation::{require_text, ModelError};
use crate::model::new_record_id;
use serde::{Deserialize, Serialize};

/// One person's presence at one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(alias = "id_asistencia")]
    pub id: String,
    /// Rows without a session are never pushed.
    #[serde(default, alias = "id_sesion")]
    pub session_id: Option<String>,
    /// Denormalized parent activity of the session.
    #[serde(default, alias = "id_actividad")]
    pub activity_id: Option<String>,
    #[serde(alias = "id_persona")]
    pub person_id: String,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub deleted: bool,
}

impl Attendance {
    pub fn validate(&self) -> Result<(), ModelError> {
        require_text("id", &self.id)?;
        require_text("person_id", &self.person_id)
    }
}

/// Create input for an attendance row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceDraft {
    pub id: Option<String>,
    pub session_id: Option<String>,
    pub activity_id: Option<String>,
    pub person_id: String,
}

impl AttendanceDraft {
    pub fn into_attendance(self) -> Attendance {
        Attendance {
            id: self.id.unwrap_or_else(new_record_id),
            session_id: self.session_id,
            activity_id: self.activity_id,
            person_id: self.person_id,
            sync_status: SyncStatus::PendingCreate,
            deleted: false,
        }
    }
}

/// Partial update for an attendance row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendancePatch {
    pub session_id: Option<String>,
    pub activity_id: Option<String>,
    pub person_id: Option<String>,
}

impl AttendancePatch {
    pub fn apply_to(self, attendance: &mut Attendance) {
        replace_if_some(&mut attendance.session_id, self.session_id);
        replace_if_some(&mut attendance.activity_id, self.activity_id);
        if let Some(person_id) = self.person_id {
            attendance.person_id = person_id;
        }
    }
}

//! Wire payloads for remote mutations.
//!
//! Optional fields are always present on the wire, as `null` when unset.
//! Dates cross the boundary as `YYYY-MM-DD`.

use crate::model::{to_calendar_date, Activity, Attendance, Session};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityPayload {
    #[serde(rename = "id_actividad")]
    pub id: String,
    #[serde(rename = "id_programa")]
    pub program_id: Option<String>,
    #[serde(rename = "id_sede")]
    pub site_id: Option<String>,
    #[serde(rename = "id_tipo_actividad")]
    pub activity_type_id: Option<String>,
    #[serde(rename = "id_responsable")]
    pub owner_id: Option<String>,
    #[serde(rename = "id_aliado")]
    pub partner_id: Option<String>,
    #[serde(rename = "id_frecuencia")]
    pub frequency_id: Option<String>,
    #[serde(rename = "id_grupo_interes")]
    pub interest_group_id: Option<String>,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "fecha_actividad")]
    pub date: Option<String>,
    #[serde(rename = "hora_inicio")]
    pub start_time: Option<String>,
    #[serde(rename = "hora_fin")]
    pub end_time: Option<String>,
    #[serde(rename = "estado")]
    pub state: String,
}

impl From<&Activity> for ActivityPayload {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            program_id: activity.program_id.clone(),
            site_id: activity.site_id.clone(),
            activity_type_id: activity.activity_type_id.clone(),
            owner_id: activity.owner_id.clone(),
            partner_id: activity.partner_id.clone(),
            frequency_id: activity.frequency_id.clone(),
            interest_group_id: activity.interest_group_id.clone(),
            name: activity.name.clone(),
            description: activity.description.clone(),
            date: activity.date.and_then(to_calendar_date),
            start_time: activity.start_time.clone(),
            end_time: activity.end_time.clone(),
            state: activity.state.as_db_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPayload {
    #[serde(rename = "id_sesion")]
    pub id: String,
    #[serde(rename = "id_actividad")]
    pub activity_id: String,
    #[serde(rename = "fecha_sesion")]
    pub date: Option<String>,
    #[serde(rename = "hora_inicio")]
    pub start_time: Option<String>,
    #[serde(rename = "hora_fin")]
    pub end_time: Option<String>,
    #[serde(rename = "nro_asistentes")]
    pub attendee_count: i64,
    #[serde(rename = "descripcion")]
    pub description: Option<String>,
    #[serde(rename = "img")]
    pub media_ref: Option<String>,
}

impl SessionPayload {
    /// Builds the payload with a recomputed attendee count.
    pub fn new(session: &Session, attendee_count: i64) -> Self {
        Self {
            id: session.id.clone(),
            activity_id: session.activity_id.clone(),
            date: session.date.and_then(to_calendar_date),
            start_time: session.start_time.clone(),
            end_time: session.end_time.clone(),
            attendee_count,
            description: session.description.clone(),
            media_ref: session.media_ref.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendeePayload {
    #[serde(rename = "id_asistencia")]
    pub id: String,
    #[serde(rename = "id_sesion")]
    pub session_id: String,
    #[serde(rename = "id_persona")]
    pub person_id: String,
}

/// Full roster of one session, upserted remotely in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceBatchPayload {
    #[serde(rename = "id_sesion")]
    pub session_id: String,
    #[serde(rename = "id_actividad")]
    pub activity_id: Option<String>,
    #[serde(rename = "asistentes")]
    pub attendees: Vec<AttendeePayload>,
}

impl AttendanceBatchPayload {
    pub fn new(session_id: &str, activity_id: Option<String>, records: &[Attendance]) -> Self {
        Self {
            session_id: session_id.to_string(),
            activity_id,
            attendees: records
                .iter()
                .map(|record| AttendeePayload {
                    id: record.id.clone(),
                    session_id: session_id.to_string(),
                    person_id: record.person_id.clone(),
                })
                .collect(),
        }
    }
}

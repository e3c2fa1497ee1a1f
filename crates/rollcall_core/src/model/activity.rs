//! Activity (recurring event series) record.
//!
//! # Invariants
//! - `state == Deleted` is the lifecycle tombstone used by read queries.
//! - `deleted == true` marks a tombstone that still has to reach the remote
//!   service; it is cleared on acknowledgement while `state` stays `Deleted`.

use crate::model::date::{deserialize_optional_date, normalize_optional, DateInput};
use crate::model::sync_status::SyncStatus;
use crate::model::validation::{check_time_range, require_text, ModelError};
use crate::model::new_record_id;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    #[default]
    Active,
    Deleted,
}

impl ActivityState {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse_db(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// A recurring event series owned by one site/program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(alias = "id_actividad")]
    pub id: String,
    #[serde(default, alias = "id_programa")]
    pub program_id: Option<String>,
    #[serde(default, alias = "id_sede")]
    pub site_id: Option<String>,
    #[serde(default, alias = "id_tipo_actividad")]
    pub activity_type_id: Option<String>,
    #[serde(default, alias = "id_responsable")]
    pub owner_id: Option<String>,
    #[serde(default, alias = "id_aliado")]
    pub partner_id: Option<String>,
    #[serde(default, alias = "id_frecuencia")]
    pub frequency_id: Option<String>,
    /// Beneficiary interest group whose members are roster candidates.
    #[serde(default, alias = "id_grupo_interes")]
    pub interest_group_id: Option<String>,
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
    /// UTC-midnight epoch milliseconds.
    #[serde(
        default,
        alias = "fecha_actividad",
        deserialize_with = "deserialize_optional_date"
    )]
    pub date: Option<i64>,
    #[serde(default, alias = "hora_inicio")]
    pub start_time: Option<String>,
    #[serde(default, alias = "hora_fin")]
    pub end_time: Option<String>,
    #[serde(default, alias = "estado")]
    pub state: ActivityState,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub deleted: bool,
}

impl Activity {
    pub fn validate(&self) -> Result<(), ModelError> {
        require_text("id", &self.id)?;
        require_text("name", &self.name)?;
        check_time_range(self.start_time.as_deref(), self.end_time.as_deref())
    }

    /// Tombstones the activity and flags the deletion for the remote service.
    pub fn mark_deleted(&mut self) {
        self.state = ActivityState::Deleted;
        self.deleted = true;
    }

    pub fn is_active(&self) -> bool {
        self.state == ActivityState::Active
    }
}

/// Create input for an activity; dates may be calendar strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityDraft {
    /// Generated when absent.
    pub id: Option<String>,
    pub program_id: Option<String>,
    pub site_id: Option<String>,
    pub activity_type_id: Option<String>,
    pub owner_id: Option<String>,
    pub partner_id: Option<String>,
    pub frequency_id: Option<String>,
    pub interest_group_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub date: Option<DateInput>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl ActivityDraft {
    pub fn into_activity(self) -> Result<Activity, ModelError> {
        let date = normalize_optional("date", self.date.as_ref())?;
        Ok(Activity {
            id: self.id.unwrap_or_else(new_record_id),
            program_id: self.program_id,
            site_id: self.site_id,
            activity_type_id: self.activity_type_id,
            owner_id: self.owner_id,
            partner_id: self.partner_id,
            frequency_id: self.frequency_id,
            interest_group_id: self.interest_group_id,
            name: self.name,
            description: self.description,
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            state: ActivityState::Active,
            sync_status: SyncStatus::PendingCreate,
            deleted: false,
        })
    }
}

/// Partial update for an activity. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityPatch {
    pub program_id: Option<String>,
    pub site_id: Option<String>,
    pub activity_type_id: Option<String>,
    pub owner_id: Option<String>,
    pub partner_id: Option<String>,
    pub frequency_id: Option<String>,
    pub interest_group_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateInput>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl ActivityPatch {
    pub fn apply_to(self, activity: &mut Activity) -> Result<(), ModelError> {
        if let Some(date) = normalize_optional("date", self.date.as_ref())? {
            activity.date = Some(date);
        }
        replace_if_some(&mut activity.program_id, self.program_id);
        replace_if_some(&mut activity.site_id, self.site_id);
        replace_if_some(&mut activity.activity_type_id, self.activity_type_id);
        replace_if_some(&mut activity.owner_id, self.owner_id);
        replace_if_some(&mut activity.partner_id, self.partner_id);
        replace_if_some(&mut activity.frequency_id, self.frequency_id);
        replace_if_some(&mut activity.interest_group_id, self.interest_group_id);
        replace_if_some(&mut activity.description, self.description);
        replace_if_some(&mut activity.start_time, self.start_time);
        replace_if_some(&mut activity.end_time, self.end_time);
        if let Some(name) = self.name {
            activity.name = name;
        }
        Ok(())
    }
}

pub(crate) fn replace_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

//! Read-mostly reference records loaded wholesale by cold load.
//!
//! These records carry no sync state; the remote service is authoritative.

use serde::{Deserialize, Serialize};

/// Parameter set holding activity types.
pub const PARAMETER_SET_ACTIVITY_TYPE: &str = "activity_type";
/// Parameter set holding activity frequencies.
pub const PARAMETER_SET_FREQUENCY: &str = "frequency";

/// A beneficiary or participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(alias = "id_persona")]
    pub id: String,
    #[serde(default, alias = "documento")]
    pub document_number: Option<String>,
    #[serde(alias = "nombres")]
    pub first_name: String,
    #[serde(default, alias = "apellidos")]
    pub last_name: Option<String>,
}

impl Person {
    pub fn full_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name.trim()),
            _ => self.first_name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(alias = "id_sede")]
    pub id: String,
    #[serde(alias = "nombre")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    #[serde(alias = "id_aliado")]
    pub id: String,
    #[serde(alias = "nombre")]
    pub name: String,
}

/// One entry of a named parameter set (activity types, frequencies, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(alias = "id_parametro")]
    pub id: String,
    #[serde(alias = "id_conjunto")]
    pub set_id: String,
    #[serde(alias = "nombre")]
    pub name: String,
    /// Activity-type policy: sessions must carry photographic evidence.
    #[serde(default, alias = "requiere_foto")]
    pub requires_photo: bool,
}

/// Staff member able to own activities, with assigned sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "id_usuario")]
    pub id: String,
    #[serde(alias = "nombre")]
    pub display_name: String,
    /// Empty means the user is not restricted to any site.
    #[serde(default, alias = "sedes")]
    pub site_ids: Vec<String>,
}

/// Membership of a person in a beneficiary interest group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    #[serde(alias = "id_grupo_interes")]
    pub group_id: String,
    #[serde(alias = "id_persona")]
    pub person_id: String,
}

#[cfg(test)]
mod tests {
    use super::Person;

    #[test]
    fn full_name_skips_blank_last_name() {
        let mut person = Person {
            id: "P1".to_string(),
            document_number: None,
            first_name: "Ana".to_string(),
            last_name: Some("  ".to_string()),
        };
        assert_eq!(person.full_name(), "Ana");

        person.last_name = Some("Rojas".to_string());
        assert_eq!(person.full_name(), "Ana Rojas");
    }
}

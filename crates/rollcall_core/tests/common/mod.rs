#![allow(dead_code)]

use async_trait::async_trait;
use rollcall_core::model::{Activity, ActivityState, Attendance, Session, SyncStatus};
use rollcall_core::remote::{GatewayError, GatewayResult, RemoteTransport};
use rollcall_core::LocalStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const MARCH_5_2024: i64 = 1_709_596_800_000;
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub fn memory_store() -> LocalStore {
    LocalStore::open_in_memory().unwrap()
}

pub fn synced_activity(id: &str, site_id: Option<&str>) -> Activity {
    Activity {
        id: id.to_string(),
        program_id: None,
        site_id: site_id.map(str::to_string),
        activity_type_id: None,
        owner_id: None,
        partner_id: None,
        frequency_id: None,
        interest_group_id: None,
        name: format!("activity {id}"),
        description: None,
        date: Some(MARCH_5_2024),
        start_time: Some("09:00".to_string()),
        end_time: Some("10:00".to_string()),
        state: ActivityState::Active,
        sync_status: SyncStatus::Synced,
        deleted: false,
    }
}

pub fn synced_session(id: &str, activity_id: &str, date: i64) -> Session {
    Session {
        id: id.to_string(),
        activity_id: activity_id.to_string(),
        date: Some(date),
        start_time: Some("09:00".to_string()),
        end_time: Some("10:00".to_string()),
        attendee_count: 0,
        description: None,
        media_ref: None,
        sync_status: SyncStatus::Synced,
        deleted: false,
    }
}

pub fn synced_attendance(id: &str, session_id: &str, person_id: &str) -> Attendance {
    Attendance {
        id: id.to_string(),
        session_id: Some(session_id.to_string()),
        activity_id: None,
        person_id: person_id.to_string(),
        sync_status: SyncStatus::Synced,
        deleted: false,
    }
}

struct Rejection {
    operation: String,
    field: String,
    value: String,
    message: String,
}

#[derive(Default)]
struct MockState {
    reachable: bool,
    calls: Vec<(String, Value)>,
    rejections: Vec<Rejection>,
    transport_failures: Vec<String>,
    pages: HashMap<String, Vec<Value>>,
}

/// Scripted in-memory remote service that records every request.
///
/// Pings answer `pong` while reachable; mutations succeed unless a rejection
/// matches; queries serve scripted pages, or one empty page.
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn online() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                reachable: true,
                ..MockState::default()
            }),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState::default()),
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().reachable = reachable;
    }

    /// Answers `exitoso='N'` when `input[field] == value` for `operation`.
    pub fn reject(&self, operation: &str, field: &str, value: &str, message: &str) {
        self.state.lock().unwrap().rejections.push(Rejection {
            operation: operation.to_string(),
            field: field.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        });
    }

    /// Fails every `operation` call at the transport level.
    pub fn fail_transport(&self, operation: &str) {
        self.state
            .lock()
            .unwrap()
            .transport_failures
            .push(operation.to_string());
    }

    /// Serves `pages` (each a JSON array of items) for a query operation.
    pub fn serve_pages(&self, operation: &str, pages: Vec<Value>) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(operation.to_string(), pages);
    }

    pub fn calls(&self, operation: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(name, _)| name == operation)
            .map(|(_, variables)| variables.clone())
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    fn respond(&self, operation: &str, variables: &Value) -> GatewayResult<Value> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push((operation.to_string(), variables.clone()));

        if !state.reachable {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        if operation == "ping" {
            return Ok(json!({ "ping": "pong" }));
        }
        if state
            .transport_failures
            .iter()
            .any(|failing| failing == operation)
        {
            return Err(GatewayError::Transport("timed out".to_string()));
        }

        if let Some(pages) = state.pages.get(operation) {
            let page = variables["page"].as_u64().unwrap_or(0) as usize;
            let items = pages.get(page).cloned().unwrap_or_else(|| json!([]));
            return Ok(json!({
                operation: { "items": items, "hasMore": page + 1 < pages.len() }
            }));
        }
        if variables.get("page").is_some() {
            return Ok(json!({ operation: { "items": [], "hasMore": false } }));
        }

        let input = &variables["input"];
        let rejection = state.rejections.iter().find(|rejection| {
            rejection.operation == operation
                && input[rejection.field.as_str()].as_str() == Some(rejection.value.as_str())
        });
        Ok(match rejection {
            Some(rejection) => json!({
                operation: { "exitoso": "N", "mensaje": rejection.message }
            }),
            None => json!({ operation: { "exitoso": "S", "mensaje": "ok" } }),
        })
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn request(&self, operation: &str, variables: Value) -> GatewayResult<Value> {
        self.respond(operation, &variables)
    }
}

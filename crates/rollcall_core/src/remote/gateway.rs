//! Typed wrapper over the remote transport.
//!
//! # Responsibility
//! - Map domain payloads to named operations and their variables.
//! - Parse `{<operation>: {exitoso, mensaje}}` mutation envelopes and paged
//!   query responses.
//!
//! # Invariants
//! - A missing envelope key is `MalformedResponse`, never a silent success.

use crate::remote::payload::{ActivityPayload, AttendanceBatchPayload, SessionPayload};
use crate::remote::{GatewayError, GatewayResult, RemoteTransport};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

/// Remote operation names.
pub mod ops {
    pub const PING: &str = "ping";
    pub const CREATE_ACTIVITY: &str = "createActivity";
    pub const CREATE_SESSION: &str = "createSession";
    pub const UPDATE_SESSION: &str = "updateSession";
    pub const DELETE_SESSION: &str = "deleteSession";
    pub const SAVE_ATTENDANCE: &str = "saveAttendance";

    pub const QUERY_PEOPLE: &str = "people";
    pub const QUERY_SITES: &str = "sites";
    pub const QUERY_PARTNERS: &str = "partners";
    pub const QUERY_PARAMETERS: &str = "parameters";
    pub const QUERY_USERS: &str = "users";
    pub const QUERY_GROUP_MEMBERS: &str = "groupMembers";
    pub const QUERY_ACTIVITIES: &str = "activities";
    pub const QUERY_SESSIONS: &str = "sessions";
    pub const QUERY_ATTENDANCES: &str = "attendances";
}

/// Outcome of one remote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReply {
    pub ok: bool,
    pub message: String,
}

/// One page of a remote query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPage<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

#[derive(Debug, Clone)]
pub struct RemoteGateway<T> {
    transport: T,
}

impl<T: RemoteTransport> RemoteGateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the service's ping answer; reachable services answer `pong`.
    pub async fn ping(&self) -> GatewayResult<String> {
        let response = self.transport.request(ops::PING, json!({})).await?;
        let answer = match &response {
            Value::String(answer) => Some(answer.clone()),
            Value::Object(map) => map
                .get(ops::PING)
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        };
        answer.ok_or_else(|| malformed(ops::PING, "missing ping answer"))
    }

    /// Activities are always sent with create semantics; the service upserts.
    pub async fn create_activity(&self, payload: &ActivityPayload) -> GatewayResult<MutationReply> {
        self.mutate(ops::CREATE_ACTIVITY, payload).await
    }

    pub async fn create_session(&self, payload: &SessionPayload) -> GatewayResult<MutationReply> {
        self.mutate(ops::CREATE_SESSION, payload).await
    }

    pub async fn update_session(&self, payload: &SessionPayload) -> GatewayResult<MutationReply> {
        self.mutate(ops::UPDATE_SESSION, payload).await
    }

    pub async fn delete_session(&self, session_id: &str) -> GatewayResult<MutationReply> {
        self.mutate(ops::DELETE_SESSION, &json!({ "id_sesion": session_id }))
            .await
    }

    pub async fn save_attendance(
        &self,
        payload: &AttendanceBatchPayload,
    ) -> GatewayResult<MutationReply> {
        self.mutate(ops::SAVE_ATTENDANCE, payload).await
    }

    /// Fetches one page (zero-based) of a query operation.
    pub async fn query_page<R: DeserializeOwned>(
        &self,
        operation: &str,
        page: u32,
        page_size: u32,
    ) -> GatewayResult<QueryPage<R>> {
        let response = self
            .transport
            .request(operation, json!({ "page": page, "pageSize": page_size }))
            .await?;
        let body = envelope_body(operation, response)?;

        let (items, has_more) = match body {
            Value::Array(items) => (Value::Array(items), false),
            Value::Object(mut map) => {
                let items = map
                    .remove("items")
                    .ok_or_else(|| malformed(operation, "missing `items`"))?;
                let has_more = map
                    .get("hasMore")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                (items, has_more)
            }
            _ => return Err(malformed(operation, "query body is not a page")),
        };

        let items: Vec<R> = serde_json::from_value(items)?;
        debug!(
            "event=remote_query module=remote status=ok operation={} page={} count={} has_more={}",
            operation,
            page,
            items.len(),
            has_more
        );
        Ok(QueryPage { items, has_more })
    }

    async fn mutate<P: Serialize + ?Sized>(
        &self,
        operation: &str,
        payload: &P,
    ) -> GatewayResult<MutationReply> {
        let variables = json!({ "input": serde_json::to_value(payload)? });
        let response = self.transport.request(operation, variables).await?;
        parse_mutation_reply(operation, response)
    }
}

/// Reads the `{exitoso: 'S'|'N', mensaje}` envelope of `operation`.
pub fn parse_mutation_reply(operation: &str, response: Value) -> GatewayResult<MutationReply> {
    let body = envelope_body(operation, response)?;
    let flag = body
        .get("exitoso")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(operation, "missing `exitoso`"))?;
    let ok = match flag.trim().to_ascii_uppercase().as_str() {
        "S" => true,
        "N" => false,
        other => {
            return Err(malformed(
                operation,
                &format!("unexpected `exitoso` value `{other}`"),
            ))
        }
    };
    let message = body
        .get("mensaje")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(MutationReply { ok, message })
}

fn envelope_body(operation: &str, response: Value) -> GatewayResult<Value> {
    match response {
        Value::Object(mut map) => map
            .remove(operation)
            .ok_or_else(|| malformed(operation, "missing operation key")),
        _ => Err(malformed(operation, "response is not an object")),
    }
}

fn malformed(operation: &str, detail: &str) -> GatewayError {
    GatewayError::MalformedResponse {
        operation: operation.to_string(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_mutation_reply;
    use crate::remote::GatewayError;
    use serde_json::json;

    #[test]
    fn parses_success_and_business_failure() {
        let ok = parse_mutation_reply(
            "createSession",
            json!({ "createSession": { "exitoso": "S", "mensaje": "saved" } }),
        )
        .unwrap();
        assert!(ok.ok);
        assert_eq!(ok.message, "saved");

        let failed = parse_mutation_reply(
            "createSession",
            json!({ "createSession": { "exitoso": "N", "mensaje": "duplicate" } }),
        )
        .unwrap();
        assert!(!failed.ok);
        assert_eq!(failed.message, "duplicate");
    }

    #[test]
    fn missing_operation_key_is_malformed() {
        let err = parse_mutation_reply(
            "createSession",
            json!({ "updateSession": { "exitoso": "S" } }),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
    }

    #[test]
    fn unknown_flag_is_malformed() {
        let err = parse_mutation_reply(
            "saveAttendance",
            json!({ "saveAttendance": { "exitoso": "maybe" } }),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse { .. }));
    }
}

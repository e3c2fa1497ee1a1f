//! Remote service boundary.
//!
//! # Responsibility
//! - Define the request/response transport seam the host application
//!   implements (HTTP, GraphQL, test doubles).
//! - Provide a typed gateway over named operations and their envelopes.
//!
//! # Invariants
//! - Business failures (`exitoso='N'`) are reply values, never errors.
//! - Timeouts and retries below one request belong to the transport.

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod gateway;
pub mod payload;

pub use gateway::{ops, MutationReply, QueryPage, RemoteGateway};
pub use payload::{ActivityPayload, AttendanceBatchPayload, AttendeePayload, SessionPayload};

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug)]
pub enum GatewayError {
    /// The request never produced a response (offline, timeout, refused).
    Transport(String),
    /// The response does not carry the expected envelope.
    MalformedResponse {
        operation: String,
        detail: String,
    },
    Serialization(serde_json::Error),
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "remote transport failed: {message}"),
            Self::MalformedResponse { operation, detail } => {
                write!(f, "malformed `{operation}` response: {detail}")
            }
            Self::Serialization(err) => write!(f, "remote payload serialization failed: {err}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(_) => None,
            Self::MalformedResponse { .. } => None,
            Self::Serialization(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Request/response channel to the remote service.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Sends one named operation and returns the raw response document.
    async fn request(&self, operation: &str, variables: Value) -> GatewayResult<Value>;
}

#[async_trait]
impl<T: RemoteTransport + ?Sized> RemoteTransport for Arc<T> {
    async fn request(&self, operation: &str, variables: Value) -> GatewayResult<Value> {
        (**self).request(operation, variables).await
    }
}

//! Local reconciliation state.

use serde::{Deserialize, Serialize};

/// Synchronization state carried by every mutable record.
///
/// Records that arrive from the remote service without a status deserialize
/// as `Synced`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local state matches the last remote acknowledgement.
    #[default]
    Synced,
    /// Created locally and never seen by the remote service.
    PendingCreate,
    /// Known remotely, changed locally since.
    PendingUpdate,
    /// Known remotely, soft-deleted locally and awaiting remote deletion.
    PendingDelete,
}

impl SyncStatus {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::PendingCreate => "pending_create",
            Self::PendingUpdate => "pending_update",
            Self::PendingDelete => "pending_delete",
        }
    }

    pub fn parse_db(value: &str) -> Option<Self> {
        match value {
            "synced" => Some(Self::Synced),
            "pending_create" => Some(Self::PendingCreate),
            "pending_update" => Some(Self::PendingUpdate),
            "pending_delete" => Some(Self::PendingDelete),
            _ => None,
        }
    }

    /// State after a local edit.
    ///
    /// A record that never reached the remote stays `PendingCreate`.
    pub fn after_local_update(self) -> Self {
        match self {
            Self::PendingCreate => Self::PendingCreate,
            _ => Self::PendingUpdate,
        }
    }

    /// Whether a local delete must remove the row instead of tombstoning it.
    pub fn deletes_locally(self) -> bool {
        self == Self::PendingCreate
    }

    pub fn is_pending(self) -> bool {
        self != Self::Synced
    }
}

//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Translate repository and view results into flat response envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Structured inputs and outputs cross the boundary as JSON strings.
//! - One local store is opened lazily per process and shared by every call.
//! - Calls here only touch the local store. The host owns the remote
//!   transport, so it runs `ColdLoader` and `SyncScheduler` from
//!   `rollcall_core` against the same database file.

use log::warn;
use rollcall_core::repo::{ActivityEditContext, ActivityFormContext};
use rollcall_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ActivityDraft, ActivityPatch, ActivityRepository, AttendanceDraft, AttendanceRepository,
    CalendarView, DateInput, DeleteOutcome, LocalStore, PendingSummary, RepoResult, RosterView,
    SessionDraft, SessionPatch, SessionRepository,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

const DB_FILE_NAME: &str = "rollcall.sqlite3";
const DB_PATH_ENV: &str = "ROLLCALL_DB_PATH";

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static STORE: Mutex<Option<LocalStore>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Sets the database file used by every later call.
///
/// Must run before the first data call. Repeating the same path is a no-op;
/// a different path is rejected. Returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }

    let requested = PathBuf::from(trimmed);
    let active = DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "database already configured at `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        )
    }
}

/// Outcome envelope for mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Id of the created or affected record.
    pub record_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl EntryActionResponse {
    fn success(message: impl Into<String>, record_id: String) -> Self {
        Self {
            ok: true,
            record_id: Some(record_id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            record_id: None,
            message: message.into(),
        }
    }
}

/// Outcome envelope for queries; `payload` is JSON when `ok`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryQueryResponse {
    pub ok: bool,
    pub payload: String,
    pub message: String,
}

/// Creates an activity from a JSON `ActivityDraft`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the created activity id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn activity_create(draft_json: String) -> EntryActionResponse {
    let result = parse_json::<ActivityDraft>(&draft_json).and_then(|draft| {
        with_store(|store| ActivityRepository::new(store).create(draft))
    });
    created("activity_create", "Activity created.", result)
}

/// Applies a JSON `ActivityPatch` to an existing activity.
#[flutter_rust_bridge::frb(sync)]
pub fn activity_update(activity_id: String, patch_json: String) -> EntryActionResponse {
    let result = parse_json::<ActivityPatch>(&patch_json).and_then(|patch| {
        with_store(|store| ActivityRepository::new(store).update(&activity_id, patch))
    });
    updated("activity_update", "Activity updated.", activity_id, result)
}

/// Deletes an activity and cascades to its sessions.
#[flutter_rust_bridge::frb(sync)]
pub fn activity_delete(activity_id: String, soft: bool) -> EntryActionResponse {
    let result = with_store(|store| ActivityRepository::new(store).delete(&activity_id, soft));
    deleted("activity_delete", activity_id, result)
}

/// Creates a session from a JSON `SessionDraft`.
#[flutter_rust_bridge::frb(sync)]
pub fn session_create(draft_json: String) -> EntryActionResponse {
    let result = parse_json::<SessionDraft>(&draft_json)
        .and_then(|draft| with_store(|store| SessionRepository::new(store).create(draft)));
    created("session_create", "Session created.", result)
}

/// Applies a JSON `SessionPatch` to an existing session.
#[flutter_rust_bridge::frb(sync)]
pub fn session_update(session_id: String, patch_json: String) -> EntryActionResponse {
    let result = parse_json::<SessionPatch>(&patch_json).and_then(|patch| {
        with_store(|store| SessionRepository::new(store).update(&session_id, patch))
    });
    updated("session_update", "Session updated.", session_id, result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn session_delete(session_id: String, soft: bool) -> EntryActionResponse {
    let result = with_store(|store| SessionRepository::new(store).delete(&session_id, soft));
    deleted("session_delete", session_id, result)
}

/// Records one person's attendance from a JSON `AttendanceDraft`.
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_record(draft_json: String) -> EntryActionResponse {
    let result = parse_json::<AttendanceDraft>(&draft_json)
        .and_then(|draft| with_store(|store| AttendanceRepository::new(store).create(draft)));
    created("attendance_record", "Attendance recorded.", result)
}

/// Removes a carried-over or mistaken attendance row.
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_delete(attendance_id: String) -> EntryActionResponse {
    let result =
        with_store(|store| AttendanceRepository::new(store).delete(&attendance_id, true));
    deleted("attendance_delete", attendance_id, result)
}

/// Calendar events visible to `user_id` between two dates (`YYYY-MM-DD`).
#[flutter_rust_bridge::frb(sync)]
pub fn calendar_events(user_id: String, from: String, to: String) -> EntryQueryResponse {
    let from = DateInput::from(from.as_str());
    let to = DateInput::from(to.as_str());
    query(
        "calendar_events",
        with_store(|store| CalendarView::new(store).build(&user_id, &from, &to)),
    )
}

/// Attendance roster of one session; payload is `null` when absent.
#[flutter_rust_bridge::frb(sync)]
pub fn attendance_roster(session_id: String) -> EntryQueryResponse {
    query(
        "attendance_roster",
        with_store(|store| RosterView::new(store).build(&session_id)),
    )
}

/// Reference data for the activity creation form.
#[flutter_rust_bridge::frb(sync)]
pub fn activity_form_context(user_id: String) -> EntryQueryResponse {
    let result: Result<ActivityFormContext, String> =
        with_store(|store| ActivityRepository::new(store).build_pre_create_context(&user_id));
    query("activity_form_context", result)
}

/// Reference data plus the activity being edited; `null` when absent.
#[flutter_rust_bridge::frb(sync)]
pub fn activity_edit_context(activity_id: String, user_id: String) -> EntryQueryResponse {
    let result: Result<Option<ActivityEditContext>, String> = with_store(|store| {
        ActivityRepository::new(store).build_pre_edit_context(&activity_id, &user_id)
    });
    query("activity_edit_context", result)
}

/// Per-table counts of records waiting for sync.
#[flutter_rust_bridge::frb(sync)]
pub fn pending_summary() -> EntryQueryResponse {
    query(
        "pending_summary",
        with_store(|store| PendingSummary::collect(&store)),
    )
}

fn created(
    operation: &str,
    message: &str,
    result: Result<String, String>,
) -> EntryActionResponse {
    match result {
        Ok(record_id) => EntryActionResponse::success(message, record_id),
        Err(err) => failed(operation, err),
    }
}

fn updated(
    operation: &str,
    message: &str,
    record_id: String,
    result: Result<(), String>,
) -> EntryActionResponse {
    match result {
        Ok(()) => EntryActionResponse::success(message, record_id),
        Err(err) => failed(operation, err),
    }
}

fn deleted(
    operation: &str,
    record_id: String,
    result: Result<DeleteOutcome, String>,
) -> EntryActionResponse {
    match result {
        Ok(DeleteOutcome::Hard) => EntryActionResponse::success("Deleted.", record_id),
        Ok(DeleteOutcome::Soft) => {
            EntryActionResponse::success("Marked for deletion.", record_id)
        }
        Err(err) => failed(operation, err),
    }
}

fn failed(operation: &str, err: String) -> EntryActionResponse {
    warn!("event=ffi_call module=ffi status=error operation={operation}");
    EntryActionResponse::failure(format!("{operation} failed: {err}"))
}

fn query<T: Serialize>(operation: &str, result: Result<T, String>) -> EntryQueryResponse {
    let serialized = result.and_then(|value| {
        serde_json::to_string(&value).map_err(|err| format!("serialization failed: {err}"))
    });
    match serialized {
        Ok(payload) => EntryQueryResponse {
            ok: true,
            payload,
            message: String::new(),
        },
        Err(err) => {
            warn!("event=ffi_call module=ffi status=error operation={operation}");
            EntryQueryResponse {
                ok: false,
                payload: String::new(),
                message: format!("{operation} failed: {err}"),
            }
        }
    }
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|err| format!("invalid input: {err}"))
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

/// Runs `f` with the shared store, opening it on first use.
fn with_store<T>(f: impl FnOnce(LocalStore) -> RepoResult<T>) -> Result<T, String> {
    let store = {
        let mut guard = STORE
            .lock()
            .map_err(|_| "local store handle is poisoned".to_string())?;
        match guard.as_ref() {
            Some(store) if store.is_open() => store.clone(),
            _ => {
                let store = LocalStore::open(resolve_db_path())
                    .map_err(|err| format!("local store open failed: {err}"))?;
                *guard = Some(store.clone());
                store
            }
        }
    };
    f(store).map_err(|err| err.to_string())
}

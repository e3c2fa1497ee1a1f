mod common;

use common::{
    memory_store, synced_activity, synced_attendance, synced_session, MockTransport, MARCH_5_2024,
};
use rollcall_core::model::{ActivityDraft, AttendanceDraft, SessionDraft, SessionPatch, SyncStatus};
use rollcall_core::remote::ops;
use rollcall_core::{
    ActivityRepository, AttendanceRepository, LocalStore, RemoteGateway, SessionRepository,
    SyncEngine,
};
use std::sync::Arc;

fn engine(store: &LocalStore, transport: &Arc<MockTransport>) -> SyncEngine<Arc<MockTransport>> {
    SyncEngine::new(store.clone(), RemoteGateway::new(transport.clone()))
}

fn create_activity(repo: &ActivityRepository, id: &str) {
    repo.create(ActivityDraft {
        id: Some(id.to_string()),
        name: format!("activity {id}"),
        site_id: Some("S1".to_string()),
        date: Some("2024-03-05".into()),
        ..ActivityDraft::default()
    })
    .unwrap();
}

fn record_attendance(repo: &AttendanceRepository, id: &str, session_id: &str, person_id: &str) {
    repo.create(AttendanceDraft {
        id: Some(id.to_string()),
        session_id: Some(session_id.to_string()),
        activity_id: Some("A1".to_string()),
        person_id: person_id.to_string(),
    })
    .unwrap();
}

#[tokio::test]
async fn unreachable_service_skips_cycle_without_other_calls() {
    let store = memory_store();
    let activities = ActivityRepository::new(store.clone());
    create_activity(&activities, "A1");
    let transport = MockTransport::offline();

    let report = engine(&store, &transport).run_cycle().await;

    assert!(!report.reachable);
    assert_eq!(report.total_attempted(), 0);
    assert_eq!(transport.total_calls(), 1);
    assert_eq!(transport.calls(ops::PING).len(), 1);
    assert_eq!(
        activities.get_by_id("A1").unwrap().unwrap().sync_status,
        SyncStatus::PendingCreate
    );
}

#[tokio::test]
async fn acknowledged_activity_becomes_synced() {
    let store = memory_store();
    let activities = ActivityRepository::new(store.clone());
    create_activity(&activities, "A1");
    let transport = MockTransport::online();

    let report = engine(&store, &transport).run_cycle().await;

    assert!(report.reachable);
    assert_eq!(report.activities.attempted, 1);
    assert_eq!(report.activities.synced, 1);
    let stored = activities.get_by_id("A1").unwrap().unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Synced);

    let calls = transport.calls(ops::CREATE_ACTIVITY);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["input"]["id_actividad"], "A1");
    assert_eq!(calls[0]["input"]["fecha_actividad"], "2024-03-05");
    assert_eq!(calls[0]["input"]["estado"], "active");
}

#[tokio::test]
async fn business_rejection_only_affects_rejected_record() {
    let store = memory_store();
    let activities = ActivityRepository::new(store.clone());
    create_activity(&activities, "A1");
    create_activity(&activities, "A2");
    create_activity(&activities, "A3");
    let transport = MockTransport::online();
    transport.reject(ops::CREATE_ACTIVITY, "id_actividad", "A2", "duplicate name");

    let report = engine(&store, &transport).run_cycle().await;

    assert_eq!(report.activities.attempted, 3);
    assert_eq!(report.activities.synced, 2);
    assert_eq!(report.activities.failed, 1);
    assert_eq!(
        activities.get_by_id("A1").unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );
    assert_eq!(
        activities.get_by_id("A2").unwrap().unwrap().sync_status,
        SyncStatus::PendingCreate
    );
    assert_eq!(
        activities.get_by_id("A3").unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn transport_failure_leaves_records_pending_for_next_cycle() {
    let store = memory_store();
    let sessions = SessionRepository::new(store.clone());
    sessions
        .create(SessionDraft {
            id: Some("SE1".to_string()),
            activity_id: "A1".to_string(),
            ..SessionDraft::default()
        })
        .unwrap();
    let transport = MockTransport::online();
    transport.fail_transport(ops::CREATE_SESSION);

    let report = engine(&store, &transport).run_cycle().await;

    assert_eq!(report.sessions.failed, 1);
    assert_eq!(
        sessions.get_by_id("SE1").unwrap().unwrap().sync_status,
        SyncStatus::PendingCreate
    );
}

#[tokio::test]
async fn deleted_activity_is_sent_with_deleted_state_then_cleared() {
    let store = memory_store();
    let activities = ActivityRepository::new(store.clone());
    activities.bulk_load(&[synced_activity("A1", None)]).unwrap();
    activities.delete("A1", true).unwrap();
    let transport = MockTransport::online();

    engine(&store, &transport).run_cycle().await;

    let calls = transport.calls(ops::CREATE_ACTIVITY);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["input"]["estado"], "deleted");
    let stored = activities.get_by_id("A1").unwrap().unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Synced);
    assert!(!stored.deleted);
}

#[tokio::test]
async fn sessions_dispatch_create_update_and_delete() {
    let store = memory_store();
    let sessions = SessionRepository::new(store.clone());
    sessions
        .bulk_load(&[
            synced_session("SE-update", "A1", MARCH_5_2024),
            synced_session("SE-delete", "A1", MARCH_5_2024),
        ])
        .unwrap();
    sessions
        .create(SessionDraft {
            id: Some("SE-create".to_string()),
            activity_id: "A1".to_string(),
            ..SessionDraft::default()
        })
        .unwrap();
    sessions
        .update(
            "SE-update",
            SessionPatch {
                description: Some("moved indoors".to_string()),
                ..SessionPatch::default()
            },
        )
        .unwrap();
    sessions.delete("SE-delete", true).unwrap();
    let transport = MockTransport::online();

    let report = engine(&store, &transport).run_cycle().await;

    assert_eq!(report.sessions.attempted, 3);
    assert_eq!(report.sessions.synced, 3);
    assert_eq!(transport.calls(ops::CREATE_SESSION).len(), 1);
    assert_eq!(transport.calls(ops::UPDATE_SESSION).len(), 1);
    let deletes = transport.calls(ops::DELETE_SESSION);
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0]["input"]["id_sesion"], "SE-delete");

    assert!(sessions.get_by_id("SE-delete").unwrap().is_none());
    assert_eq!(
        sessions.get_by_id("SE-create").unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );
    assert_eq!(
        sessions.get_by_id("SE-update").unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn rejected_session_delete_keeps_tombstone() {
    let store = memory_store();
    let sessions = SessionRepository::new(store.clone());
    sessions
        .bulk_load(&[synced_session("SE1", "A1", MARCH_5_2024)])
        .unwrap();
    sessions.delete("SE1", true).unwrap();
    let transport = MockTransport::online();
    transport.reject(ops::DELETE_SESSION, "id_sesion", "SE1", "has attendance");

    engine(&store, &transport).run_cycle().await;

    let stored = sessions.get_by_id("SE1").unwrap().unwrap();
    assert!(stored.deleted);
    assert_eq!(stored.sync_status, SyncStatus::PendingDelete);
}

#[tokio::test]
async fn session_payload_carries_recomputed_attendee_count() {
    let store = memory_store();
    let sessions = SessionRepository::new(store.clone());
    let attendances = AttendanceRepository::new(store.clone());
    let mut session = synced_session("SE1", "A1", MARCH_5_2024);
    session.attendee_count = 42;
    sessions.bulk_load(&[session]).unwrap();
    sessions
        .update(
            "SE1",
            SessionPatch {
                start_time: Some("08:30".to_string()),
                ..SessionPatch::default()
            },
        )
        .unwrap();
    attendances
        .bulk_load(&[
            synced_attendance("AT1", "SE1", "P1"),
            synced_attendance("AT2", "SE1", "P2"),
        ])
        .unwrap();
    attendances.delete("AT2", true).unwrap();
    let transport = MockTransport::online();
    transport.fail_transport(ops::SAVE_ATTENDANCE);

    engine(&store, &transport).run_cycle().await;

    let updates = transport.calls(ops::UPDATE_SESSION);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["input"]["nro_asistentes"], 1);
}

#[tokio::test]
async fn attendance_is_sent_once_per_session_group() {
    let store = memory_store();
    let attendances = AttendanceRepository::new(store.clone());
    record_attendance(&attendances, "AT1", "sesA", "P1");
    record_attendance(&attendances, "AT2", "sesA", "P2");
    record_attendance(&attendances, "AT3", "sesB", "P3");
    let transport = MockTransport::online();

    let report = engine(&store, &transport).run_cycle().await;

    assert_eq!(report.attendances.attempted, 2);
    assert_eq!(report.attendances.synced, 2);
    let calls = transport.calls(ops::SAVE_ATTENDANCE);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["input"]["id_sesion"], "sesA");
    assert_eq!(calls[0]["input"]["id_actividad"], "A1");
    assert_eq!(calls[0]["input"]["asistentes"].as_array().unwrap().len(), 2);
    assert_eq!(calls[1]["input"]["id_sesion"], "sesB");
    assert!(attendances.list_pending().unwrap().is_empty());
}

#[tokio::test]
async fn attendance_batch_sends_live_roster_and_drops_acknowledged_tombstones() {
    let store = memory_store();
    let attendances = AttendanceRepository::new(store.clone());
    attendances
        .bulk_load(&[
            synced_attendance("AT1", "sesA", "P1"),
            synced_attendance("AT2", "sesA", "P2"),
        ])
        .unwrap();
    attendances.delete("AT2", true).unwrap();
    record_attendance(&attendances, "AT3", "sesA", "P3");
    let transport = MockTransport::online();

    engine(&store, &transport).run_cycle().await;

    let calls = transport.calls(ops::SAVE_ATTENDANCE);
    assert_eq!(calls.len(), 1);
    let people = calls[0]["input"]["asistentes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|attendee| attendee["id_persona"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(people, vec!["P1", "P3"]);
    assert!(attendances.get_by_id("AT2").unwrap().is_none());
    assert_eq!(
        attendances.get_by_id("AT3").unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn rejected_attendance_group_does_not_block_other_groups() {
    let store = memory_store();
    let attendances = AttendanceRepository::new(store.clone());
    record_attendance(&attendances, "AT1", "sesA", "P1");
    record_attendance(&attendances, "AT2", "sesB", "P2");
    let transport = MockTransport::online();
    transport.reject(ops::SAVE_ATTENDANCE, "id_sesion", "sesA", "session closed");

    let report = engine(&store, &transport).run_cycle().await;

    assert_eq!(report.attendances.failed, 1);
    assert_eq!(report.attendances.synced, 1);
    assert_eq!(
        attendances.get_by_id("AT1").unwrap().unwrap().sync_status,
        SyncStatus::PendingCreate
    );
    assert_eq!(
        attendances.get_by_id("AT2").unwrap().unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn attendance_without_session_is_never_pushed() {
    let store = memory_store();
    let attendances = AttendanceRepository::new(store.clone());
    attendances
        .create(AttendanceDraft {
            id: Some("AT1".to_string()),
            person_id: "P1".to_string(),
            ..AttendanceDraft::default()
        })
        .unwrap();
    let transport = MockTransport::online();

    let report = engine(&store, &transport).run_cycle().await;

    assert_eq!(report.attendances.attempted, 0);
    assert!(transport.calls(ops::SAVE_ATTENDANCE).is_empty());
    assert_eq!(
        attendances.get_by_id("AT1").unwrap().unwrap().sync_status,
        SyncStatus::PendingCreate
    );
}

#[tokio::test]
async fn deleted_session_with_update_state_is_sent_as_delete() {
    let store = memory_store();
    let sessions = SessionRepository::new(store.clone());
    let mut tombstone = synced_session("SE1", "A1", MARCH_5_2024);
    tombstone.deleted = true;
    tombstone.sync_status = SyncStatus::PendingUpdate;
    sessions.bulk_load(&[tombstone]).unwrap();
    let transport = MockTransport::online();

    let report = engine(&store, &transport).run_cycle().await;

    assert_eq!(report.sessions.attempted, 1);
    assert_eq!(report.sessions.synced, 1);
    assert_eq!(transport.calls(ops::DELETE_SESSION).len(), 1);
    assert!(transport.calls(ops::UPDATE_SESSION).is_empty());
    assert!(sessions.get_by_id("SE1").unwrap().is_none());
}

#[tokio::test]
async fn attendance_of_discarded_local_session_is_not_pushed() {
    let store = memory_store();
    let sessions = SessionRepository::new(store.clone());
    sessions
        .create(SessionDraft {
            id: Some("SE-local".to_string()),
            activity_id: "A1".to_string(),
            ..SessionDraft::default()
        })
        .unwrap();
    let attendances = AttendanceRepository::new(store.clone());
    record_attendance(&attendances, "AT1", "SE-local", "P1");
    sessions.delete("SE-local", true).unwrap();
    let transport = MockTransport::online();

    let report = engine(&store, &transport).run_cycle().await;

    assert_eq!(report.attendances.attempted, 0);
    assert!(transport.calls(ops::SAVE_ATTENDANCE).is_empty());
    assert!(attendances.get_by_id("AT1").unwrap().is_none());
}

mod common;

use common::{memory_store, MockTransport, MARCH_5_2024};
use rollcall_core::model::{ActivityDraft, Person, Site, User};
use rollcall_core::remote::ops;
use rollcall_core::{
    ActivityRepository, AttendanceRepository, ColdLoadError, ColdLoader, LocalStore,
    ReferenceRepository, RemoteGateway, SessionRepository, SyncConfig, SyncStatus,
};
use serde_json::json;
use std::sync::Arc;

fn loader(
    store: &LocalStore,
    transport: &Arc<MockTransport>,
    page_size: u32,
) -> ColdLoader<Arc<MockTransport>> {
    let config = SyncConfig {
        cold_load_page_size: page_size,
        ..SyncConfig::default()
    };
    ColdLoader::new(
        store.clone(),
        RemoteGateway::new(transport.clone()),
        &config,
    )
}

#[tokio::test]
async fn unreachable_remote_writes_nothing() {
    let store = memory_store();
    let references = ReferenceRepository::new(store.clone());
    references
        .replace(&[Site {
            id: "S1".to_string(),
            name: "North".to_string(),
        }])
        .unwrap();
    let transport = MockTransport::offline();

    let err = loader(&store, &transport, 50).run().await.unwrap_err();

    assert!(matches!(err, ColdLoadError::Unreachable(_)));
    assert_eq!(transport.total_calls(), 1);
    assert_eq!(references.all::<Site>().unwrap().len(), 1);
}

#[tokio::test]
async fn reference_tables_are_replaced_and_paged() {
    let store = memory_store();
    let references = ReferenceRepository::new(store.clone());
    references
        .replace(&[Person {
            id: "P-stale".to_string(),
            document_number: None,
            first_name: "Old".to_string(),
            last_name: None,
        }])
        .unwrap();
    let transport = MockTransport::online();
    transport.serve_pages(
        ops::QUERY_PEOPLE,
        vec![
            json!([
                { "id_persona": "P1", "nombres": "Ana", "apellidos": "Rojas" },
                { "id_persona": "P2", "nombres": "Luis" }
            ]),
            json!([{ "id_persona": "P3", "nombres": "Marta", "documento": "123" }]),
        ],
    );
    transport.serve_pages(
        ops::QUERY_USERS,
        vec![json!([
            { "id_usuario": "U1", "nombre": "Nora", "sedes": ["S1", "S2"] }
        ])],
    );

    let report = loader(&store, &transport, 2).run().await.unwrap();

    assert_eq!(report.people, 3);
    assert_eq!(report.users, 1);
    assert!(!report.transactional_skipped);
    assert_eq!(transport.calls(ops::QUERY_PEOPLE).len(), 2);
    assert_eq!(transport.calls(ops::QUERY_PEOPLE)[1]["page"], 1);
    assert_eq!(transport.calls(ops::QUERY_PEOPLE)[1]["pageSize"], 2);

    let ids = references
        .all::<Person>()
        .unwrap()
        .into_iter()
        .map(|person| person.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["P1", "P2", "P3"]);
    assert_eq!(
        references.user("U1").unwrap().unwrap().site_ids,
        vec!["S1".to_string(), "S2".to_string()]
    );
    assert_eq!(references.all::<User>().unwrap().len(), 1);
}

#[tokio::test]
async fn transactional_records_load_as_synced() {
    let store = memory_store();
    let transport = MockTransport::online();
    transport.serve_pages(
        ops::QUERY_ACTIVITIES,
        vec![json!([{
            "id_actividad": "A1",
            "id_sede": "S1",
            "nombre": "Chess club",
            "fecha_actividad": "2024-03-05",
            "sync_status": "pending_update",
            "deleted": true
        }])],
    );
    transport.serve_pages(
        ops::QUERY_SESSIONS,
        vec![json!([{
            "id_sesion": "SE1",
            "id_actividad": "A1",
            "fecha_sesion": MARCH_5_2024,
            "nro_asistentes": 3
        }])],
    );
    transport.serve_pages(
        ops::QUERY_ATTENDANCES,
        vec![json!([
            { "id_asistencia": "AT1", "id_sesion": "SE1", "id_persona": "P1" }
        ])],
    );

    let report = loader(&store, &transport, 100).run().await.unwrap();

    assert_eq!(report.activities, 1);
    assert_eq!(report.sessions, 1);
    assert_eq!(report.attendances, 1);

    let activity = ActivityRepository::new(store.clone())
        .get_by_id("A1")
        .unwrap()
        .unwrap();
    assert_eq!(activity.sync_status, SyncStatus::Synced);
    assert!(!activity.deleted);
    assert_eq!(activity.date, Some(MARCH_5_2024));

    let session = SessionRepository::new(store.clone())
        .get_by_id("SE1")
        .unwrap()
        .unwrap();
    assert_eq!(session.date, Some(MARCH_5_2024));
    assert_eq!(session.sync_status, SyncStatus::Synced);

    let attendances = AttendanceRepository::new(store);
    assert!(attendances.list_pending().unwrap().is_empty());
    assert_eq!(attendances.list_by_session("SE1").unwrap().len(), 1);
}

#[tokio::test]
async fn pending_local_work_skips_transactional_tables() {
    let store = memory_store();
    let activities = ActivityRepository::new(store.clone());
    activities
        .create(ActivityDraft {
            id: Some("A-local".to_string()),
            name: "Unsent".to_string(),
            ..ActivityDraft::default()
        })
        .unwrap();
    let transport = MockTransport::online();
    transport.serve_pages(
        ops::QUERY_SITES,
        vec![json!([{ "id_sede": "S1", "nombre": "North" }])],
    );
    transport.serve_pages(
        ops::QUERY_ACTIVITIES,
        vec![json!([{ "id_actividad": "A-remote", "nombre": "Remote" }])],
    );

    let report = loader(&store, &transport, 100).run().await.unwrap();

    assert!(report.transactional_skipped);
    assert_eq!(report.sites, 1);
    assert_eq!(report.activities, 0);
    assert!(transport.calls(ops::QUERY_ACTIVITIES).is_empty());
    assert!(activities.get_by_id("A-remote").unwrap().is_none());
    assert_eq!(
        activities.get_by_id("A-local").unwrap().unwrap().sync_status,
        SyncStatus::PendingCreate
    );
}

#[tokio::test]
async fn malformed_page_aborts_with_gateway_error() {
    let store = memory_store();
    let transport = MockTransport::online();
    transport.serve_pages(ops::QUERY_SITES, vec![json!([{ "id_sede": "S1" }])]);

    let err = loader(&store, &transport, 100).run().await.unwrap_err();

    assert!(matches!(err, ColdLoadError::Gateway(_)));
}

#[tokio::test]
async fn failed_later_page_keeps_previous_reference_rows() {
    let store = memory_store();
    let references = ReferenceRepository::new(store.clone());
    references
        .replace(&[
            Person {
                id: "P1".to_string(),
                document_number: None,
                first_name: "Ana".to_string(),
                last_name: None,
            },
            Person {
                id: "P2".to_string(),
                document_number: None,
                first_name: "Luis".to_string(),
                last_name: None,
            },
            Person {
                id: "P3".to_string(),
                document_number: None,
                first_name: "Marta".to_string(),
                last_name: None,
            },
        ])
        .unwrap();
    let transport = MockTransport::online();
    transport.serve_pages(
        ops::QUERY_PEOPLE,
        vec![
            json!([{ "id_persona": "P1", "nombres": "Ana" }]),
            json!([{ "id_persona": 42 }]),
        ],
    );

    let err = loader(&store, &transport, 1).run().await.unwrap_err();

    assert!(matches!(err, ColdLoadError::Gateway(_)));
    assert_eq!(transport.calls(ops::QUERY_PEOPLE).len(), 2);
    let ids = references
        .all::<Person>()
        .unwrap()
        .into_iter()
        .map(|person| person.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["P1", "P2", "P3"]);
}

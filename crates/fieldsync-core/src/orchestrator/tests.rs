use super::*;
use crate::registry::ServerRegistry;
use crate::testing::{candidate, ScriptedRemote};
use fieldsync_client::ClientError;
use fieldsync_types::{ConnectionStatus, EntityBody, EntitySource};
use serde_json::{json, Value};

struct Harness {
    remote: Arc<ScriptedRemote>,
    store: Arc<LocalStateStore>,
    orchestrator: SyncOrchestrator,
}

fn harness() -> Harness {
    let remote = Arc::new(ScriptedRemote::new());
    remote.set_healthy(&["cloud"]);
    let store = Arc::new(LocalStateStore::in_memory());
    let registry = ServerRegistry::new(vec![candidate("local", 0), candidate("cloud", 1)]).unwrap();
    let resolver = Arc::new(ConnectionResolver::new(remote.clone(), registry, store.clone()));
    let orchestrator = SyncOrchestrator::new(remote.clone(), resolver, store.clone());
    Harness {
        remote,
        store,
        orchestrator,
    }
}

fn contacts_payload(owners: &[&str]) -> Value {
    let rows: Vec<_> = owners
        .iter()
        .enumerate()
        .map(|(i, owner)| {
            json!({
                "id": i + 1,
                "address": format!("{} Market St", 100 + i),
                "zip_code": "28401",
                "owner_name": owner,
                "updated_at": "2024-01-01T00:00:00Z"
            })
        })
        .collect();
    json!({ "contacts": rows })
}

fn incidents_payload(descriptions: &[&str]) -> Value {
    let rows: Vec<_> = descriptions
        .iter()
        .enumerate()
        .map(|(i, d)| json!({"id": i + 1, "address": "9 Water St", "incident_type": "fire", "description": d}))
        .collect();
    json!({ "incidents": rows })
}

fn analytics_payload() -> Value {
    json!({"total_contacts": 2, "fiber_contacts": 1})
}

fn sales_payload() -> Value {
    json!({"weekly_sales": [{"week": "2024-02-05", "sales": 2, "revenue": 1700.0}]})
}

fn script_full_cycle(remote: &ScriptedRemote, owners: &[&str], incidents: &[&str]) {
    remote.reply(SyncDomain::Contacts, Ok(contacts_payload(owners)));
    remote.reply(SyncDomain::Incidents, Ok(incidents_payload(incidents)));
    remote.reply(SyncDomain::Analytics, Ok(analytics_payload()));
    remote.reply(SyncDomain::RollingSales, Ok(sales_payload()));
}

fn incident_descriptions(store: &LocalStateStore) -> Vec<String> {
    store
        .incidents()
        .into_iter()
        .filter_map(|e| e.as_incident().and_then(|i| i.description.clone()))
        .collect()
}

#[tokio::test]
async fn test_refresh_applies_all_domains() {
    let h = harness();
    script_full_cycle(&h.remote, &["Ann", "Ben"], &["Kitchen fire"]);

    let report = h.orchestrator.refresh().await;

    assert_eq!(report.server.as_deref(), Some("cloud"));
    assert_eq!(report.applied_count(), 4);
    assert_eq!(report.failed_count(), 0);
    assert!(report.last_sync.is_some());
    assert_eq!(report.server_sync, Some(true));
    assert_eq!(h.remote.server_syncs(), 1);

    assert!(!h.store.is_sample());
    assert_eq!(h.store.contacts().len(), 2);
    assert_eq!(h.store.incidents().len(), 1);
    assert_eq!(h.store.analytics().unwrap().total_contacts, 2);
    assert_eq!(h.store.rolling_sales().len(), 1);
    assert_eq!(h.remote.probed(), vec!["local", "cloud"]);
}

#[tokio::test]
async fn test_failed_domain_keeps_previous_value() {
    let h = harness();
    script_full_cycle(&h.remote, &["Ann", "Ben"], &["Old report"]);
    h.orchestrator.refresh().await;
    let contacts_before = h.store.committed().domains[&SyncDomain::Contacts].clone();

    h.remote.reply(SyncDomain::Contacts, Err(ClientError::Timeout));
    h.remote.reply(SyncDomain::Incidents, Ok(incidents_payload(&["New report", "Second"])));
    h.remote.reply(SyncDomain::Analytics, Ok(analytics_payload()));
    h.remote.reply(SyncDomain::RollingSales, Ok(sales_payload()));

    let report = h.orchestrator.refresh().await;

    let contacts = report.record(SyncDomain::Contacts).unwrap();
    assert!(!contacts.success);
    assert_eq!(contacts.error, Some(ErrorKind::Timeout));
    assert!(report.record(SyncDomain::Incidents).unwrap().applied);

    let after = h.store.committed();
    assert!(Arc::ptr_eq(&contacts_before, &after.domains[&SyncDomain::Contacts]));
    assert_eq!(incident_descriptions(&h.store), vec!["New report", "Second"]);
}

#[tokio::test]
async fn test_older_fetch_completing_late_is_discarded() {
    let h = harness();
    assert!(h.orchestrator.resolver().connect_with_fallback().await);

    let first = h.remote.gated(SyncDomain::Incidents);
    let second = h.remote.gated(SyncDomain::Incidents);
    let store = h.store.clone();

    let (r1, r2, ()) = tokio::join!(
        h.orchestrator.refresh_domain(SyncDomain::Incidents),
        h.orchestrator.refresh_domain(SyncDomain::Incidents),
        async move {
            second.send(Ok(incidents_payload(&["from fetch 2"]))).unwrap();
            while store.committed().applied_sequence(SyncDomain::Incidents) < 2 {
                tokio::task::yield_now().await;
            }
            first.send(Ok(incidents_payload(&["from fetch 1"]))).unwrap();
        }
    );

    assert_eq!(r1.sequence_number, 1);
    assert_eq!(r2.sequence_number, 2);
    assert!(r2.applied);
    assert!(r1.success);
    assert!(!r1.applied);
    assert!(r1.is_stale());
    assert_eq!(incident_descriptions(&h.store), vec!["from fetch 2"]);
}

#[tokio::test]
async fn test_newer_fetch_completing_last_wins() {
    let h = harness();
    assert!(h.orchestrator.resolver().connect_with_fallback().await);

    let first = h.remote.gated(SyncDomain::Incidents);
    let second = h.remote.gated(SyncDomain::Incidents);
    let store = h.store.clone();

    let (r1, r2, ()) = tokio::join!(
        h.orchestrator.refresh_domain(SyncDomain::Incidents),
        h.orchestrator.refresh_domain(SyncDomain::Incidents),
        async move {
            first.send(Ok(incidents_payload(&["from fetch 1"]))).unwrap();
            while store.committed().applied_sequence(SyncDomain::Incidents) < 1 {
                tokio::task::yield_now().await;
            }
            second.send(Ok(incidents_payload(&["from fetch 2"]))).unwrap();
        }
    );

    assert!(r1.applied);
    assert!(r2.applied);
    assert_eq!(incident_descriptions(&h.store), vec!["from fetch 2"]);
}

#[tokio::test]
async fn test_same_payload_twice_is_stable() {
    let h = harness();
    script_full_cycle(&h.remote, &["Ann", "Ben", "Cy"], &["Fire"]);
    h.orchestrator.refresh().await;
    let first = h.store.contacts();

    script_full_cycle(&h.remote, &["Ann", "Ben", "Cy"], &["Fire"]);
    h.orchestrator.refresh().await;
    let second = h.store.contacts();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_refresh_without_server_keeps_sample() {
    let h = harness();
    h.remote.set_healthy(&[]);

    let report = h.orchestrator.refresh().await;

    assert_eq!(report.connection_error, Some(ErrorKind::AllCandidatesExhausted));
    assert!(report.records.is_empty());
    assert!(report.server.is_none());
    assert!(h.store.is_sample());
    assert!(h.store.last_sync().is_none());
}

#[tokio::test]
async fn test_all_domains_unreachable_drops_connection() {
    let h = harness();
    assert!(h.orchestrator.resolver().connect_with_fallback().await);
    for domain in SyncDomain::ALL {
        h.remote
            .reply(domain, Err(ClientError::NetworkUnreachable("reset".to_string())));
    }

    let report = h.orchestrator.refresh().await;

    assert_eq!(report.failed_count(), 4);
    assert!(report.server_sync.is_none());
    let state = h.orchestrator.resolver().state();
    assert_eq!(state.status, ConnectionStatus::Disconnected);
    assert_eq!(state.last_error, Some(ErrorKind::NetworkUnreachable));
}

#[tokio::test]
async fn test_decoding_failure_keeps_connection() {
    let h = harness();
    assert!(h.orchestrator.resolver().connect_with_fallback().await);
    for domain in SyncDomain::ALL {
        h.remote.reply(domain, Ok(json!("<html>maintenance</html>")));
    }

    let report = h.orchestrator.refresh().await;

    assert!(report
        .records
        .iter()
        .all(|r| r.error == Some(ErrorKind::DecodingError)));
    assert!(h.orchestrator.resolver().state().is_connected());
}

#[tokio::test]
async fn test_server_sync_can_be_disabled() {
    let h = harness();
    let orchestrator = h.orchestrator.with_server_sync(false);
    script_full_cycle(&h.remote, &["Ann"], &[]);

    let report = orchestrator.refresh().await;

    assert!(report.any_applied());
    assert!(report.server_sync.is_none());
    assert_eq!(h.remote.server_syncs(), 0);
}

#[tokio::test]
async fn test_create_contact_merges_echo() {
    let h = harness();
    h.remote.created(Ok(json!({
        "id": 42,
        "address": "77 Harbor Rd",
        "city": "Southport",
        "state": "NC",
        "zip_code": "28461",
        "owner_name": "Dana Reyes",
        "fiber_available": true,
        "created_date": "2024-06-01T10:00:00",
        "source": "mobile_app"
    })));

    let entity = h
        .orchestrator
        .create_contact(NewContact {
            address: "77 Harbor Rd".to_string(),
            city: "Southport".to_string(),
            state: "NC".to_string(),
            zip_code: "28461".to_string(),
            owner_name: "Dana Reyes".to_string(),
            fiber_available: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(entity.id, "contact-42");
    let stored = h.store.entity_by_id(SyncDomain::Contacts, "contact-42").unwrap();
    assert_eq!(stored.as_contact().unwrap().owner_name, "Dana Reyes");
}

#[tokio::test]
async fn test_create_contact_requires_fields() {
    let h = harness();

    let err = h
        .orchestrator
        .create_contact(NewContact {
            address: "77 Harbor Rd".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err, ErrorKind::HttpError { status: 400 });
    assert!(h.remote.probed().is_empty());
}

#[tokio::test]
async fn test_local_edit_survives_older_remote_value() {
    let h = harness();
    script_full_cycle(&h.remote, &["Ann"], &[]);
    h.orchestrator.refresh().await;

    let mut edited = h.store.contacts().remove(0);
    if let EntityBody::Contact(c) = &mut edited.body {
        c.owner_name = "Ann (corrected)".to_string();
    }
    assert!(h.orchestrator.record_local_edit(edited).await);

    // server still reports the January value
    script_full_cycle(&h.remote, &["Ann"], &[]);
    h.orchestrator.refresh().await;

    let contact = h.store.contacts().remove(0);
    assert_eq!(contact.source, EntitySource::LocalEdit);
    assert_eq!(contact.as_contact().unwrap().owner_name, "Ann (corrected)");
}

#[tokio::test]
async fn test_address_edit_moves_contact_key() {
    let h = harness();
    script_full_cycle(&h.remote, &["Ann"], &[]);
    h.orchestrator.refresh().await;

    let mut edited = h.store.contacts().remove(0);
    if let EntityBody::Contact(c) = &mut edited.body {
        c.address = "999 Ocean Blvd".to_string();
    }
    assert!(h.orchestrator.record_local_edit(edited).await);
    assert_eq!(h.store.contacts().len(), 1);

    // server echoes the move with its older timestamp
    h.remote.reply(
        SyncDomain::Contacts,
        Ok(json!({"contacts": [{
            "id": 1,
            "address": "999 Ocean Blvd",
            "zip_code": "28401",
            "owner_name": "Ann",
            "updated_at": "2024-01-01T00:00:00Z"
        }]})),
    );
    h.remote.reply(SyncDomain::Incidents, Ok(incidents_payload(&[])));
    h.remote.reply(SyncDomain::Analytics, Ok(analytics_payload()));
    h.remote.reply(SyncDomain::RollingSales, Ok(sales_payload()));
    h.orchestrator.refresh().await;

    let contacts = h.store.contacts();
    assert_eq!(contacts.len(), 1);
    let contact = h.store.entity_by_id(SyncDomain::Contacts, "contact-1").unwrap();
    assert_eq!(contact.natural_key, "999 ocean blvd|28401");
    assert_eq!(contact.source, EntitySource::LocalEdit);
}

#[tokio::test]
async fn test_sample_entities_are_not_editable() {
    let h = harness();

    let mut edited = h.store.contacts().remove(0);
    assert_eq!(edited.source, EntitySource::Sample);
    if let EntityBody::Contact(c) = &mut edited.body {
        c.owner_name = "Someone Real".to_string();
    }

    assert!(!h.orchestrator.record_local_edit(edited).await);
    assert!(h.store.is_sample());
    assert_eq!(h.store.contacts().len(), 5);
    assert!(h.store.committed().is_empty());
}

#[tokio::test]
async fn test_create_contact_returns_newer_stored_value() {
    let h = harness();
    script_full_cycle(&h.remote, &["Ann"], &[]);
    h.orchestrator.refresh().await;

    let mut edited = h.store.contacts().remove(0);
    if let EntityBody::Contact(c) = &mut edited.body {
        c.owner_name = "Ann (corrected)".to_string();
    }
    assert!(h.orchestrator.record_local_edit(edited).await);

    h.remote.created(Ok(json!({
        "id": 1,
        "address": "100 Market St",
        "city": "Wilmington",
        "state": "NC",
        "zip_code": "28401",
        "owner_name": "Ann",
        "created_date": "2024-06-01T10:00:00"
    })));

    let entity = h
        .orchestrator
        .create_contact(NewContact {
            address: "100 Market St".to_string(),
            city: "Wilmington".to_string(),
            state: "NC".to_string(),
            zip_code: "28401".to_string(),
            owner_name: "Ann".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(entity.source, EntitySource::LocalEdit);
    assert_eq!(entity.as_contact().unwrap().owner_name, "Ann (corrected)");
    assert_eq!(h.store.contacts().len(), 1);
}

#[tokio::test]
async fn test_clear_cache_returns_to_sample() {
    let h = harness();
    script_full_cycle(&h.remote, &["Ann"], &["Fire"]);
    h.orchestrator.refresh().await;
    assert!(!h.store.is_sample());

    h.orchestrator.clear_cache().await.unwrap();

    assert!(h.store.is_sample());
    assert!(h.store.last_sync().is_none());
}

#[tokio::test]
async fn test_sequences_increase_per_domain() {
    let h = harness();
    script_full_cycle(&h.remote, &["Ann"], &[]);
    let first = h.orchestrator.refresh().await;
    script_full_cycle(&h.remote, &["Ann"], &[]);
    let second = h.orchestrator.refresh().await;

    for domain in SyncDomain::ALL {
        assert_eq!(first.record(domain).unwrap().sequence_number, 1);
        assert_eq!(second.record(domain).unwrap().sequence_number, 2);
    }
}

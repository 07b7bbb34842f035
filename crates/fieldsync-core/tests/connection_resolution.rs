#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test, panics are the assertion mechanism")]

use std::net::TcpListener;
use std::time::Duration;

use fieldsync_core::{FieldSync, SyncConfig};
use fieldsync_types::{ConnectionStatus, ErrorKind, ServerCandidate, Transport};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn candidate_for(name: &str, server: &MockServer, priority: u32) -> ServerCandidate {
    let url = Url::parse(&server.uri()).expect("mock uri");
    ServerCandidate::new(
        name,
        url.host_str().expect("host"),
        url.port().expect("port"),
        Transport::Http,
        priority,
    )
}

/// A loopback port with nothing listening on it.
fn refused_candidate(name: &str, priority: u32) -> ServerCandidate {
    let port = TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .expect("free port")
        .port();
    ServerCandidate::new(name, "127.0.0.1", port, Transport::Http, priority)
}

fn config(candidates: Vec<ServerCandidate>) -> SyncConfig {
    SyncConfig {
        candidates,
        api_key: "test-key".to_string(),
        probe_timeout_ms: 300,
        fetch_timeout_ms: 500,
        ..Default::default()
    }
}

fn health(status: u16) -> Mock {
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({"status": "healthy"})))
}

#[tokio::test]
async fn test_first_healthy_candidate_wins_and_later_ones_are_not_probed() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    let c = MockServer::start().await;
    health(503).expect(1).mount(&a).await;
    health(200).expect(1).mount(&b).await;
    health(200).expect(0).mount(&c).await;

    let dir = TempDir::new().expect("tempdir");
    let sync = FieldSync::open(
        dir.path(),
        config(vec![
            candidate_for("a", &a, 0),
            candidate_for("b", &b, 1),
            candidate_for("c", &c, 2),
        ]),
    )
    .await
    .expect("open");

    assert!(sync.resolver.connect_with_fallback().await);

    let state = sync.resolver.state();
    assert_eq!(state.active_candidate.expect("active").name, "b");
    assert!(matches!(state.status, ConnectionStatus::Connected(_)));
    assert_eq!(sync.store.selected_server().expect("persisted").name, "b");
    assert!(dir.path().join("settings.json").exists());
}

#[tokio::test]
async fn test_every_candidate_down_is_exhaustion() {
    let a = MockServer::start().await;
    health(500).mount(&a).await;

    let dir = TempDir::new().expect("tempdir");
    let sync = FieldSync::open(
        dir.path(),
        config(vec![refused_candidate("gone", 0), candidate_for("broken", &a, 1)]),
    )
    .await
    .expect("open");

    assert!(!sync.resolver.connect_with_fallback().await);

    let state = sync.resolver.state();
    assert_eq!(state.status, ConnectionStatus::Disconnected);
    assert_eq!(state.last_error, Some(ErrorKind::AllCandidatesExhausted));
    assert!(state.last_probe_time.is_some());
    assert!(sync.store.selected_server().is_none());
}

#[tokio::test]
async fn test_slow_probe_counts_as_unhealthy() {
    let slow = MockServer::start().await;
    let fast = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&slow)
        .await;
    health(200).mount(&fast).await;

    let dir = TempDir::new().expect("tempdir");
    let sync = FieldSync::open(
        dir.path(),
        config(vec![candidate_for("slow", &slow, 0), candidate_for("fast", &fast, 1)]),
    )
    .await
    .expect("open");

    assert!(sync.resolver.connect_with_fallback().await);
    assert_eq!(sync.resolver.active_candidate().expect("active").name, "fast");
}

#[tokio::test]
async fn test_probe_sends_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .and(header("X-API-Key", "test-key"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    let sync = FieldSync::open(dir.path(), config(vec![candidate_for("keyed", &server, 0)]))
        .await
        .expect("open");

    assert!(sync.resolver.connect_with_fallback().await);
}

#[tokio::test]
async fn test_next_session_resumes_last_known_good() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    let dir = TempDir::new().expect("tempdir");
    let candidates = vec![candidate_for("a", &a, 0), candidate_for("b", &b, 1)];

    {
        let _down = health(503).mount_as_scoped(&a).await;
        let _up = health(200).mount_as_scoped(&b).await;
        let sync = FieldSync::open(dir.path(), config(candidates.clone())).await.expect("open");
        assert!(sync.resolver.connect_with_fallback().await);
        assert_eq!(sync.resolver.active_candidate().expect("active").name, "b");
    }

    // a is healthy again, but the new session tries b first
    let _a_up = health(200).expect(0).mount_as_scoped(&a).await;
    let _b_up = health(200).expect(1).mount_as_scoped(&b).await;
    let sync = FieldSync::open(dir.path(), config(candidates)).await.expect("reopen");
    assert!(sync.resolver.connect_with_fallback().await);
    assert_eq!(sync.resolver.active_candidate().expect("active").name, "b");
}

#[tokio::test]
async fn test_all_servers_diagnostics() {
    let up = MockServer::start().await;
    let unauthorized = MockServer::start().await;
    health(200).mount(&up).await;
    health(401).mount(&unauthorized).await;

    let dir = TempDir::new().expect("tempdir");
    let sync = FieldSync::open(
        dir.path(),
        config(vec![
            candidate_for("up", &up, 0),
            candidate_for("unauthorized", &unauthorized, 1),
            refused_candidate("gone", 2),
        ]),
    )
    .await
    .expect("open");

    let results = sync.resolver.test_all_servers().await;

    assert_eq!(results.len(), 3);
    assert!(results[0].available);
    assert_eq!(results[0].status_code, Some(200));
    assert!(!results[1].available);
    assert_eq!(results[1].error, Some(ErrorKind::HttpError { status: 401 }));
    assert_eq!(results[1].status_code, Some(401));
    assert!(!results[2].available);
    assert_eq!(results[2].error, Some(ErrorKind::NetworkUnreachable));

    assert!(!sync.resolver.state().is_connected());
}

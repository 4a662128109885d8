use serde_json::json;
use status_poller::config::{ConfigLoader, PollerConfig};
use status_poller::poller::{PollerMode, StatusPoller};
use status_poller::source::{HttpStatusSource, StatusSource};
use status_poller::{Error, MetricsCollector};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn server_info() -> serde_json::Value {
    json!({
        "title": "Elysia API",
        "version": "1.0.0",
        "server": {
            "runtime": { "name": "Bun", "version": "1.2.0", "revision": "abc123" },
            "platform": { "os": "linux", "arch": "x64", "nodeVersion": "v22.0.0" },
            "memory": { "heapUsed": "12MB", "heapTotal": "20MB", "rss": "48MB" },
            "uptime": "42s",
            "environment": "development",
            "pid": 4242
        },
        "api": {
            "framework": "ElysiaJS",
            "integration": "TanStack Start",
            "typeSystem": "Eden Treaty"
        },
        "timestamp": "2025-01-01T00:00:00.000Z"
    })
}

fn source_for(server: &MockServer) -> Arc<HttpStatusSource> {
    let config = PollerConfig {
        api_url: server.uri(),
        ..PollerConfig::default()
    };
    Arc::new(HttpStatusSource::from_config(&config).unwrap())
}

async fn mount_info(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/info"))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn http_source_returns_payload() {
    let server = MockServer::start().await;
    mount_info(&server, ResponseTemplate::new(200).set_body_json(server_info())).await;

    let payload = source_for(&server).fetch_status().await.unwrap();
    assert_eq!(payload["server"]["runtime"]["name"], "Bun");
}

#[tokio::test]
async fn http_source_rejects_error_status() {
    let server = MockServer::start().await;
    mount_info(&server, ResponseTemplate::new(503)).await;

    let err = source_for(&server).fetch_status().await.unwrap_err();
    assert!(matches!(err, Error::Status(code) if code.as_u16() == 503));
}

#[tokio::test]
async fn http_source_rejects_non_json_body() {
    let server = MockServer::start().await;
    mount_info(&server, ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

    let err = source_for(&server).fetch_status().await.unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn http_source_times_out() {
    let server = MockServer::start().await;
    mount_info(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(server_info())
            .set_delay(Duration::from_millis(500)),
    )
    .await;

    let endpoint = Url::parse(&server.uri()).unwrap().join("/api/info").unwrap();
    let source = HttpStatusSource::new(endpoint, Duration::from_millis(100), "test").unwrap();
    let err = source.fetch_status().await.unwrap_err();
    assert!(matches!(err, Error::Http(e) if e.is_timeout()));
}

#[tokio::test]
async fn poller_loads_from_backend() {
    let server = MockServer::start().await;
    mount_info(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(server_info())
            .set_delay(Duration::from_millis(50)),
    )
    .await;

    let poller = StatusPoller::initialize(source_for(&server), None, None);
    assert_eq!(poller.mode(), PollerMode::Loading);

    tokio::time::sleep(Duration::from_millis(400)).await;

    let state = poller.state();
    assert_eq!(state.mode(), PollerMode::Idle);
    let snapshot = state.current_snapshot.unwrap();
    assert!(snapshot.duration_ms >= 50);
    assert_eq!(snapshot.server_info().unwrap().server.pid, 4242);
}

#[tokio::test]
async fn poller_reports_unreachable_backend_as_null_payload() {
    let server = MockServer::start().await;
    mount_info(&server, ResponseTemplate::new(500)).await;

    let poller = StatusPoller::initialize(source_for(&server), None, None);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let state = poller.state();
    assert_eq!(state.mode(), PollerMode::Idle);
    assert!(state.current_snapshot.unwrap().payload.is_none());
    assert_eq!(poller.get_metrics().fetches_failed, 1);
}

#[tokio::test]
async fn live_view_polls_backend_until_disabled() {
    let server = MockServer::start().await;
    mount_info(&server, ResponseTemplate::new(200).set_body_json(server_info())).await;

    let metrics = Arc::new(MetricsCollector::new());
    let seed = status_poller::StatusSnapshot::new(Some(json!({ "seeded": true })), 0);
    let poller = StatusPoller::initialize(source_for(&server), Some(seed), Some(metrics.clone()));

    poller.set_live_view(true);
    tokio::time::sleep(Duration::from_millis(2500)).await;
    poller.set_live_view(false);
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(metrics.snapshot().live_view_ticks, 2);
    assert!(poller.state().current_snapshot.unwrap().server_info().is_some());
}

#[tokio::test]
async fn config_file_points_source_at_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("poller.yaml");
    std::fs::write(
        &file,
        format!("name: e2e\napi_url: {}\nstatus_path: /healthz\ntimeout_ms: 2000\n", server.uri()),
    )
    .unwrap();

    let config = ConfigLoader::load(&file).unwrap();
    let source = HttpStatusSource::from_config(&config).unwrap();
    assert_eq!(source.endpoint().path(), "/healthz");
    assert_eq!(source.fetch_status().await.unwrap(), json!({ "ok": true }));
}

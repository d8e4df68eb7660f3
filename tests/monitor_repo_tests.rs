// Uptime Kuma repo tests against a local /metrics endpoint

mod common;

use axum::{
    Router,
    http::{HeaderMap, StatusCode, header},
    routing::get,
};
use common::spawn_http;
use homerun::models::ServiceState;
use homerun::monitor_repo::{MonitorCredentials, MonitorError, MonitorRepo, MonitorSource};

const METRICS: &str = r#"# HELP monitor_status Monitor Status (1 = UP, 0= DOWN, 2= PENDING, 3= MAINTENANCE)
# TYPE monitor_status gauge
monitor_status{monitor_id="1",monitor_name="Nginx",monitor_type="http",monitor_url="https://nginx.home.lan",monitor_hostname="null",monitor_port="null"} 1
monitor_status{monitor_id="2",monitor_name="Backup",monitor_type="push",monitor_url="null",monitor_hostname="null",monitor_port="null"} 3
monitor_status{monitor_id="5",monitor_name="Printer",monitor_type="ping",monitor_url="null",monitor_hostname="printer",monitor_port="null"} 2
# TYPE monitor_response_time gauge
monitor_response_time{monitor_id="1",monitor_name="Nginx",monitor_type="http",monitor_url="https://nginx.home.lan",monitor_hostname="null",monitor_port="null"} 37
"#;

/// Serves METRICS to requests carrying exactly `expected_auth`.
fn kuma_router(expected_auth: &'static str) -> Router {
    Router::new().route(
        "/metrics",
        get(move |headers: HeaderMap| async move {
            let auth = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            if auth == Some(expected_auth) {
                Ok(METRICS)
            } else {
                Err(StatusCode::UNAUTHORIZED)
            }
        }),
    )
}

fn api_key(key: &str) -> MonitorCredentials {
    MonitorCredentials {
        api_key: Some(key.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn get_status_maps_kuma_codes() {
    let base = spawn_http(kuma_router("Basic OnVrMV9hYmM=")).await;
    let repo = MonitorRepo::new(&base, api_key("uk1_abc")).unwrap();

    let up = repo.get_status(1).await.unwrap();
    assert_eq!(up.status, ServiceState::Running);
    assert_eq!(up.name, "Nginx");
    assert_eq!(up.latency_ms, 37.0);

    let maintenance = repo.get_status(2).await.unwrap();
    assert_eq!(maintenance.status, ServiceState::Maintenance);
    assert_eq!(maintenance.latency_ms, 0.0);

    // PENDING has no dedicated state.
    assert_eq!(repo.get_status(5).await.unwrap().status, ServiceState::Error);
}

#[tokio::test]
async fn unknown_monitor_is_not_found() {
    let base = spawn_http(kuma_router("Basic OnVrMV9hYmM=")).await;
    let repo = MonitorRepo::new(&base, api_key("uk1_abc")).unwrap();

    let err = repo.get_status(99).await.unwrap_err();
    assert!(matches!(err, MonitorError::NotFound(99)));
}

#[tokio::test]
async fn api_key_takes_precedence_over_username_password() {
    let base = spawn_http(kuma_router("Basic OnVrMV9hYmM=")).await;
    let creds = MonitorCredentials {
        username: Some("admin".into()),
        password: Some("pw".into()),
        api_key: Some("uk1_abc".into()),
    };
    let repo = MonitorRepo::new(&base, creds).unwrap();
    assert!(repo.get_status(1).await.is_ok());
}

#[tokio::test]
async fn username_password_used_when_no_api_key() {
    let base = spawn_http(kuma_router("Basic YWRtaW46cHc=")).await;
    let creds = MonitorCredentials {
        username: Some("admin".into()),
        password: Some("pw".into()),
        api_key: Some(String::new()),
    };
    let repo = MonitorRepo::new(&format!("{base}/"), creds).unwrap();
    repo.ping().await.unwrap();
    assert_eq!(repo.get_status(1).await.unwrap().status, ServiceState::Running);
}

#[tokio::test]
async fn rejected_credentials_surface_http_status() {
    let base = spawn_http(kuma_router("Basic OnVrMV9hYmM=")).await;
    let repo = MonitorRepo::new(&base, api_key("wrong")).unwrap();

    let err = repo.get_status(1).await.unwrap_err();
    assert!(matches!(err, MonitorError::HttpStatus(s) if s == reqwest::StatusCode::UNAUTHORIZED));
    assert!(matches!(repo.ping().await, Err(MonitorError::HttpStatus(_))));
}

#[tokio::test]
async fn unreachable_kuma_is_transport_error() {
    let repo = MonitorRepo::new("http://127.0.0.1:1", MonitorCredentials::default()).unwrap();
    let err = repo.get_status(1).await.unwrap_err();
    assert!(matches!(err, MonitorError::Transport(_)), "got {err:?}");
}

/// Answers one request with `response` written verbatim, then closes the connection.
async fn spawn_raw_http(response: &'static [u8]) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        socket.write_all(response).await.unwrap();
        socket.shutdown().await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn truncated_metrics_body_is_transport_error() {
    let base = spawn_raw_http(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 500\r\n\r\nmonitor_status{monitor_id=\"1\"",
    )
    .await;
    let repo = MonitorRepo::new(&base, MonitorCredentials::default()).unwrap();

    let err = repo.get_status(1).await.unwrap_err();
    assert!(matches!(err, MonitorError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn non_utf8_metrics_body_is_parse_error() {
    let base = spawn_raw_http(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\nConnection: close\r\n\r\n\xff\xfe\xfd\xfc",
    )
    .await;
    let repo = MonitorRepo::new(&base, MonitorCredentials::default()).unwrap();

    let err = repo.get_status(1).await.unwrap_err();
    assert!(matches!(err, MonitorError::Parse(_)), "got {err:?}");
}

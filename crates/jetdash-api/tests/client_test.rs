#![allow(clippy::unwrap_used)]
// Integration tests for `MonitorClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jetdash_api::{ClockState, Error, MonitorClient, RebootKind, Scope};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, MonitorClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = MonitorClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn test_config_configured() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "monitor_target_host_set": true,
            "monitor_target_host": "192.168.1.50",
            "monitor_target_port": "5000"
        })))
        .mount(&server)
        .await;

    let cfg = client.config().await.unwrap();
    assert!(cfg.monitor_target_host_set);
    assert_eq!(cfg.monitor_target_host.as_deref(), Some("192.168.1.50"));
    assert_eq!(cfg.monitor_target_port.as_deref(), Some("5000"));
}

#[tokio::test]
async fn test_target_url_with_and_without_port() {
    let with_port = MonitorClient::target_url("10.0.0.7", Some("5000")).unwrap();
    assert_eq!(with_port.as_str(), "http://10.0.0.7:5000/");

    let bare = MonitorClient::target_url("jetson.local", None).unwrap();
    assert_eq!(bare.as_str(), "http://jetson.local/");
}

// ── Scoped endpoints ────────────────────────────────────────────────

#[tokio::test]
async fn test_system_info_uses_scope_prefix() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/remote_system_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cpu_percent": 12.5,
            "memory_percent": 40.0,
            "memory_total_gb": 8.0,
            "memory_used_gb": 3.2,
            "disk_percent": 55.0,
            "disk_total_gb": 64.0,
            "disk_used_gb": 35.2,
            "uptime": "3 days, 4:05:06"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = client.system_info(Scope::Remote).await.unwrap();
    assert!((info.cpu_percent - 12.5).abs() < f64::EPSILON);
    assert_eq!(info.uptime, "3 days, 4:05:06");
}

#[tokio::test]
async fn test_network_status_and_scan() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/local_network_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "ip": "192.168.1.10", "mac": "aa:bb:cc:dd:ee:01", "interface": "arp cache" },
            { "ip": "192.168.1.11", "mac": "unknown", "interface": "arp cache" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/local_network_scan"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "ip": "192.168.1.10", "mac": "aa:bb:cc:dd:ee:01", "interface": "eth0", "name": "nas" }
        ])))
        .mount(&server)
        .await;

    let fast = client.network_status(Scope::Local).await.unwrap();
    assert_eq!(fast.len(), 2);
    assert_eq!(fast[1].mac.as_deref(), Some("unknown"));

    let deep = client.network_scan(Scope::Local).await.unwrap();
    assert_eq!(deep[0].name.as_deref(), Some("nas"));
}

// ── Error conventions ───────────────────────────────────────────────

#[tokio::test]
async fn test_error_body_with_200_is_backend_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/local_network_status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "arp table unavailable" })),
        )
        .mount(&server)
        .await;

    let result = client.network_status(Scope::Local).await;
    match result {
        Err(Error::Backend { message }) => assert_eq!(message, "arp table unavailable"),
        other => panic!("expected Backend error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_takes_message_from_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/docker_services/restart"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "no such container" })),
        )
        .mount(&server)
        .await;

    let err = client.restart_docker_service("ghost").await.unwrap_err();
    assert!(err.is_transient());
    match err {
        Error::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "no such container");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_http_error_without_body_uses_reason() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/jetson_gpu_info"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.gpu_info().await.unwrap_err();
    assert!(err.is_not_found(), "got: {err:?}");
    assert_eq!(err.to_string(), "HTTP 404: Not Found");
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/docker_services"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.docker_services().await;
    assert!(
        matches!(result, Err(Error::Deserialization { ref body, .. }) if body.contains("oops")),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Target endpoints ────────────────────────────────────────────────

#[tokio::test]
async fn test_gpu_info_nullable_fields() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/jetson_gpu_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gpu_usage_percent": 37.0,
            "gpu_clock_mhz": null,
            "gpu_temp_c": 48.5
        })))
        .mount(&server)
        .await;

    let gpu = client.gpu_info().await.unwrap();
    assert_eq!(gpu.gpu_usage_percent, Some(37.0));
    assert_eq!(gpu.gpu_clock_mhz, None);
    assert_eq!(gpu.power_mw, None);
}

#[tokio::test]
async fn test_power_mode_roundtrip() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/power_mode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "current_id": 0,
            "current_name": "MAXN",
            "modes": [{ "id": 0, "name": "MAXN" }, { "id": 1, "name": "15W" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/power_mode"))
        .and(body_json(json!({ "mode_id": 1 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Power mode set" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let state = client.power_mode().await.unwrap();
    assert_eq!(state.current_id, Some(0));
    assert_eq!(state.mode_name(1), Some("15W"));

    let ack = client.set_power_mode(1).await.unwrap();
    assert_eq!(ack.message.as_deref(), Some("Power mode set"));
}

#[tokio::test]
async fn test_reboot_sends_type() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/command/reboot"))
        .and(body_json(json!({ "type": "hard" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "rebooting" })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client.reboot(RebootKind::Hard).await.unwrap();
    assert_eq!(ack.status.as_deref(), Some("rebooting"));
}

#[tokio::test]
async fn test_hardware_sentinel_and_controls() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hardware_sentinel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "thermals": { "CPU": 51.0, "GPU": 49.5 },
            "fan": { "speed": 40, "profile": "quiet", "mode": "auto" },
            "clocks": false,
            "swap": { "usage": 10.0, "total_gb": 4.0, "used_gb": 0.4 },
            "timestamp": "2026-01-01T00:00:00"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/hardware_sentinel/turbo"))
        .and(body_json(json!({ "enabled": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/hardware_sentinel/fan"))
        .and(body_json(json!({ "mode": "manual", "speed": 80 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let sentinel = client.hardware_sentinel().await.unwrap();
    assert_eq!(sentinel.thermals.len(), 2);
    assert_eq!(sentinel.fan.mode, "auto");
    assert_eq!(sentinel.clocks, ClockState::Flag(false));

    client.set_turbo(true).await.unwrap();
    client.set_fan("manual", Some(80)).await.unwrap();
}

#[tokio::test]
async fn test_chat_reply_and_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "prompt": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "hi there" })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "prompt": "fail" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "model offline" })),
        )
        .mount(&server)
        .await;

    let reply = client.chat("hello").await.unwrap();
    assert_eq!(reply.response.as_deref(), Some("hi there"));

    let err = client.chat("fail").await.unwrap_err();
    assert!(matches!(err, Error::Backend { .. }));
}

//! Integration tests for the `jetdash` CLI binary.
//!
//! Argument parsing, help, completions and config handling run without a
//! backend; the rest use a wiremock server as the console backend.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `jetdash` binary with env isolation.
///
/// Clears all `JETDASH_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn jetdash_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("jetdash");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("JETDASH_PROFILE")
        .env_remove("JETDASH_CONSOLE")
        .env_remove("JETDASH_OUTPUT")
        .env_remove("JETDASH_INSECURE")
        .env_remove("JETDASH_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(home: &Path, args: Vec<String>) -> std::process::Output {
    let home = home.to_path_buf();
    tokio::task::spawn_blocking(move || jetdash_cmd(&home).args(args).output().unwrap())
        .await
        .unwrap()
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

/// A local-only console backend with healthy answers.
async fn local_backend() -> MockServer {
    let server = MockServer::start().await;
    let get = |p: &str, body: serde_json::Value| {
        Mock::given(method("GET"))
            .and(path(format!("/api/{p}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
    };

    get("config", json!({ "monitor_target_host_set": false })).mount(&server).await;
    get("local_system_info", json!({ "cpu_percent": 3.0, "uptime": "2 hours" }))
        .mount(&server)
        .await;
    get(
        "local_network_status",
        json!([{ "ip": "192.168.1.20", "mac": "AA:BB:CC:DD:EE:01", "interface": "arp cache" }]),
    )
    .mount(&server)
    .await;
    get("local_network_scan", json!([])).mount(&server).await;
    get("jetson_gpu_info", json!({ "gpu_usage_percent": 4.0 })).mount(&server).await;
    get(
        "docker_services",
        json!([
            { "name": "api", "status": "running", "image": "api:1", "id": "0123456789abcdef" },
            { "name": "web_monitor", "status": "running", "image": "wm:1", "id": "fedcba9876543210" }
        ]),
    )
    .mount(&server)
    .await;
    get(
        "power_mode",
        json!({ "current_id": 0, "current_name": "MAXN", "modes": [{ "id": 0, "name": "MAXN" }] }),
    )
    .mount(&server)
    .await;
    get(
        "hardware_sentinel",
        json!({ "thermals": { "cpu": 41.0 }, "fan": { "speed": 20.0, "profile": "quiet", "mode": "auto" }, "clocks": false }),
    )
    .mount(&server)
    .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = jetdash_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    jetdash_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("Jetson")
            .and(predicate::str::contains("status"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("services")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    jetdash_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("jetdash"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    jetdash_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = jetdash_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(text.contains("foobar") || text.contains("unrecognized"), "{text}");
}

#[test]
fn test_status_without_config_is_not_configured() {
    let home = tempfile::tempdir().unwrap();
    let output = jetdash_cmd(home.path()).arg("status").output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("config init"), "{text}");
}

#[test]
fn test_reboot_needs_kind() {
    let home = tempfile::tempdir().unwrap();
    jetdash_cmd(home.path())
        .args(["reboot", "--console", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_reboot_requires_yes_when_not_interactive() {
    let home = tempfile::tempdir().unwrap();
    let output = jetdash_cmd(home.path())
        .args(["reboot", "--soft", "--console", "http://127.0.0.1:9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_fan_speed_is_validated() {
    let home = tempfile::tempdir().unwrap();
    let output = jetdash_cmd(home.path())
        .args(["sentinel", "fan", "manual", "--speed", "140", "--console", "http://127.0.0.1:9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("speed"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_show() {
    let home = tempfile::tempdir().unwrap();
    jetdash_cmd(home.path())
        .args(["config", "init", "--name", "lab", "--url", "http://10.0.0.2:5000"])
        .assert()
        .success();

    jetdash_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("default_profile = \"lab\"")
                .and(predicate::str::contains("http://10.0.0.2:5000")),
        );

    jetdash_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lab *"));
}

#[test]
fn test_config_init_rejects_bad_url() {
    let home = tempfile::tempdir().unwrap();
    jetdash_cmd(home.path())
        .args(["config", "init", "--name", "lab", "--url", "not a url"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    jetdash_cmd(home.path())
        .args(["config", "use", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    jetdash_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Against a backend ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_json_reports_unconfigured_remote() {
    let server = local_backend().await;
    let home = tempfile::tempdir().unwrap();

    let output = run(
        home.path(),
        args(&["status", "--console", &server.uri(), "--output", "json", "--wait", "5"]),
    )
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["remote"]["status"]["state"], "not_configured");
    assert_eq!(view["remote"]["system_info"]["error"], "Not configured");
    assert_eq!(view["local"]["status"]["state"], "active");
    assert_eq!(view["local"]["system_info"]["data"]["uptime"], "2 hours");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_services_list_plain() {
    let server = local_backend().await;
    let home = tempfile::tempdir().unwrap();

    let output = run(
        home.path(),
        args(&["services", "list", "--console", &server.uri(), "--output", "plain"]),
    )
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "api\nweb_monitor");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_remote_devices_without_remote_target() {
    let server = local_backend().await;
    let home = tempfile::tempdir().unwrap();

    let output = run(
        home.path(),
        args(&["devices", "--remote", "--console", &server.uri()]),
    )
    .await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("remote target is not configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_restart_waits_for_confirmation() {
    let server = local_backend().await;
    Mock::given(method("POST"))
        .and(path("/api/docker_services/restart"))
        .and(body_json(json!({ "name": "api" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let output = run(
        home.path(),
        args(&["services", "restart", "api", "--wait", "--console", &server.uri(), "-o", "json"]),
    )
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["key"], "local/service:api");
    assert_eq!(report["outcome"], "confirmed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chat_passthrough() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "prompt": "how hot is it" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "41 C" })))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    let output = run(
        home.path(),
        args(&["chat", "how", "hot", "is", "it", "--console", &server.uri()]),
    )
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "41 C");
}

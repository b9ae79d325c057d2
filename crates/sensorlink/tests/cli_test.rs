//! Integration tests for the `sensorlink` CLI binary.
//!
//! Argument parsing, help output, completions, and error handling run
//! without a backend; the rest talk to a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the binary with env isolation.
///
/// Clears all `SENSORLINK_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn sensorlink_cmd_in(home: &str) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sensorlink");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("SENSORLINK_PROFILE")
        .env_remove("SENSORLINK_API_URL")
        .env_remove("SENSORLINK_STREAM_URL")
        .env_remove("SENSORLINK_TOKEN")
        .env_remove("SENSORLINK_OUTPUT")
        .env_remove("SENSORLINK_INSECURE")
        .env_remove("SENSORLINK_TIMEOUT")
        .env_remove("SENSORLINK_USERNAME")
        .env_remove("SENSORLINK_PASSWORD");
    cmd
}

fn sensorlink_cmd() -> assert_cmd::Command {
    sensorlink_cmd_in("/tmp/sensorlink-cli-test-nonexistent")
}

/// Command pointed at a mock backend with a bearer token.
fn against(server: &MockServer) -> assert_cmd::Command {
    let mut cmd = sensorlink_cmd();
    cmd.args(["--api-url", &server.uri(), "--token", "t0k"]);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn reading_json(id: i64, temperature: &str) -> serde_json::Value {
    json!({
        "id": id,
        "temperature": temperature,
        "humidity": null,
        "timestamp": format!("2024-03-01T09:00:0{id}")
    })
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = sensorlink_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    sensorlink_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("sensor")
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("watch"))
            .and(predicate::str::contains("readings")),
    );
}

#[test]
fn test_version_flag() {
    sensorlink_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sensorlink"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    sensorlink_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    sensorlink_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = sensorlink_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_devices_list_no_config() {
    sensorlink_cmd()
        .args(["devices", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_unknown_profile() {
    sensorlink_cmd()
        .args(["--profile", "nowhere", "health"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Profile 'nowhere' not found"));
}

#[test]
fn test_invalid_output_format() {
    let output = sensorlink_cmd()
        .args(["--output", "invalid", "devices", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_device_id_must_be_numeric() {
    sensorlink_cmd()
        .args(["watch", "porch"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid"));
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_devices_subcommands_exist() {
    sensorlink_cmd()
        .args(["devices", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("get"))
                .and(predicate::str::contains("create"))
                .and(predicate::str::contains("update"))
                .and(predicate::str::contains("delete")),
        );
}

#[test]
fn test_config_subcommands_exist() {
    sensorlink_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("profiles")),
        );
}

// ── Config round trip ───────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    sensorlink_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_set_then_show() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path().to_str().unwrap();

    sensorlink_cmd_in(home)
        .args(["--profile", "lab", "config", "set", "api_url", "http://10.0.0.5:8000"])
        .assert()
        .success();
    sensorlink_cmd_in(home)
        .args(["--profile", "lab", "config", "set", "history_limit", "20"])
        .assert()
        .success();
    sensorlink_cmd_in(home)
        .args(["config", "use", "lab"])
        .assert()
        .success();

    sensorlink_cmd_in(home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("default_profile = \"lab\"")
                .and(predicate::str::contains("api_url = \"http://10.0.0.5:8000\""))
                .and(predicate::str::contains("history_limit = 20")),
        );

    sensorlink_cmd_in(home)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lab *"));
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    sensorlink_cmd_in(home.path().to_str().unwrap())
        .args(["config", "set", "site", "x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown config key"));
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_list_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/"))
        .and(query_param("skip", "0"))
        .and(query_param("limit", "100"))
        .and(header("authorization", "Bearer t0k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "device_name": "Greenhouse", "ip_address": "10.0.0.11", "type": "ESP32" },
            { "id": 2, "device_name": "Tank", "ip_address": "10.0.0.12" },
        ])))
        .mount(&server)
        .await;

    let output = against(&server)
        .args(["-o", "json", "devices", "list"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let devices: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(devices[0]["device_name"], "Greenhouse");
    assert_eq!(devices[1]["id"], 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_device_not_found_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/99"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Device not found" })),
        )
        .mount(&server)
        .await;

    against(&server)
        .args(["devices", "get", "99"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("device '99' not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_requires_confirmation() {
    let server = MockServer::start().await;

    against(&server)
        .args(["devices", "delete", "3"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("requires confirmation"));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_readings_plain_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/7/readings"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            reading_json(3, "21.0"),
            reading_json(2, "18.0"),
            reading_json(1, "19.5"),
        ])))
        .mount(&server)
        .await;

    against(&server)
        .args(["-o", "plain", "readings", "7", "--limit", "3"])
        .assert()
        .success()
        .stdout("3\n2\n1\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_chart_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices/7/readings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            reading_json(3, "21.0"),
            reading_json(2, "18.0"),
            reading_json(1, "19.5"),
        ])))
        .mount(&server)
        .await;

    let output = against(&server)
        .args(["-o", "json", "chart", "7"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let chart: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(chart["field"], "temperature");
    assert_eq!(chart["values"], json!([19.5, 18.0, 21.0]));
    assert_eq!(chart["bounds"], json!({ "min": 16.0, "max": 23.0 }));
    assert_eq!(chart["latest"], 21.0);
    assert!(chart["line_path"].as_str().unwrap().starts_with("M 0,50 C "));
    assert!(chart["area_path"].as_str().unwrap().ends_with(" L 100,100 L 0,100 Z"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "healthy", "message": "API is running" })),
        )
        .mount(&server)
        .await;

    against(&server)
        .arg("health")
        .assert()
        .success()
        .stdout(predicate::str::contains("Status:  healthy"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unhealthy_backend_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "degraded", "message": "database unavailable" })),
        )
        .mount(&server)
        .await;

    against(&server)
        .args(["-o", "plain", "health"])
        .assert()
        .code(1)
        .stdout("degraded\n")
        .stderr(predicate::str::contains("database unavailable"));
}

//! Integration tests for the `lifeline` CLI binary.
//!
//! Argument parsing, help output, completions, and error handling run with
//! no backend at all. The SOS and alert flows run against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::process::Output;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `lifeline` binary with env isolation.
///
/// Clears all `LIFELINE_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn lifeline_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("lifeline");
    cmd.env("HOME", "/tmp/lifeline-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/lifeline-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("LIFELINE_PROFILE")
        .env_remove("LIFELINE_SERVER")
        .env_remove("LIFELINE_TOKEN")
        .env_remove("LIFELINE_OUTPUT")
        .env_remove("LIFELINE_INSECURE")
        .env_remove("LIFELINE_TIMEOUT");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run(args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || lifeline_cmd().args(args).output().unwrap())
        .await
        .unwrap()
}

/// Like [`lifeline_cmd`], but with config directories rooted at `home`.
fn lifeline_cmd_in(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = lifeline_cmd();
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home);
    cmd
}

/// Write `contents` to the config file the binary resolves under `home`.
fn write_config(home: &std::path::Path, contents: &str) {
    let output = lifeline_cmd_in(home).args(["config", "path"]).output().unwrap();
    assert!(output.status.success());
    let path = std::path::PathBuf::from(String::from_utf8(output.stdout).unwrap().trim());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = lifeline_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    lifeline_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("SOS")
            .and(predicate::str::contains("sos"))
            .and(predicate::str::contains("alerts"))
            .and(predicate::str::contains("health")),
    );
}

#[test]
fn test_version_flag() {
    lifeline_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lifeline"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    lifeline_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    lifeline_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = lifeline_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success(), "Expected failure for invalid subcommand");
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_alerts_list_without_backend() {
    lifeline_cmd()
        .args(["alerts", "list"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("config")
                .or(predicate::str::contains("No backend configured")),
        );
}

#[test]
fn test_unknown_profile_is_reported() {
    let output = lifeline_cmd()
        .args(["--profile", "nope", "health"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("nope"));
}

#[test]
fn test_config_show_no_config() {
    lifeline_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_show_masks_token_from_file() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "default_profile = \"home\"\n\n\
         [profiles.home]\n\
         server = \"https://sos.example.org/api\"\n\
         token = \"super-secret-token\"\n",
    );

    let output = lifeline_cmd_in(home.path())
        .args(["config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("https://sos.example.org/api"), "{stdout}");
    assert!(stdout.contains("********"), "{stdout}");
    assert!(!stdout.contains("super-secret-token"), "{stdout}");
}

#[test]
fn test_config_show_reports_malformed_file() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "[trigger]\nhold_ms = \"three\"\n");

    let output = lifeline_cmd_in(home.path())
        .args(["config", "show"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let text = combined_output(&output);
    assert!(text.contains("Configuration error"), "{text}");
    assert!(text.contains("hold_ms"), "{text}");
}

#[test]
fn test_sos_refuses_to_run_on_malformed_config() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "[trigger]\nhold_ms = \"three\"\n");

    let output = lifeline_cmd_in(home.path())
        .args(["--server", "http://127.0.0.1:9/api", "sos", "--no-location"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("hold_ms"));
}

#[test]
fn test_config_path_names_toml_file() {
    lifeline_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_invalid_output_format() {
    let output = lifeline_cmd()
        .args(["--output", "invalid", "alerts", "list"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("possible values"),
        "Expected error about invalid output format:\n{text}"
    );
}

#[test]
fn test_latitude_requires_longitude() {
    let output = lifeline_cmd()
        .args(["sos", "--server", "http://127.0.0.1:9/api", "--lat", "12.0"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_out_of_range_latitude_is_rejected() {
    let output = lifeline_cmd()
        .args([
            "sos",
            "--server",
            "http://127.0.0.1:9/api",
            "--lat",
            "123",
            "--lon",
            "0",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("latitude"));
}

// ── Against a mock backend ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_sos_dispatches_after_hold() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sos/trigger"))
        .and(body_partial_json(json!({
            "location": { "latitude": 12.5, "longitude": 77.25 },
            "triggerType": "manual"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sos_id": "SOS_cli_1",
            "notified_contacts": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = format!("{}/api", server.uri());
    let output = run(args(&[
        "sos", "--hold", "50ms", "--server", &api, "--lat", "12.5", "--lon", "77.25", "-o", "json",
    ]))
    .await;

    let text = combined_output(&output);
    assert!(output.status.success(), "sos failed:\n{text}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let session: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(session["state"], "confirmed");
    assert_eq!(session["dispatch_result"]["alertId"], "SOS_cli_1");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sos_auto_without_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sos/trigger"))
        .and(body_partial_json(json!({ "location": null, "triggerType": "auto" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sos_id": "SOS_cli_2" })))
        .expect(1)
        .mount(&server)
        .await;

    let api = format!("{}/api", server.uri());
    let output = run(args(&[
        "sos", "--auto", "--no-location", "--hold", "50ms", "--server", &api, "-o", "plain",
    ]))
    .await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "SOS_cli_2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sos_rejection_exits_with_dispatch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sos/trigger"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid payload" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = format!("{}/api", server.uri());
    let output = run(args(&[
        "sos", "--hold", "50ms", "--server", &api, "--no-location",
    ]))
    .await;

    assert_eq!(output.status.code(), Some(9), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FAILED"), "{stdout}");
    assert!(stdout.contains("Attempts:  1"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sos_release_before_deadline_cancels() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sos/trigger"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sos_id": "never" })))
        .expect(0)
        .mount(&server)
        .await;

    let api = format!("{}/api", server.uri());
    let output = run(args(&[
        "sos",
        "--hold",
        "5s",
        "--release-after",
        "100ms",
        "--server",
        &api,
        "--no-location",
    ]))
    .await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).to_lowercase().contains("cancelled"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
        .mount(&server)
        .await;

    let api = format!("{}/api", server.uri());
    let output = run(args(&["health", "--server", &api, "-o", "plain"])).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "healthy");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_alerts_list_plain_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sos/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "history": [
                { "sos_id": "SOS_b", "status": "active", "timestamp": "2024-05-01T12:00:00" },
                { "sos_id": "SOS_a", "status": "deactivated" }
            ]
        })))
        .mount(&server)
        .await;

    let api = format!("{}/api", server.uri());
    let output = run(args(&["alerts", "list", "--server", &api, "-o", "plain"])).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "SOS_b\nSOS_a");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deactivate_requires_yes_without_tty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sos/deactivate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(0)
        .mount(&server)
        .await;

    let api = format!("{}/api", server.uri());
    let output = run(args(&["alerts", "deactivate", "SOS_a", "--server", &api])).await;

    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_deactivate_with_yes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sos/deactivate"))
        .and(body_partial_json(json!({ "sos_id": "SOS_a" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let api = format!("{}/api", server.uri());
    let output = run(args(&["alerts", "deactivate", "SOS_a", "--yes", "--server", &api])).await;

    assert!(output.status.success(), "{}", combined_output(&output));
}

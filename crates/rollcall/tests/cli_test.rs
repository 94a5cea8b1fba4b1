//! Integration tests for the `rollcall` CLI binary.
//!
//! Argument parsing, help output, completions and error handling run
//! without a service; list and delete flows run against a wiremock server
//! passed with `--server`.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `rollcall` binary with env isolation.
///
/// Clears all `ROLLCALL_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn rollcall_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("rollcall");
    cmd.env("HOME", "/tmp/rollcall-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/rollcall-cli-test-nonexistent")
        .env_remove("ROLLCALL_PROFILE")
        .env_remove("ROLLCALL_SERVER")
        .env_remove("ROLLCALL_TOKEN")
        .env_remove("ROLLCALL_OUTPUT")
        .env_remove("ROLLCALL_INSECURE")
        .env_remove("ROLLCALL_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run the binary against `server` off the async runtime.
async fn run_against(server: &MockServer, args: &[&str]) -> std::process::Output {
    let base = format!("{}/api/", server.uri());
    let args: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    tokio::task::spawn_blocking(move || {
        rollcall_cmd()
            .args(["--server", base.as_str()])
            .args(&args)
            .output()
            .unwrap()
    })
    .await
    .unwrap()
}

fn instructors() -> Value {
    json!([
        { "id": 1, "name": "Alice Smith", "email": "alice@school.test",
          "department": "Math", "status": "active", "presentToday": true },
        { "id": 2, "name": "Bob Jones", "email": "bob@school.test",
          "department": "Science", "status": "on_leave" },
        { "id": 3, "name": "Carol White", "email": "carol@school.test",
          "department": "Math", "status": "active" }
    ])
}

async fn serve_instructors(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/instructors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instructors()))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = rollcall_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    rollcall_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("attendance")
            .and(predicate::str::contains("instructors"))
            .and(predicate::str::contains("emails"))
            .and(predicate::str::contains("backups")),
    );
}

#[test]
fn test_version_flag() {
    rollcall_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rollcall"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    rollcall_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    rollcall_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = rollcall_cmd().arg("attendance-sheet").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_output_format() {
    let output = rollcall_cmd()
        .args(["--output", "xml", "instructors", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("xml"), "Expected rejected value in output:\n{text}");
}

#[test]
fn test_invalid_status_value() {
    let output = rollcall_cmd()
        .args(["tags", "set-status", "4", "misplaced"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_list_without_config_fails() {
    let output = rollcall_cmd().args(["instructors", "list"]).output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("config init"),
        "Expected setup hint in output:\n{text}"
    );
}

#[test]
fn test_config_show_without_file() {
    rollcall_cmd()
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"defaults\""));
}

#[test]
fn test_subcommand_help_lists_actions() {
    rollcall_cmd()
        .args(["backups", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("create")
                .and(predicate::str::contains("restore"))
                .and(predicate::str::contains("delete")),
        );
}

#[test]
fn test_delete_requires_yes_without_terminal() {
    let output = rollcall_cmd()
        .args(["--server", "http://127.0.0.1:9/api/", "readers", "delete", "1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("--yes"), "Expected --yes hint in output:\n{text}");
}

// ── Against a service ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_list_searches_locally() {
    let server = MockServer::start().await;
    serve_instructors(&server).await;

    let output = run_against(&server, &["-o", "json", "instructors", "list", "--search", "ALICE"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));

    let rows: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Alice Smith");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_list_filters_sorts_and_shares() {
    let server = MockServer::start().await;
    serve_instructors(&server).await;

    let output = run_against(
        &server,
        &[
            "-o", "plain", "instructors", "list",
            "--filter", "department=Math", "--sort", "name:desc", "--share",
        ],
    )
    .await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "3\n1");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("department=Math"), "share link missing:\n{stderr}");
    assert!(stderr.contains("sortOrder=desc"), "share link missing:\n{stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_facet_counts() {
    let server = MockServer::start().await;
    serve_instructors(&server).await;

    let output = run_against(&server, &["-o", "plain", "instructors", "list", "--facets"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("department=Math\t2"), "{stdout}");
    assert!(stdout.contains("status=on_leave\t1"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_paged_emails_send_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/emails"))
        .and(query_param("folder", "inbox"))
        .and(query_param("sortBy", "receivedAt"))
        .and(query_param("sortOrder", "desc"))
        .and(query_param("page", "1"))
        .and(query_param("pageSize", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": 7, "subject": "Timetable", "sender": "office@school.test",
                "folder": "inbox", "receivedAt": "2026-09-01T08:00:00Z"
            }],
            "total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(&server, &["-o", "plain", "emails", "list", "--filter", "folder=inbox"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "7");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_session_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/instructors"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "expired" })))
        .mount(&server)
        .await;

    let output = run_against(&server, &["instructors", "list"]).await;
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_bulk_delete_reports_vanished_ids() {
    let server = MockServer::start().await;
    serve_instructors(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/instructors/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(&server, &["--yes", "instructors", "delete", "1", "99"]).await;
    assert_eq!(output.status.code(), Some(9), "{}", combined_output(&output));
    let text = combined_output(&output);
    assert!(text.contains("no longer exists"), "{text}");
    assert!(text.contains("1 succeeded, 1 failed"), "{text}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_typed_ids_keep_their_written_form() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/instructors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "42", "name": "Dana Reed", "email": "dana@school.test", "status": "active" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/instructors/42"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/instructors/007"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            { "id": "007", "name": "Evan Hart", "email": "evan@school.test", "status": "active" }
        )))
        .expect(1)
        .mount(&server)
        .await;

    let output = run_against(&server, &["--yes", "instructors", "delete", "42"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("1 succeeded, 0 failed"));

    let output = run_against(&server, &["-o", "plain", "instructors", "get", "007"]).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "007");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_filter_is_rejected() {
    let server = MockServer::start().await;
    serve_instructors(&server).await;

    let output = run_against(&server, &["instructors", "list", "--filter", "salary=high"]).await;
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

//! End-to-end CLI tests for the fetch binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn start_server() -> (tokio::runtime::Runtime, MockServer) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let server = runtime.block_on(MockServer::start());
    (runtime, server)
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Send one HTTP request"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"));
}

/// Test that a missing URL causes non-zero exit.
#[test]
fn test_binary_missing_url_returns_error() {
    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_prints_body_with_query_and_header() {
    let (runtime, server) = start_server();
    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/hello"))
            .and(query_param("name", "world"))
            .and(header("x-token", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello world"))
            .mount(&server)
            .await;
    });

    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.args(["-Q", "name=world", "-Q", "verbose=false", "-H", "x-token: abc"])
        .arg(format!("{}/hello", server.uri()))
        .assert()
        .success()
        .stdout("hello world");
}

#[test]
fn test_binary_error_status_fails_with_classified_message() {
    let (runtime, server) = start_server();
    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such thing"))
            .mount(&server)
            .await;
    });

    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.arg(format!("{}/missing", server.uri()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"))
        .stderr(predicate::str::contains("no such thing"));
}

#[test]
fn test_binary_output_writes_file() {
    let (runtime, server) = start_server();
    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/report.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a,b\n1,2\n"))
            .mount(&server)
            .await;
    });
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("report.csv");

    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.arg("-o")
        .arg(&target)
        .arg(format!("{}/report.csv", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "a,b\n1,2\n");
}

#[test]
fn test_binary_stat_prints_metadata() {
    let (runtime, server) = start_server();
    runtime.block_on(async {
        Mock::given(method("GET"))
            .and(path("/files/data.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;
    });

    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.arg("--stat")
        .arg(format!("{}/files/data.bin", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("name: data.bin"))
        .stdout(predicate::str::contains("size: 64"));
}

#[test]
fn test_binary_post_json_pretty_prints() {
    let (runtime, server) = start_server();
    runtime.block_on(async {
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(r#"{"ok":true}"#, "application/json"),
            )
            .mount(&server)
            .await;
    });

    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.args(["-X", "post", "-d", "{}", "--content-type", "application/json", "--json"])
        .arg(format!("{}/echo", server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"ok\": true"));
}

#[test]
fn test_binary_quiet_suppresses_logs() {
    let (runtime, server) = start_server();
    runtime.block_on(async {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("quiet"))
            .mount(&server)
            .await;
    });

    let mut cmd = Command::cargo_bin("fetch").unwrap();
    cmd.env_remove("RUST_LOG")
        .arg("-q")
        .arg(server.uri())
        .assert()
        .success()
        .stdout("quiet")
        .stderr(predicate::str::is_empty());
}

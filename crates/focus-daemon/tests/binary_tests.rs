//! Tests for the focusd binary over its stdio transport.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use fs2::FileExt;
use predicates::prelude::*;
use tempfile::tempdir;

fn focusd_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("focusd"))
}

/// Write a focus.toml that keeps every file inside `dir`
fn write_config(dir: &Path) -> std::path::PathBuf {
    let config = format!(
        r#"
[storage]
path = "{storage}"

[enforcement]
backend = "ruleset"
ruleset_path = "{ruleset}"
"#,
        storage = dir.join("filters.toml").display(),
        ruleset = dir.join("ruleset.json").display(),
    );
    let path = dir.join("focus.toml");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_help_output() {
    focusd_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rule sync daemon"));
}

#[test]
fn test_version_output() {
    focusd_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("focusd"));
}

#[test]
fn test_stdio_add_and_list() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());

    focusd_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--stdio")
        .write_stdin(concat!(
            r#"{"type":"ADD_FILTER","pattern":"news.example.com"}"#,
            "\n",
            r#"{"type":"GET_FILTERS"}"#,
            "\n",
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id":1"#))
        .stdout(predicate::str::contains(r#""pattern":"news.example.com""#));

    assert!(dir.path().join("filters.toml").exists());
    let ruleset = fs::read_to_string(dir.path().join("ruleset.json")).unwrap();
    assert!(ruleset.contains("news.example.com"));
}

#[test]
fn test_stdio_state_survives_restart() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());

    focusd_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--stdio")
        .write_stdin("{\"type\":\"ADD_FILTER\",\"pattern\":\"a.com\"}\n")
        .assert()
        .success();

    focusd_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--stdio")
        .write_stdin("{\"type\":\"ADD_FILTER\",\"pattern\":\"b.com\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id":2"#));
}

#[test]
fn test_stdio_reports_bad_requests() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());

    focusd_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--stdio")
        .write_stdin("{\"type\":\"SHUTDOWN\"}\nnot json\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"error":"Unknown request type"}"#))
        .stdout(predicate::str::contains("Invalid request"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("focus.toml");
    fs::write(&config, "[enforcement]\nbackend = \"kernel\"\n").unwrap();

    focusd_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--stdio")
        .assert()
        .failure();
}

#[test]
fn test_socket_and_stdio_conflict() {
    focusd_cmd()
        .args(["--stdio", "--socket", "/tmp/focusd-test.sock"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_refuses_filters_owned_by_another_core() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path());
    let held = fs::File::create(dir.path().join("filters.toml.lock")).unwrap();
    held.lock_exclusive().unwrap();

    focusd_cmd()
        .arg("--config")
        .arg(&config)
        .arg("--stdio")
        .write_stdin(concat!(r#"{"type":"ADD_FILTER","pattern":"a.com"}"#, "\n"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("filters.toml.lock"))
        .stdout(predicate::str::contains("a.com").not());

    assert!(!dir.path().join("filters.toml").exists());
}

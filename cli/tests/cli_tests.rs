use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c2b7e151628aed2a6abf7158809cf4f3c";

/// Helper to write a config file into a fresh temp directory
fn write_config(contents: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("teleview.yml"), contents).unwrap();
    temp_dir
}

fn teleview(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("teleview").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("TELEVIEW_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("teleview").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("telephony logs"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version_command() {
    let dir = TempDir::new().unwrap();
    teleview(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("teleview version"));
}

#[test]
fn test_check_prints_resolved_users() {
    let dir = write_config(&format!(
        r#"
secret_key: "{}"
auth_scheme: basic
basic_auth_user: admin
basic_auth_password: hunter2
policy:
  - name: support
    users: [bob]
    max_resource_age_secs: 3600
    permissions:
      view_messages: true
  - name: admins
    users: [alice]
"#,
        KEY
    ));

    teleview(&dir)
        .args(["--config", "teleview.yml", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("support"))
        .stdout(predicate::str::contains("view_messages"))
        .stdout(predicate::str::contains("Auth scheme: basic"));
}

#[test]
fn test_check_json_format() {
    let dir = write_config(&format!(
        r#"
secret_key: "{}"
policy:
  policy:
    - name: guests
      default: true
      permissions:
        view_calls: true
"#,
        KEY
    ));

    teleview(&dir)
        .args(["--config", "teleview.yml", "check", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"default_group\": \"guests\""))
        .stdout(predicate::str::contains("\"auth_scheme\": \"none\""));
}

#[test]
fn test_config_from_env() {
    let dir = write_config(&format!("secret_key: \"{}\"\n", KEY));

    teleview(&dir)
        .env("TELEVIEW_CONFIG", "teleview.yml")
        .arg("check")
        .assert()
        .success();
}

#[test]
fn test_bad_secret_key_exits_2() {
    let dir = write_config("secret_key: abc123\n");

    teleview(&dir)
        .args(["--config", "teleview.yml", "check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("wrong length"))
        .stderr(predicate::str::contains("abc123").not());
}

#[test]
fn test_invalid_policy_exits_2() {
    let dir = write_config(&format!(
        r#"
secret_key: "{}"
policy:
  - name: a
    users: [alice]
  - name: b
    users: [alice]
"#,
        KEY
    ));

    teleview(&dir)
        .args(["--config", "teleview.yml", "check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("appears twice"));
}

#[test]
fn test_unknown_capability_exits_2() {
    let dir = write_config(
        r#"
policy:
  - name: a
    permissions:
      view_everything: true
"#,
    );

    teleview(&dir)
        .args(["--config", "teleview.yml", "check"])
        .assert()
        .code(2);
}

#[test]
fn test_incomplete_basic_auth_exits_2() {
    let dir = write_config("auth_scheme: basic\nbasic_auth_user: admin\n");

    teleview(&dir)
        .args(["--config", "teleview.yml", "check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Basic Auth"));
}

#[test]
fn test_missing_explicit_config_exits_2() {
    let dir = TempDir::new().unwrap();

    teleview(&dir)
        .args(["--config", "missing.yml", "check"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Couldn't find config file"));
}

#[test]
fn test_missing_default_config_uses_defaults() {
    let dir = TempDir::new().unwrap();

    teleview(&dir)
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains("defaulting to localhost:4114"))
        .stdout(predicate::str::contains("Port: 4114"));
}

#[test]
fn test_log_dir_receives_logs() {
    let dir = write_config(&format!("secret_key: \"{}\"\nlog_dir: logs\n", KEY));

    teleview(&dir)
        .args(["--config", "teleview.yml", "check"])
        .assert()
        .success();

    let entries: Vec<_> = fs::read_dir(dir.path().join("logs")).unwrap().collect();
    assert!(!entries.is_empty());
}

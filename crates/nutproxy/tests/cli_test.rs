//! Integration tests for the `nutproxy` binary.
//!
//! Argument parsing, configuration layering, exit codes and the `query`
//! path against a scripted apcaccess, all without a real apcupsd.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `nutproxy` binary with env isolation.
///
/// Clears all `NUTPROXY_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn nutproxy_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nutproxy");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("RUST_LOG");
    for (key, _) in std::env::vars() {
        if key.starts_with("NUTPROXY_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("apcupsd")
                .and(predicate::str::contains("serve"))
                .and(predicate::str::contains("query"))
                .and(predicate::str::contains("--ups-name")),
        );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nutproxy"));
}

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = nutproxy_cmd(home.path()).arg("foobar").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("foobar"), "Expected error mentioning foobar:\n{text}");
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_config_prints_defaults() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("port = 3493")
                .and(predicate::str::contains("ups_name = \"ups\""))
                .and(predicate::str::contains("timeout = \"30s\"")),
        );
}

#[test]
fn test_flags_override_file_and_env() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("custom.toml");
    std::fs::write(&file, "port = 4000\nups_name = \"from-file\"\n").unwrap();

    nutproxy_cmd(home.path())
        .env("NUTPROXY_TARGET_ADDRESS", "10.1.1.1")
        .env("NUTPROXY_UPS_NAME", "from-env")
        .arg("--config")
        .arg(&file)
        .args(["--ups-name", "from-flag", "config"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("port = 4000")
                .and(predicate::str::contains("target_address = \"10.1.1.1\""))
                .and(predicate::str::contains("ups_name = \"from-flag\"")),
        );
}

#[test]
fn test_config_write_persists_file() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .args(["--port", "13493", "config", "--write"])
        .assert()
        .success();

    let written = home.path().join("nutproxy").join("config.toml");
    let text = std::fs::read_to_string(&written).unwrap();
    assert!(text.contains("port = 13493"), "unexpected file contents:\n{text}");
}

#[test]
fn test_missing_config_file_exits_with_config_code() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .args(["--config", "/nonexistent/nutproxy.toml", "config"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_invalid_ups_name_exits_with_config_code() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .args(["--ups-name", "two words", "config"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("ups_name"));
}

#[test]
fn test_invalid_timeout_exits_with_config_code() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .args(["--timeout", "0s", "query"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("timeout"));
}

// ── Telemetry ───────────────────────────────────────────────────────

#[test]
fn test_query_missing_apcaccess_exits_with_execution_code() {
    let home = tempfile::tempdir().unwrap();
    nutproxy_cmd(home.path())
        .args(["query", "--apcaccess-executable", "/nonexistent/apcaccess"])
        .assert()
        .code(5);
}

#[cfg(unix)]
#[test]
fn test_query_prints_list_var() {
    use std::os::unix::fs::PermissionsExt;

    let home = tempfile::tempdir().unwrap();
    let script = home.path().join("apcaccess");
    std::fs::write(
        &script,
        "#!/bin/sh\n\
         [ \"$1\" = \"-h\" ] && [ \"$3\" = \"-u\" ] || exit 1\n\
         printf 'STATUS   : ONLINE\\nBCHARGE  : 100.0\\nTIMELEFT : 12.5\\nHOSTNAME : %s\\n' \"$2\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    nutproxy_cmd(home.path())
        .args(["query", "--ups-name", "rack", "--target-address", "ups-host"])
        .arg("--apcaccess-executable")
        .arg(&script)
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("BEGIN LIST VAR rack\n")
                .and(predicate::str::contains("VAR rack ups.status \"OL ONLINE\"\n"))
                .and(predicate::str::contains("VAR rack battery.runtime \"750\"\n"))
                .and(predicate::str::contains("VAR rack battery.charge \"100.0\"\n"))
                .and(predicate::str::ends_with("END LIST VAR rack\n")),
        );
}

#[test]
fn test_serve_on_busy_port_exits_with_bind_code() {
    let home = tempfile::tempdir().unwrap();
    let busy = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = busy.local_addr().unwrap().port().to_string();

    nutproxy_cmd(home.path())
        .args(["serve", "--address", "127.0.0.1", "--port", &port])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Could not listen"));
}

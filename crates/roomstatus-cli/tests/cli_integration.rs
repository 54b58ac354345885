//! CLI integration tests.
//!
//! These run the built binary with HOME and the XDG directories pointed at a
//! temporary directory, so no device and no user configuration is needed.
//! Hardware tests live in roomstatus-core.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn run_in(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_roomstatus"))
        .args(args)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env_remove("ROOMSTATUS_DEVICE")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run roomstatus binary")
}

fn run(args: &[&str]) -> Output {
    let home = TempDir::new().unwrap();
    run_in(home.path(), args)
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = run(&["--help"]);
    assert!(output.status.success(), "Help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("roomstatus"), "Help should mention roomstatus");
    for cmd in ["monitor", "status", "read", "gain", "messages", "config"] {
        assert!(stdout.contains(cmd), "Help should list {cmd} command");
    }
}

#[test]
fn test_version_command() {
    let output = run(&["--version"]);
    assert!(output.status.success(), "Version should succeed");
    assert!(String::from_utf8_lossy(&output.stdout).contains("roomstatus"));
}

#[test]
fn test_subcommand_help() {
    for cmd in ["monitor", "status", "read", "gain", "messages", "config", "completions"] {
        let output = run(&[cmd, "--help"]);
        assert!(output.status.success(), "{} --help should succeed", cmd);
        assert!(!output.stdout.is_empty(), "{} --help should produce output", cmd);
    }
}

#[test]
fn test_status_requires_text() {
    let output = run(&["status"]);
    assert!(!output.status.success());
}

// =============================================================================
// Config and Preference Commands (no device required)
// =============================================================================

#[test]
fn test_config_path() {
    let output = run(&["config", "path"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("config.toml"));
}

#[test]
fn test_messages_persist_to_config() {
    let home = TempDir::new().unwrap();

    let output = run_in(home.path(), &["messages", "--busy", "会議中です"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run_in(home.path(), &["config", "show"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("会議中です"));

    let output = run_in(home.path(), &["messages", "--reset"]);
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("会議中です"));
}

#[test]
fn test_gain_round_trip() {
    let home = TempDir::new().unwrap();

    let output = run_in(home.path(), &["gain", "0.5"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run_in(home.path(), &["gain"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("0.5"));
}

#[test]
fn test_gain_out_of_range_fails() {
    let output = run(&["gain", "2.0"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("between 0.0 and 1.0"));
}

#[test]
fn test_completions_bash() {
    let output = run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("roomstatus"));
}

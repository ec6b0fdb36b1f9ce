//! Integration tests for CLI argument handling
//!
//! Runs the weathercache binary with various flags and inputs.

use std::io::Write;
use std::process::{Command, Stdio};

/// Helper to run the CLI with given args and stdin, capturing output
fn run_cli(args: &[&str], stdin: &str) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_weathercache"))
        .args(args)
        .env("RUST_LOG", "weathercache=debug")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute weathercache");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");

    child.wait_with_output().expect("Failed to wait for weathercache")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"], "");
    assert!(output.status.success(), "Expected --help to exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("weathercache"), "Help should mention weathercache");
    assert!(stdout.contains("--sweep-interval-hours"));
    assert!(stdout.contains("--default-endpoint"));
}

#[test]
fn test_invalid_sweep_interval_prints_error_and_exits() {
    let output = run_cli(&["--sweep-interval-hours", "0"], "");
    assert!(!output.status.success(), "Expected zero sweep interval to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("sweep interval"),
        "Should print error about the sweep interval: {}",
        stderr
    );
}

#[test]
fn test_invalid_default_endpoint_exits() {
    let output = run_cli(&["--default-endpoint", "not-a-url"], "");
    assert!(!output.status.success());
}

#[test]
fn test_empty_stdin_shuts_down_cleanly() {
    let output = run_cli(&[], "");
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("janitor stopped"), "stderr: {}", stderr);
}

#[test]
fn test_malformed_and_incomplete_requests_produce_no_output() {
    let input = "this is not json\n\n{\"apikey\":\"k\",\"longitude\":20}\n";
    let output = run_cli(&[], input);
    assert!(output.status.success());
    assert!(output.stdout.is_empty(), "no response expected");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed request line"), "stderr: {}", stderr);
    assert!(stderr.contains("missing latitude"), "stderr: {}", stderr);
}

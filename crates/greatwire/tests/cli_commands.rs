#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn greatwire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_greatwire"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("GREATWIRE_SERIAL")
        .env_remove("GREATWIRE_VID")
        .env_remove("GREATWIRE_PID")
        .env_remove("GREATWIRE_LOG")
        .output()
        .expect("greatwire should run")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn version_prints_package_version() {
    let output = greatwire(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("greatwire {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn extended_version_reports_build() {
    let output = greatwire(&["version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: greatwire"));
    assert!(stdout.contains("usb_ids: 1d50:60e6"));
}

#[test]
fn exec_rejects_malformed_format_before_opening_device() {
    let output = greatwire(&["exec", "0x10", "1", "--in-format", "<(B"]);
    assert_eq!(output.status.code(), Some(64));
    let stderr = stderr(&output);
    assert!(stderr.contains("--in-format"), "stderr: {stderr}");
    assert!(!stderr.contains("open device"), "stderr: {stderr}");
}

#[test]
fn exec_rejects_misplaced_wildcard() {
    let output = greatwire(&["exec", "0", "4", "--out-format", "<*II"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("--out-format"));
}

#[test]
fn exec_checks_arguments_against_format() {
    let output = greatwire(&["exec", "0", "5", "--in-format", "<I", "--args", "[1, 2]"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("--args"));

    let output = greatwire(&["exec", "0", "5", "--in-format", "<B", "--args", "[300]"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn call_rejects_invalid_json() {
    let output = greatwire(&["call", "leds", "toggle", "--args", "[1,"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(stderr(&output).contains("not valid JSON"));
}

#[test]
fn bad_durations_are_rejected_by_the_parser() {
    let output = greatwire(&["exec", "0", "0", "--timeout", "0s"]);
    assert_eq!(output.status.code(), Some(2));
}

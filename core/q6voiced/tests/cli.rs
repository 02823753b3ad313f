use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn run_daemon(args: &[&str], config_dir: &TempDir) -> Output {
    Command::new(env!("CARGO_BIN_EXE_q6voiced"))
        .args(args)
        // Keep a stray system config from influencing the run.
        .env("Q6VOICED_CONFIG", config_dir.path().join("absent.toml"))
        // Point the bus somewhere unreachable; argument errors must exit before using it.
        .env("DBUS_SYSTEM_BUS_ADDRESS", "unix:path=/nonexistent/q6voiced-test-bus")
        .stdin(Stdio::null())
        .output()
        .expect("Failed to run q6voiced")
}

fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

#[test]
fn two_arguments_print_usage_and_exit_one() {
    let config_dir = TempDir::new().expect("temp dir");
    let output = run_daemon(&["0", "4"], &config_dir);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("usage: q6voiced CARD_NUM DEVICE_NUM CALLBACK_SCRIPT"),
        "unexpected stdout: {}",
        stdout
    );
    assert!(!combined_output(&output).contains("D-Bus"));
}

#[test]
fn no_arguments_print_usage_and_exit_one() {
    let config_dir = TempDir::new().expect("temp dir");
    let output = run_daemon(&[], &config_dir);

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("usage: q6voiced"));
}

#[test]
fn too_many_arguments_exit_one() {
    let config_dir = TempDir::new().expect("temp dir");
    let output = run_daemon(&["0", "4", "/bin/true", "extra"], &config_dir);

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("usage: q6voiced"));
}

#[test]
fn non_numeric_card_exits_one() {
    let config_dir = TempDir::new().expect("temp dir");
    let output = run_daemon(&["card0", "4", "/bin/true"], &config_dir);

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("usage: q6voiced"));
}

#[test]
fn help_exits_zero() {
    let config_dir = TempDir::new().expect("temp dir");
    let output = run_daemon(&["--help"], &config_dir);

    assert_eq!(output.status.code(), Some(0));
    assert!(combined_output(&output).contains("CALLBACK_SCRIPT"));
}

#[test]
fn malformed_config_exits_one_before_bus() {
    let config_dir = TempDir::new().expect("temp dir");
    let config_path = config_dir.path().join("q6voiced.toml");
    fs_err::write(&config_path, "[loopback\n").expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_q6voiced"))
        .args(["0", "4", "/bin/true", "--config"])
        .arg(&config_path)
        .env("DBUS_SYSTEM_BUS_ADDRESS", "unix:path=/nonexistent/q6voiced-test-bus")
        .output()
        .expect("Failed to run q6voiced");

    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("Config file malformed"));
}

#[test]
fn repeated_bus_failures_exit_immediately() {
    let config_dir = TempDir::new().expect("temp dir");

    for _ in 0..5 {
        let started = Instant::now();
        let output = Command::new(env!("CARGO_BIN_EXE_q6voiced"))
            .args(["0", "4", "/bin/true"])
            .env("Q6VOICED_CONFIG", config_dir.path().join("absent.toml"))
            .env("DBUS_SYSTEM_BUS_ADDRESS", "unix:path=/nonexistent/q6voiced-test-bus")
            .env("RUST_LOG", "info")
            .output()
            .expect("Failed to run q6voiced");

        assert_eq!(output.status.code(), Some(1));
        assert!(combined_output(&output).contains("q6voiced failed"));
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "restart was delayed by {:?}",
            started.elapsed()
        );
    }
}

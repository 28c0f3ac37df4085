//! Binary-level tests: help, version, check mode, startup failures, signals

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use predicates::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

/// Config file whose stores all live under the temp dir
fn write_config(dir: &TempDir, extra: &str) -> PathBuf {
    let root = dir.path();
    let monitored = root.join("monitored.log");
    fs::write(&monitored, "").unwrap();
    let config = format!(
        r#"
[scanner]
monitored_file = "{}"
address_file = "{}"
timeout_dir = "{}"
patterns = ['from ((?:\d{{1,3}}\.){{3}}\d{{1,3}})']
timeout_seconds = 60
interval_seconds = 1

[logging]
file = "{}"
{}
"#,
        monitored.display(),
        root.join("watchlist").display(),
        root.join("timeout").display(),
        root.join("iplsd.log").display(),
        extra
    );
    let path = root.join("config.toml");
    fs::write(&path, config).unwrap();
    path
}

fn wait_for<F: FnMut() -> bool>(limit: Duration, mut condition: F) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    condition()
}

fn file_contains(path: &Path, needle: &str) -> bool {
    fs::read_to_string(path)
        .map(|s| s.contains(needle))
        .unwrap_or(false)
}

#[test]
fn test_help_lists_options() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("iplsd");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--monitored-file"))
        .stdout(predicate::str::contains("--regex"))
        .stdout(predicate::str::contains("--timeout-seconds"))
        .stdout(predicate::str::contains("--check"));
}

#[test]
fn test_version_reports_package_version() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("iplsd");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("iplsd"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_check_prints_effective_settings() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, "");

    let mut cmd = assert_cmd::cargo_bin_cmd!("iplsd");
    cmd.env_remove("RUST_LOG")
        .args(["--config", config.to_str().unwrap(), "--check", "--timeout-seconds", "120"]);
    let output = cmd.assert().success().get_output().stdout.clone();

    let settings: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(settings["address_timeout"]["secs"], 120);
    assert_eq!(settings["follow"]["program"], "tail");
    assert_eq!(settings["patterns"].as_array().unwrap().len(), 1);
    // stores are prepared even in check mode
    assert!(dir.path().join("watchlist").is_file());
    assert!(dir.path().join("timeout").is_dir());
}

#[test]
fn test_bad_regex_fails_startup() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, "");

    let mut cmd = assert_cmd::cargo_bin_cmd!("iplsd");
    cmd.args(["--config", config.to_str().unwrap(), "--check", "-r", "from (unclosed"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed regex compile"));
}

#[test]
fn test_corrupt_watchlist_fails_startup() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, "");
    fs::write(dir.path().join("watchlist"), "10.0.0.1\nnot-an-address\n").unwrap();

    let mut cmd = assert_cmd::cargo_bin_cmd!("iplsd");
    cmd.args(["--config", config.to_str().unwrap(), "--check"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not-an-address"));
}

#[test]
fn test_missing_config_file_fails() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("iplsd");
    cmd.args(["--config", "/nonexistent/iplsd.toml"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_zero_interval_rejected() {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, "");

    let mut cmd = assert_cmd::cargo_bin_cmd!("iplsd");
    cmd.args(["--config", config.to_str().unwrap(), "--interval-seconds", "0"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("interval_seconds"));
}

fn exits_cleanly_on(signal: Signal, received: &str) {
    let dir = tempdir().unwrap();
    let config = write_config(&dir, "");
    let log = dir.path().join("iplsd.log");
    let watchlist = dir.path().join("watchlist");

    let mut child = Command::new(env!("CARGO_BIN_EXE_iplsd"))
        .env_remove("RUST_LOG")
        .args(["--config", config.to_str().unwrap(), "--verbose"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // logged once both signal handlers are installed
    assert!(
        wait_for(Duration::from_secs(10), || file_contains(&log, "CTRL-C to exit")),
        "daemon never finished startup"
    );

    let mut monitored = OpenOptions::new()
        .append(true)
        .open(dir.path().join("monitored.log"))
        .unwrap();
    writeln!(monitored, "sshd[1]: connection from 172.16.0.9 port 22").unwrap();
    assert!(wait_for(Duration::from_secs(10), || file_contains(&watchlist, "172.16.0.9")));

    kill(Pid::from_raw(child.id() as i32), signal).unwrap();

    let mut status = None;
    assert!(wait_for(Duration::from_secs(10), || {
        status = child.try_wait().unwrap();
        status.is_some()
    }));
    assert!(status.unwrap().success());
    assert!(file_contains(&log, received));
    assert!(dir.path().join("timeout").join("172.16.0.9").is_file());
}

#[test]
fn test_sigterm_exits_cleanly_after_matching() {
    exits_cleanly_on(Signal::SIGTERM, "received SIGTERM");
}

#[test]
fn test_sigint_exits_cleanly_after_matching() {
    exits_cleanly_on(Signal::SIGINT, "received SIGINT");
}

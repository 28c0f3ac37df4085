#![allow(dead_code)]

use iplsd::hook::CommandLine;
use iplsd::ScannerSettings;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

/// Settings rooted in `dir` with a short timeout and sweep interval
pub fn quick_settings(dir: &Path, timeout: Duration) -> ScannerSettings {
    let log_file = dir.join("monitored.log");
    std::fs::write(&log_file, "").unwrap();
    ScannerSettings {
        log_file,
        address_file: dir.join("watchlist"),
        timeout_dir: dir.join("timeout"),
        patterns: vec![r"connection from ((?:\d{1,3}\.){3}\d{1,3})".to_string()],
        address_timeout: timeout,
        tick_interval: Duration::from_millis(200),
        follow: CommandLine::new("tail", ["-F"]),
        add_command: None,
        delete_command: None,
    }
}

pub fn append_line(path: &Path, line: &str) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    writeln!(file, "{}", line).unwrap();
}

pub fn watchlist(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Poll `condition` until it holds or `limit` elapses
pub async fn eventually<F>(limit: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

//! Structured outcome records
//!
//! Each record is a human-readable message followed by a JSON payload, sent
//! through the `log` facade so it reaches whichever backend is installed.

use chrono::{DateTime, Utc};
use log::Level;
use serde_json::json;
use std::path::Path;

use crate::store::timeout::format_timestamp;
use crate::store::{AddOutcome, RemoveOutcome};

/// Log scanner startup
pub fn scanner_startup(log_file: &Path, address_file: &Path, pid: u32) {
    let data = json!({
        "event": "scanner_startup",
        "pid": pid,
        "monitored_file": log_file.display().to_string(),
        "address_file": address_file.display().to_string(),
        "timestamp": Utc::now().to_rfc3339(),
    });
    log_structured(Level::Info, "Scanner started", &data);
}

/// Log the end of the shutdown cascade
pub fn scanner_shutdown(caller: &str) {
    let data = json!({
        "event": "scanner_shutdown",
        "caller": caller,
        "timestamp": Utc::now().to_rfc3339(),
    });
    log_structured(Level::Info, &format!("shutdown[{}]", caller), &data);
}

/// Log a match that refreshed an address
pub fn address_matched(addr: &str, outcome: AddOutcome, expires_at: DateTime<Utc>, list: &Path) {
    let data = json!({
        "event": "address_matched",
        "address": addr,
        "outcome": outcome.as_str(),
        "expires_at": format_timestamp(expires_at),
        "address_file": list.display().to_string(),
        "timestamp": Utc::now().to_rfc3339(),
    });
    log_structured(
        Level::Info,
        &format!("scanner: IP {} {} {}", addr, outcome, list.display()),
        &data,
    );
}

/// Log an address reaped by the sweep
pub fn address_expired(addr: &str, outcome: RemoveOutcome, list: &Path) {
    let data = json!({
        "event": "address_expired",
        "address": addr,
        "outcome": outcome.as_str(),
        "address_file": list.display().to_string(),
        "timestamp": Utc::now().to_rfc3339(),
    });
    log_structured(
        Level::Info,
        &format!("reaper: expired IP {} {} {}", addr, outcome, list.display()),
        &data,
    );
}

/// Log an address that survives a sweep
pub fn address_active(addr: &str, expires_at: DateTime<Utc>) {
    let data = json!({
        "event": "address_active",
        "address": addr,
        "expires_at": format_timestamp(expires_at),
    });
    log_structured(Level::Debug, &format!("reaper: active {}", addr), &data);
}

fn log_structured(level: Level, message: &str, data: &serde_json::Value) {
    log::log!(level, "{} | {}", message, data);
}

//! Global constants for iplsd
//!
//! Centralized location for application-wide constants

/// Application subsystem identifier for macOS Unified Logging System
pub const APP_SUBSYSTEM: &str = "net.rstms.iplsd";

/// System-wide configuration file, preferred when present
pub const SYSTEM_CONFIG_PATH: &str = "/etc/iplsd/config.toml";

/// Per-user configuration file name, resolved against the home directory
pub const USER_CONFIG_NAME: &str = ".iplsd.toml";

pub const DEFAULT_ADDRESS_FILE: &str = "/etc/iplsd/watchlist";
pub const DEFAULT_TIMEOUT_DIR: &str = "/etc/iplsd/timeout";

/// Default match pattern: first dotted quad on the line
pub const DEFAULT_PATTERN: &str = r"((?:\d{1,3}\.){3}\d{1,3})";

/// Address presence timeout (24 hours)
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 86_400;

/// Expiration sweep interval (10 minutes)
pub const DEFAULT_INTERVAL_SECONDS: u64 = 600;

/// Follow process used when none is configured; `-F` survives log rotation
pub const DEFAULT_FOLLOW_PROGRAM: &str = "tail";
pub const DEFAULT_FOLLOW_ARGS: &[&str] = &["-F"];

/// Permissions for the timeout directory and for store files
pub const STORE_DIR_MODE: u32 = 0o700;
pub const STORE_FILE_MODE: u32 = 0o600;

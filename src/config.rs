//! Configuration management
//!
//! Handles TOML configuration parsing, defaults, validation, and conversion
//! into the settings the scanner core consumes.

use crate::constants::{
    DEFAULT_ADDRESS_FILE, DEFAULT_FOLLOW_ARGS, DEFAULT_FOLLOW_PROGRAM, DEFAULT_INTERVAL_SECONDS,
    DEFAULT_PATTERN, DEFAULT_TIMEOUT_DIR, DEFAULT_TIMEOUT_SECONDS, SYSTEM_CONFIG_PATH,
    USER_CONFIG_NAME,
};
use crate::hook::CommandLine;
use crate::scanner::ScannerSettings;
use anyhow::{bail, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    pub scanner: ScannerConfig,
    pub follow: FollowConfig,
    pub hooks: HookConfig,
    pub logging: LoggingConfig,
}

/// Monitored file, stores, patterns, and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerConfig {
    /// Log file to follow (required)
    pub monitored_file: PathBuf,
    /// Watchlist table file
    pub address_file: PathBuf,
    /// Directory of per-address timeout records
    pub timeout_dir: PathBuf,
    /// Match patterns, applied in order; group 1 is the address
    pub patterns: Vec<String>,
    /// Address presence timeout in seconds
    pub timeout_seconds: u64,
    /// Expiration sweep interval in seconds
    pub interval_seconds: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            monitored_file: PathBuf::new(),
            address_file: PathBuf::from(DEFAULT_ADDRESS_FILE),
            timeout_dir: PathBuf::from(DEFAULT_TIMEOUT_DIR),
            patterns: vec![DEFAULT_PATTERN.to_string()],
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
        }
    }
}

/// Follow process; the monitored file is appended as the last argument
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FollowConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_FOLLOW_PROGRAM.to_string(),
            args: DEFAULT_FOLLOW_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Optional commands run when an address is added or expires
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HookConfig {
    pub add: Option<CommandLine>,
    pub delete: Option<CommandLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// error | warn | info | debug | trace
    pub level: String,
    /// Log to this file instead of the platform default
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Configuration {
    /// System config if present, else the per-user file if present
    pub fn default_config_path() -> Option<PathBuf> {
        let system = PathBuf::from(SYSTEM_CONFIG_PATH);
        if system.is_file() {
            return Some(system);
        }
        dirs::home_dir()
            .map(|home| home.join(USER_CONFIG_NAME))
            .filter(|path| path.is_file())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("config file '{}' not found", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.scanner.monitored_file.as_os_str().is_empty() {
            bail!("monitored_file is required");
        }
        if self.scanner.patterns.is_empty() {
            bail!("at least one regex pattern is required");
        }
        if self.scanner.timeout_seconds == 0 {
            bail!("invalid timeout_seconds: must be greater than zero");
        }
        if self.scanner.interval_seconds == 0 {
            bail!("invalid interval_seconds: must be greater than zero");
        }
        if self.follow.program.is_empty() {
            bail!("follow program must not be empty");
        }
        for (name, hook) in [("add", &self.hooks.add), ("delete", &self.hooks.delete)] {
            if matches!(hook, Some(cmd) if cmd.program.is_empty()) {
                bail!("{} hook program must not be empty", name);
            }
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        self.logging
            .level
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid log level: {}", self.logging.level))
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.scanner.timeout_seconds)
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.scanner.interval_seconds)
    }

    pub fn scanner_settings(&self) -> ScannerSettings {
        ScannerSettings {
            log_file: self.scanner.monitored_file.clone(),
            address_file: self.scanner.address_file.clone(),
            timeout_dir: self.scanner.timeout_dir.clone(),
            patterns: self.scanner.patterns.clone(),
            address_timeout: self.timeout_duration(),
            tick_interval: self.interval_duration(),
            follow: CommandLine::new(self.follow.program.clone(), self.follow.args.clone()),
            add_command: self.hooks.add.clone(),
            delete_command: self.hooks.delete.clone(),
        }
    }
}

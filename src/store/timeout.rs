//! Timeout store: one expiration record per address
//!
//! Each record is a regular file named after the address whose content is an
//! RFC 3339 timestamp with nanosecond precision.

use super::write_private;
use crate::constants::STORE_DIR_MODE;
use crate::error::{Result, ScannerError};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An address and the instant it stops being watched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutRecord {
    pub address: String,
    pub expires_at: DateTime<Utc>,
}

impl TimeoutRecord {
    /// Expired once `now` reaches the expiration; the boundary instant counts
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a stored timestamp; any RFC 3339 offset is accepted
pub fn parse_timestamp(text: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text.trim()).map(|t| t.with_timezone(&Utc))
}

#[derive(Debug, Clone)]
pub struct TimeoutStore {
    dir: PathBuf,
    timeout: Duration,
}

impl TimeoutStore {
    /// Open the store directory, creating it owner-only if absent
    pub fn open(dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            info!("creating timeout directory: '{}'", dir.display());
            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(STORE_DIR_MODE)
                .create(&dir)
                .map_err(|e| ScannerError::io("failed creating timeout directory", &dir, e))?;
        }
        Ok(Self { dir, timeout })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, addr: &str) -> PathBuf {
        self.dir.join(addr)
    }

    pub fn exists(&self, addr: &str) -> bool {
        self.record_path(addr).is_file()
    }

    /// Create or overwrite the record with expiration `now + timeout`
    pub fn refresh(&self, addr: &str) -> Result<DateTime<Utc>> {
        self.refresh_at(addr, Utc::now())
    }

    pub fn refresh_at(&self, addr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let expires_at = chrono::Duration::from_std(self.timeout)
            .ok()
            .and_then(|timeout| now.checked_add_signed(timeout))
            .ok_or(ScannerError::InvalidDuration {
                name: "timeout",
                reason: "expiration out of range",
            })?;
        self.write(addr, expires_at)?;
        Ok(expires_at)
    }

    pub fn write(&self, addr: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let path = self.record_path(addr);
        write_private(&path, format_timestamp(expires_at).as_bytes())
            .map_err(|e| ScannerError::io("failed writing timeout file", &path, e))
    }

    pub fn read(&self, addr: &str) -> Result<TimeoutRecord> {
        self.read_path(addr.to_string(), self.record_path(addr))
    }

    fn read_path(&self, address: String, path: PathBuf) -> Result<TimeoutRecord> {
        let content = load(&path)?;
        parse_record(address, path, &content)
    }

    pub fn remove(&self, addr: &str) -> Result<()> {
        let path = self.record_path(addr);
        std::fs::remove_file(&path)
            .map_err(|e| ScannerError::io("failed deleting timeout file", &path, e))
    }

    /// All records in directory-listing order
    ///
    /// Only regular files are records. An empty file is a record caught
    /// mid-rewrite and is skipped; anything else that fails to parse is
    /// corruption and aborts the listing.
    pub fn records(&self) -> Result<Vec<TimeoutRecord>> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| ScannerError::io("failed listing timeout directory", &self.dir, e))?;

        let mut records = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| ScannerError::io("failed listing timeout directory", &self.dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| ScannerError::io("failed inspecting timeout entry", entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            let path = entry.path();
            let content = load(&path)?;
            if content.trim().is_empty() {
                debug!("skipping empty timeout file {}", path.display());
                continue;
            }
            let address = entry.file_name().to_string_lossy().into_owned();
            records.push(parse_record(address, path, &content)?);
        }
        Ok(records)
    }
}

fn load(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| ScannerError::io("failed reading timeout file", path, e))
}

fn parse_record(address: String, path: PathBuf, content: &str) -> Result<TimeoutRecord> {
    let expires_at = parse_timestamp(content).map_err(|source| ScannerError::CorruptTimeout {
        path,
        content: content.trim().to_string(),
        source,
    })?;
    Ok(TimeoutRecord {
        address,
        expires_at,
    })
}

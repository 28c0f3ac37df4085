//! Watchlist store: the flat address table file
//!
//! Format: UTF-8, one address per line, trailing newline, no blank lines and
//! no duplicates. New addresses are appended; removals keep the order of the
//! surviving entries.

use super::{is_address, write_private};
use crate::constants::STORE_FILE_MODE;
use crate::error::{Result, ScannerError};
use log::info;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Result of adding an address to the watchlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

impl AddOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddOutcome::Added => "added to",
            AddOutcome::AlreadyPresent => "already present in",
        }
    }
}

impl fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of removing an address from the watchlist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Deleted,
    NotPresent,
}

impl RemoveOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoveOutcome::Deleted => "deleted from",
            RemoveOutcome::NotPresent => "not present in",
        }
    }
}

impl fmt::Display for RemoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct WatchlistStore {
    path: PathBuf,
}

impl WatchlistStore {
    /// Open the watchlist, creating an empty owner-only file if absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            info!("creating address file: '{}'", path.display());
            OpenOptions::new()
                .write(true)
                .create(true)
                .mode(STORE_FILE_MODE)
                .open(&path)
                .map_err(|e| ScannerError::io("failed creating address file", &path, e))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all addresses in file order
    ///
    /// Blank lines are skipped; any other line that is not address-shaped
    /// means the file is corrupt.
    pub fn read(&self) -> Result<Vec<String>> {
        let file = std::fs::File::open(&self.path)
            .map_err(|e| ScannerError::io("failed opening address file", &self.path, e))?;

        let mut addrs = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line =
                line.map_err(|e| ScannerError::io("failed reading address file", &self.path, e))?;
            let addr = line.trim();
            if addr.is_empty() {
                continue;
            }
            if !is_address(addr) {
                return Err(ScannerError::CorruptWatchlist {
                    path: self.path.clone(),
                    line: index + 1,
                    content: addr.to_string(),
                });
            }
            addrs.push(addr.to_string());
        }
        Ok(addrs)
    }

    /// Append the address unless it is already listed
    pub fn add(&self, addr: &str) -> Result<AddOutcome> {
        let mut addrs = self.read()?;
        if addrs.iter().any(|a| a == addr) {
            return Ok(AddOutcome::AlreadyPresent);
        }
        addrs.push(addr.to_string());
        self.write(&addrs)?;
        Ok(AddOutcome::Added)
    }

    /// Remove the address if listed; absent addresses are not an error
    pub fn remove(&self, addr: &str) -> Result<RemoveOutcome> {
        let mut addrs = self.read()?;
        let Some(index) = addrs.iter().position(|a| a == addr) else {
            return Ok(RemoveOutcome::NotPresent);
        };
        addrs.remove(index);
        self.write(&addrs)?;
        Ok(RemoveOutcome::Deleted)
    }

    fn write(&self, addrs: &[String]) -> Result<()> {
        let mut contents = String::with_capacity(addrs.iter().map(|a| a.len() + 1).sum());
        for addr in addrs {
            contents.push_str(addr);
            contents.push('\n');
        }
        write_private(&self.path, contents.as_bytes())
            .map_err(|e| ScannerError::io("failed writing address file", &self.path, e))
    }
}

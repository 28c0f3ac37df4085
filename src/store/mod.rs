//! File-backed state
//!
//! Two stores hold the daemon's durable state:
//! - `WatchlistStore`: one text file listing the currently watched addresses
//! - `TimeoutStore`: one file per address holding its expiration instant
//!
//! Neither store locks across read-modify-write; the tail and reaper workers
//! may interleave, and the last writer wins.

pub mod timeout;
pub mod watchlist;

pub use timeout::{TimeoutRecord, TimeoutStore};
pub use watchlist::{AddOutcome, RemoveOutcome, WatchlistStore};

use crate::constants::STORE_FILE_MODE;
use regex::Regex;
use std::fs::OpenOptions;
use std::io::Write;
use std::net::Ipv6Addr;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::OnceLock;

fn ipv4_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^(?:\d{1,3}\.){3}\d{1,3}$").expect("static address pattern compiles")
    })
}

/// Check that a token has the shape of an IP address
///
/// IPv4 is checked by shape only (dotted quad of 1-3 digit groups), matching
/// what log patterns extract. IPv6 must parse as a literal.
pub fn is_address(token: &str) -> bool {
    ipv4_shape().is_match(token) || token.parse::<Ipv6Addr>().is_ok()
}

/// Write a store file, creating it owner-only if absent
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(STORE_FILE_MODE)
        .open(path)?;
    file.write_all(contents)?;
    file.flush()
}

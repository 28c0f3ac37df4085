//! iplsd - IP log scan daemon library
//!
//! Follows a log file, extracts addresses with regex capture groups, and
//! maintains a watchlist file whose entries expire after a configurable
//! timeout.

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod hook;
pub mod logging;
pub mod scanner;
pub mod store;

pub use error::{ErrorKind, Result, ScannerError};
pub use scanner::{Scanner, ScannerSettings};

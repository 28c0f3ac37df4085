//! Error types for the scanner core
//!
//! Every fatal condition travels up through the owning worker's result to
//! `Scanner::run`, so each variant carries enough context to be logged once.

use std::path::PathBuf;
use std::process::ExitStatus;

/// Broad classification of a [`ScannerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad patterns or durations, detected at construction
    Configuration,
    /// A store file holds content that cannot be parsed
    StoreCorruption,
    /// The follow process could not be spawned, read, or exited abnormally
    Subprocess,
    /// An add/delete hook failed to spawn or exited non-zero
    Hook,
    /// Filesystem, signal registration, or task failures
    Runtime,
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("failed regex compile '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid {name}: {reason}")]
    InvalidDuration {
        name: &'static str,
        reason: &'static str,
    },

    #[error("{context} '{}': {source}", .path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected address '{content}' found in address list file {} (line {line})", .path.display())]
    CorruptWatchlist {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("failed parsing expiration '{content}' from {}: {source}", .path.display())]
    CorruptTimeout {
        path: PathBuf,
        content: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("failed spawning follow command '{program}': {source}")]
    TailSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("follow command '{program}' exited abnormally: {status}")]
    TailExited { program: String, status: ExitStatus },

    #[error("failed reading follow command {stream}: {source}")]
    TailRead {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("failed spawning {hook} hook '{program}': {source}")]
    HookSpawn {
        hook: &'static str,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{hook} hook '{command}' failed ({status}): {stderr}")]
    HookFailed {
        hook: &'static str,
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed registering {signal} handler: {source}")]
    SignalRegistration {
        signal: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{worker} worker terminated unexpectedly: {detail}")]
    WorkerPanicked { worker: &'static str, detail: String },
}

impl ScannerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScannerError::InvalidPattern { .. } | ScannerError::InvalidDuration { .. } => {
                ErrorKind::Configuration
            }
            ScannerError::CorruptWatchlist { .. } | ScannerError::CorruptTimeout { .. } => {
                ErrorKind::StoreCorruption
            }
            ScannerError::TailSpawn { .. }
            | ScannerError::TailExited { .. }
            | ScannerError::TailRead { .. } => ErrorKind::Subprocess,
            ScannerError::HookSpawn { .. } | ScannerError::HookFailed { .. } => ErrorKind::Hook,
            ScannerError::Io { .. }
            | ScannerError::SignalRegistration { .. }
            | ScannerError::WorkerPanicked { .. } => ErrorKind::Runtime,
        }
    }

    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScannerError::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScannerError>;

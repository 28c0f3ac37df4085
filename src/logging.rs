//! Log backend setup
//!
//! Code logs through the `log` facade. On macOS, without a log file, records
//! go to the Unified Logging System; otherwise a `tracing-subscriber` fmt
//! subscriber writes them to stderr or the configured file. `RUST_LOG`
//! overrides the configured level on that path.

use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::filter::LevelFilter as TracingLevel;
use tracing_subscriber::EnvFilter;

pub fn init(level: LevelFilter, file: Option<&Path>) -> Result<()> {
    #[cfg(target_os = "macos")]
    if file.is_none() {
        let logger = oslog::OsLogger::new(crate::constants::APP_SUBSYSTEM).level_filter(level);
        log::set_boxed_logger(Box::new(logger))
            .map_err(|e| anyhow!("Failed to set logger: {}", e))?;
        log::set_max_level(level);
        return Ok(());
    }

    let filter = EnvFilter::builder()
        .with_default_directive(tracing_level(level).into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    }
    .map_err(|e| anyhow!("Failed to set logger: {}", e))
}

fn tracing_level(level: LevelFilter) -> TracingLevel {
    match level {
        LevelFilter::Off => TracingLevel::OFF,
        LevelFilter::Error => TracingLevel::ERROR,
        LevelFilter::Warn => TracingLevel::WARN,
        LevelFilter::Info => TracingLevel::INFO,
        LevelFilter::Debug => TracingLevel::DEBUG,
        LevelFilter::Trace => TracingLevel::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(tracing_level(LevelFilter::Info), TracingLevel::INFO);
        assert_eq!(tracing_level(LevelFilter::Debug), TracingLevel::DEBUG);
        assert_eq!(tracing_level(LevelFilter::Off), TracingLevel::OFF);
    }
}

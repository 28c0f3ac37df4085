//! CLI argument parsing
//!
//! Handles the command-line interface using clap:
//! - Config file selection
//! - Per-setting overrides of the config file
//! - Verbosity and log destination
//! - Check mode

use crate::config::Configuration;
use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;

/// Parsed command-line options; unset values leave the config untouched
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub verbose: bool,
    pub check: bool,
    pub log_file: Option<PathBuf>,
    pub monitored_file: Option<PathBuf>,
    pub address_file: Option<PathBuf>,
    pub timeout_dir: Option<PathBuf>,
    pub patterns: Vec<String>,
    pub timeout_seconds: Option<u64>,
    pub interval_seconds: Option<u64>,
}

const ABOUT: &str = "IP log scan daemon";

const LONG_ABOUT: &str = "\
Scan a log file for regex patterns containing IP addresses.

For each line appended to the monitored file, every pattern is applied.
When a pattern matches, its first capture group is the address:
  write the expiration (now + timeout) into TIMEOUT_DIR/ADDRESS
  append ADDRESS to the address file if not already present

Every interval, expired records are removed from the timeout directory
and from the address file.

Use case: maintain the address table file for a pf rule.";

pub fn build_command() -> Command {
    Command::new("iplsd")
        .version(env!("IPLSD_VERSION"))
        .long_version(concat!(env!("IPLSD_VERSION"), " (", env!("GIT_HASH"), ")"))
        .about(ABOUT)
        .long_about(LONG_ABOUT)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Config file (default: /etc/iplsd/config.toml, then ~/.iplsd.toml)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Validate configuration and stores, print the effective settings, and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .short('l')
                .long("log-file")
                .value_name("PATH")
                .help("Write log output to this file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("monitored-file")
                .short('m')
                .long("monitored-file")
                .value_name("PATH")
                .help("Log file to monitor")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("address-file")
                .short('w')
                .long("address-file")
                .value_name("PATH")
                .help("Address table file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("timeout-dir")
                .short('d')
                .long("timeout-dir")
                .value_name("PATH")
                .help("Address timeout record directory")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("regex")
                .short('r')
                .long("regex")
                .value_name("PATTERN")
                .help("Match pattern, capture group 1 is the address (repeatable; replaces configured patterns)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("timeout-seconds")
                .long("timeout-seconds")
                .value_name("SECONDS")
                .help("Address presence timeout")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("interval-seconds")
                .long("interval-seconds")
                .value_name("SECONDS")
                .help("Timeout check interval")
                .value_parser(value_parser!(u64)),
        )
}

/// Parse the process arguments
pub fn parse_args() -> Result<CliOptions> {
    Ok(options_from(&build_command().get_matches()))
}

/// Parse an explicit argument list; the first item is the program name
pub fn parse_args_from<I, T>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().try_get_matches_from(args)?;
    Ok(options_from(&matches))
}

fn options_from(matches: &ArgMatches) -> CliOptions {
    CliOptions {
        config_path: matches.get_one::<PathBuf>("config").cloned(),
        verbose: matches.get_flag("verbose"),
        check: matches.get_flag("check"),
        log_file: matches.get_one::<PathBuf>("log-file").cloned(),
        monitored_file: matches.get_one::<PathBuf>("monitored-file").cloned(),
        address_file: matches.get_one::<PathBuf>("address-file").cloned(),
        timeout_dir: matches.get_one::<PathBuf>("timeout-dir").cloned(),
        patterns: matches
            .get_many::<String>("regex")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        timeout_seconds: matches.get_one::<u64>("timeout-seconds").copied(),
        interval_seconds: matches.get_one::<u64>("interval-seconds").copied(),
    }
}

impl CliOptions {
    /// Overlay command-line values onto a loaded configuration
    pub fn apply(&self, config: &mut Configuration) {
        if let Some(path) = &self.log_file {
            config.logging.file = Some(path.clone());
        }
        if let Some(path) = &self.monitored_file {
            config.scanner.monitored_file = path.clone();
        }
        if let Some(path) = &self.address_file {
            config.scanner.address_file = path.clone();
        }
        if let Some(path) = &self.timeout_dir {
            config.scanner.timeout_dir = path.clone();
        }
        if !self.patterns.is_empty() {
            config.scanner.patterns = self.patterns.clone();
        }
        if let Some(seconds) = self.timeout_seconds {
            config.scanner.timeout_seconds = seconds;
        }
        if let Some(seconds) = self.interval_seconds {
            config.scanner.interval_seconds = seconds;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        build_command().debug_assert();
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let options = parse_args_from([
            "iplsd",
            "-m",
            "/var/log/authlog",
            "-r",
            "from (\\S+)",
            "-r",
            "to (\\S+)",
            "--timeout-seconds",
            "30",
            "-v",
        ])
        .unwrap();
        assert!(options.verbose);
        assert_eq!(options.patterns.len(), 2);

        let mut config = Configuration::default();
        options.apply(&mut config);
        assert_eq!(config.scanner.monitored_file, PathBuf::from("/var/log/authlog"));
        assert_eq!(config.scanner.patterns, vec!["from (\\S+)", "to (\\S+)"]);
        assert_eq!(config.scanner.timeout_seconds, 30);
        // untouched values keep their defaults
        assert_eq!(config.scanner.interval_seconds, 600);
        assert_eq!(config.logging.level, "debug");
        config.validate().unwrap();
    }

    #[test]
    fn test_no_arguments_change_nothing() {
        let options = parse_args_from(["iplsd"]).unwrap();
        let mut config = Configuration::default();
        options.apply(&mut config);
        assert_eq!(config.scanner.patterns, Configuration::default().scanner.patterns);
        assert!(config.logging.file.is_none());
        assert!(!options.check);
    }

    #[test]
    fn test_non_numeric_seconds_rejected() {
        assert!(parse_args_from(["iplsd", "--interval-seconds", "ten"]).is_err());
    }
}

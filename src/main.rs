#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use iplsd::cli;
use iplsd::config::Configuration;
use iplsd::scanner::Scanner;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    let options = cli::parse_args()?;

    let config_path = options
        .config_path
        .clone()
        .or_else(Configuration::default_config_path);
    let mut config = match &config_path {
        Some(path) => Configuration::load_from_file(path)?,
        None => Configuration::default(),
    };
    options.apply(&mut config);
    config.validate()?;

    iplsd::logging::init(config.log_level()?, config.logging.file.as_deref())?;
    match &config_path {
        Some(path) => info!("Using config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let scanner =
        Scanner::new(config.scanner_settings()).context("Failed to initialize scanner")?;

    if options.check {
        println!("{}", serde_json::to_string_pretty(scanner.settings())?);
        return Ok(());
    }

    scanner.run().await.context("Scanner failed")?;
    info!("iplsd exiting");
    Ok(())
}

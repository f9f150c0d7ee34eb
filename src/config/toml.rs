//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{convert_report_format, parse_time};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    config.target_dir = cli.target.clone();

    if let Some(ref address) = cli.address {
        config.address = address.clone();
    }
    if let Some(num) = cli.num {
        config.schedule.num_files = num;
    }

    if let Some(ref jitter) = cli.jitter_max {
        config.session.jitter_max_ms = parse_time(jitter)
            .context("Invalid --jitter-max")?
            .as_millis() as u64;
    }
    if let Some(ref timeout) = cli.create_timeout {
        config.detection.create_timeout_ms = parse_time(timeout)
            .context("Invalid --create-timeout")?
            .as_millis() as u64;
    }
    if let Some(ref timeout) = cli.delete_timeout {
        config.detection.delete_timeout_ms = parse_time(timeout)
            .context("Invalid --delete-timeout")?
            .as_millis() as u64;
    }

    if let Some(format) = cli.format {
        config.output.format = convert_report_format(format);
    }
    if cli.include_deletes {
        config.output.include_deletes = true;
    }

    Ok(config)
}

/// Build the run configuration from CLI arguments and an optional file
///
/// Resolves the target directory to an absolute path and validates the result.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let base = match cli.config {
        Some(ref path) => parse_toml_file(path)?,
        None => Config::default(),
    };

    let mut config = merge_cli_with_config(cli, base)?;

    config.target_dir = fs::canonicalize(&config.target_dir)
        .with_context(|| format!("Invalid target directory: {}", config.target_dir.display()))?;
    if !config.target_dir.is_dir() {
        anyhow::bail!("Target is not a directory: {}", config.target_dir.display());
    }

    validator::validate_config(&config)
        .context("Configuration validation failed")?;

    Ok(config)
}

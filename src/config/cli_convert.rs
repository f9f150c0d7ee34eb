//! CLI to Config conversion utilities

use crate::config::cli;
use crate::config::OutputFormat;
use anyhow::{Context, Result};
use std::time::Duration;

/// Parse a time string (e.g., "500ms", "61s", "2m", "250us") to a duration
///
/// A bare number is taken as milliseconds.
pub fn parse_time(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num_str, unit_us) = if s.ends_with("us") {
        (s.trim_end_matches("us"), 1u64)
    } else if s.ends_with("ms") {
        (s.trim_end_matches("ms"), 1_000)
    } else if s.ends_with("min") || s.ends_with('m') {
        (s.trim_end_matches("min").trim_end_matches('m'), 60_000_000)
    } else if s.ends_with("sec") || s.ends_with('s') {
        (s.trim_end_matches("sec").trim_end_matches('s'), 1_000_000)
    } else {
        (s.as_str(), 1_000)
    };

    let num: u64 = num_str.trim().parse()
        .with_context(|| format!("Invalid time format: {}", s))?;

    let micros = num.checked_mul(unit_us)
        .with_context(|| format!("Time value out of range: {}", s))?;

    Ok(Duration::from_micros(micros))
}

/// Convert CLI ReportFormat to config OutputFormat
pub fn convert_report_format(cli_format: cli::ReportFormat) -> OutputFormat {
    match cli_format {
        cli::ReportFormat::Csv => OutputFormat::Csv,
        cli::ReportFormat::Json => OutputFormat::Json,
    }
}

/// Address the driver binds to
///
/// `:5666` becomes `0.0.0.0:5666`.
pub fn listen_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    }
}

/// Address the observer dials
///
/// `:5666` becomes `127.0.0.1:5666`.
pub fn dial_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("127.0.0.1{}", address)
    } else {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_units() {
        assert_eq!(parse_time("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_time("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_time("61s").unwrap(), Duration::from_secs(61));
        assert_eq!(parse_time("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_time("2min").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_time_bare_is_millis() {
        assert_eq!(parse_time("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_time("200").unwrap(), Duration::from_millis(200));
    }

    #[test]
    fn test_parse_time_invalid() {
        assert!(parse_time("fast").is_err());
        assert!(parse_time("-5s").is_err());
    }

    #[test]
    fn test_addresses() {
        assert_eq!(listen_address(":5666"), "0.0.0.0:5666");
        assert_eq!(dial_address(":5666"), "127.0.0.1:5666");
        assert_eq!(dial_address("10.0.1.10:5666"), "10.0.1.10:5666");
        assert_eq!(listen_address("10.0.1.10:5666"), "10.0.1.10:5666");
    }
}

//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::distribution::SizeTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory files are created in (driver) and polled (observer)
    #[serde(default)]
    pub target_dir: PathBuf,
    /// `host:port`; a bare `:port` means all interfaces / localhost
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_dir: PathBuf::new(),
            address: default_address(),
            schedule: ScheduleConfig::default(),
            detection: DetectionConfig::default(),
            session: SessionConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

fn default_address() -> String {
    ":5666".to_string()
}

/// Which files each driver session creates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Requested number of files per session (truncated per bucket)
    #[serde(default = "default_num_files")]
    pub num_files: usize,
    /// Size buckets and their weights
    #[serde(default)]
    pub sizes: SizeTable,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            num_files: default_num_files(),
            sizes: SizeTable::default(),
        }
    }
}

fn default_num_files() -> usize {
    100
}

/// Observer polling parameters
///
/// Each file event gets its own fresh timeout window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_timeout_ms")]
    pub create_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub delete_timeout_ms: u64,
    #[serde(default = "default_create_poll_us")]
    pub create_poll_interval_us: u64,
    #[serde(default = "default_delete_poll_us")]
    pub delete_poll_interval_us: u64,
    /// Latencies below minus this many milliseconds are reported as clock skew
    #[serde(default = "default_skew_warning_ms")]
    pub skew_warning_ms: u64,
}

impl DetectionConfig {
    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_millis(self.delete_timeout_ms)
    }

    pub fn create_poll_interval(&self) -> Duration {
        Duration::from_micros(self.create_poll_interval_us)
    }

    pub fn delete_poll_interval(&self) -> Duration {
        Duration::from_micros(self.delete_poll_interval_us)
    }

    pub fn skew_warning(&self) -> Duration {
        Duration::from_millis(self.skew_warning_ms)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            create_timeout_ms: default_timeout_ms(),
            delete_timeout_ms: default_timeout_ms(),
            create_poll_interval_us: default_create_poll_us(),
            delete_poll_interval_us: default_delete_poll_us(),
            skew_warning_ms: default_skew_warning_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    61_000
}

fn default_create_poll_us() -> u64 {
    1_000
}

fn default_delete_poll_us() -> u64 {
    2_000
}

fn default_skew_warning_ms() -> u64 {
    1_000
}

/// Driver session pacing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound (exclusive) of the random sleep after each acknowledged event
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
}

impl SessionConfig {
    pub fn jitter_max(&self) -> Duration {
        Duration::from_millis(self.jitter_max_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jitter_max_ms: default_jitter_max_ms(),
        }
    }
}

fn default_jitter_max_ms() -> u64 {
    500
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Observer report settings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Append a row for deletion latency
    #[serde(default)]
    pub include_deletes: bool,
}

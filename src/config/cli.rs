//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Csv,
    Json,
}

/// syncprobe - filesystem propagation latency probe
///
/// Run one instance with --server next to a writable directory (the driver)
/// and another against the same directory as seen from a second host (the
/// observer). The observer prints a latency report when the driver is done.
#[derive(Parser, Debug)]
#[command(name = "syncprobe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Run as the driver (creates and deletes files); default is observer
    #[arg(long)]
    pub server: bool,

    /// Address to listen on (driver) or connect to (observer), e.g. 192.168.0.1:5666
    #[arg(long, env = "SYNCPROBE_ADDRESS")]
    pub address: Option<String>,

    /// Number of files each driver session creates and deletes
    #[arg(short = 'n', long)]
    pub num: Option<usize>,

    /// Target directory (must exist)
    #[arg(value_name = "DIR")]
    pub target: PathBuf,

    /// TOML configuration file; command-line flags take precedence
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum random pause between file events (e.g., 500ms, 0)
    #[arg(long)]
    pub jitter_max: Option<String>,

    /// How long the observer waits for a file to appear (e.g., 61s, 5s)
    #[arg(long)]
    pub create_timeout: Option<String>,

    /// How long the observer waits for a file to disappear (e.g., 61s, 5s)
    #[arg(long)]
    pub delete_timeout: Option<String>,

    /// Report format (observer only)
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Add a row for deletion latency to the report (observer only)
    #[arg(long)]
    pub include_deletes: bool,

    /// Enable per-event debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

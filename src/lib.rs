//! syncprobe - filesystem propagation latency probe
//!
//! Measures how long a shared filesystem (NFS, object-store mounts, ...)
//! takes to make a file's creation or deletion visible on another host.
//!
//! # Architecture
//!
//! - **Driver**: creates and deletes files of weighted random sizes and
//!   announces each operation over TCP
//! - **Observer**: polls its view of the directory until each announced
//!   operation is visible and records the delay
//! - **Statistics**: mean, min, max, standard deviation and percentiles,
//!   overall and per file size

pub mod config;
pub mod distributed;
pub mod distribution;
pub mod error;
pub mod output;
pub mod stats;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use distributed::{Driver, Observer, ObserverReport};
pub use error::{ConfigError, ObserveError, StatsError};

/// Result type used throughout syncprobe
pub type Result<T> = anyhow::Result<T>;

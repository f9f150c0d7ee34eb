//! Error types for syncprobe
//!
//! Orchestration code uses `anyhow` (see [`crate::Result`]). The types here
//! cover the places where a caller has to tell failures apart:
//! - Observer session failures (timeout vs. listing vs. transport)
//! - Statistics over an empty sample set
//! - Invalid configuration values

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why an observer session stopped before the driver sent `Done`
#[derive(Error, Debug)]
pub enum ObserveError {
    /// A file event arrived before the session's clock handshake
    #[error("received {kind} for '{name}' before ClockSync; clock offset is unknown")]
    MissingClockSync { kind: &'static str, name: String },

    /// The file never reached the expected state within the detection window
    #[error("{kind} of '{name}' not visible after {timeout:?}")]
    Timeout {
        kind: &'static str,
        name: String,
        timeout: Duration,
    },

    /// The target directory could not be listed mid-poll
    #[error("failed to list {}: {source}", dir.display())]
    Listing {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encode/decode failure or the connection closed early
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl ObserveError {
    /// True if this error came from a detection window running out
    pub fn is_timeout(&self) -> bool {
        matches!(self, ObserveError::Timeout { .. })
    }
}

/// Statistics precondition violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatsError {
    #[error("cannot compute statistics over an empty sample set")]
    Empty,
}

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("size table is empty")]
    EmptySizeTable,

    #[error("size bucket {bytes} has weight {weight}, expected a value in [0, 1]")]
    WeightOutOfRange { bytes: u64, weight: f64 },

    #[error("size table weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },

    #[error("size bucket byte size must be greater than 0")]
    ZeroByteSize,

    #[error("{field} must be greater than 0")]
    ZeroDuration { field: &'static str },

    #[error("jitter_max_ms is {value}ms, maximum is {max}ms")]
    JitterTooLarge { value: u64, max: u64 },
}

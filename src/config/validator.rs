//! Configuration validation

use super::*;
use crate::error::ConfigError;

/// Tolerance for the size table's weight sum
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Longest allowed jitter sleep
const MAX_JITTER_MS: u64 = 60_000;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_size_table(&config.schedule.sizes)?;
    validate_detection(&config.detection)?;
    validate_session(&config.session)?;
    Ok(())
}

/// Validate the size table: non-empty, positive sizes, weights summing to 1
pub fn validate_size_table(table: &SizeTable) -> Result<(), ConfigError> {
    if table.is_empty() {
        return Err(ConfigError::EmptySizeTable);
    }

    for entry in table.entries() {
        if entry.bytes == 0 {
            return Err(ConfigError::ZeroByteSize);
        }
        if !(0.0..=1.0).contains(&entry.weight) {
            return Err(ConfigError::WeightOutOfRange {
                bytes: entry.bytes,
                weight: entry.weight,
            });
        }
    }

    let sum: f64 = table.entries().iter().map(|e| e.weight).sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
        return Err(ConfigError::WeightSum { sum });
    }

    Ok(())
}

/// Validate observer polling parameters
pub fn validate_detection(detection: &DetectionConfig) -> Result<(), ConfigError> {
    let fields = [
        ("create_timeout_ms", detection.create_timeout_ms),
        ("delete_timeout_ms", detection.delete_timeout_ms),
        ("create_poll_interval_us", detection.create_poll_interval_us),
        ("delete_poll_interval_us", detection.delete_poll_interval_us),
    ];
    for (field, value) in fields {
        if value == 0 {
            return Err(ConfigError::ZeroDuration { field });
        }
    }
    Ok(())
}

/// Validate driver pacing
pub fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.jitter_max_ms > MAX_JITTER_MS {
        return Err(ConfigError::JitterTooLarge {
            value: session.jitter_max_ms,
            max: MAX_JITTER_MS,
        });
    }
    Ok(())
}

//! Latency statistics
//!
//! The observer produces one [`LatencyRecord`] per file event. This module
//! turns a list of records into descriptive [`Statistics`]:
//!
//! - **count / mean / min / max** over the elapsed values
//! - **Population standard deviation** (divides by `count`, not `count - 1`)
//! - **Nearest-rank percentiles**: index `floor(p * count / 100)`, clamped to
//!   the last element, no interpolation
//!
//! Statistics are always computed from scratch over the full record list.
//!
//! # Example
//!
//! ```
//! use chrono::TimeDelta;
//! use syncprobe::stats::{LatencyRecord, Statistics};
//!
//! let records: Vec<LatencyRecord> = [10, 20, 30]
//!     .iter()
//!     .map(|ms| LatencyRecord::detected(TimeDelta::milliseconds(*ms), 128_000))
//!     .collect();
//!
//! let stats = Statistics::compute(&records).unwrap();
//! assert_eq!(stats.mean, TimeDelta::milliseconds(20));
//! assert_eq!(stats.p50, TimeDelta::milliseconds(20));
//! ```

pub mod aggregator;

pub use aggregator::{GroupKey, StatsAggregator, StatsReport};

use crate::error::StatsError;
use crate::util::time::delta_nanos;
use chrono::TimeDelta;

/// One resolved (or abandoned) file event as seen by the observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyRecord {
    /// Observer-local time from the translated event timestamp to detection
    ///
    /// Signed: clock jitter can make a fast event appear to finish before it
    /// was sent. Never clamped.
    pub elapsed: TimeDelta,

    /// Size of the file when it was found (0 for deletions)
    pub byte_size: u64,

    /// The detection window ran out before the file reached its expected state
    pub timed_out: bool,
}

impl LatencyRecord {
    pub fn detected(elapsed: TimeDelta, byte_size: u64) -> Self {
        Self { elapsed, byte_size, timed_out: false }
    }

    pub fn timed_out(elapsed: TimeDelta, byte_size: u64) -> Self {
        Self { elapsed, byte_size, timed_out: true }
    }
}

/// Descriptive statistics over a set of latencies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub count: usize,
    pub mean: TimeDelta,
    pub min: TimeDelta,
    pub max: TimeDelta,
    /// Population standard deviation in nanoseconds
    pub std_dev_ns: f64,
    pub p50: TimeDelta,
    pub p95: TimeDelta,
    pub p99: TimeDelta,
}

impl Statistics {
    /// Compute statistics over every record given
    ///
    /// Callers decide whether timed-out records belong in the set.
    pub fn compute(records: &[LatencyRecord]) -> Result<Self, StatsError> {
        if records.is_empty() {
            return Err(StatsError::Empty);
        }

        let mut sorted: Vec<i64> = records.iter().map(|r| delta_nanos(r.elapsed)).collect();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: i128 = sorted.iter().map(|v| *v as i128).sum();
        let mean_ns = sum / count as i128;

        let exact_mean = sum as f64 / count as f64;
        let sqr_sum: f64 = sorted
            .iter()
            .map(|v| {
                let diff = *v as f64 - exact_mean;
                diff * diff
            })
            .sum();
        let std_dev_ns = (sqr_sum / count as f64).sqrt();

        Ok(Self {
            count,
            mean: TimeDelta::nanoseconds(mean_ns as i64),
            min: TimeDelta::nanoseconds(sorted[0]),
            max: TimeDelta::nanoseconds(sorted[count - 1]),
            std_dev_ns,
            p50: TimeDelta::nanoseconds(percentile(&sorted, 50)),
            p95: TimeDelta::nanoseconds(percentile(&sorted, 95)),
            p99: TimeDelta::nanoseconds(percentile(&sorted, 99)),
        })
    }
}

/// Nearest-rank percentile over ascending, non-empty values
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn percentile(sorted: &[i64], percent: u32) -> i64 {
    let index = (percent as usize * sorted.len()) / 100;
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records_ms(values: &[i64]) -> Vec<LatencyRecord> {
        values
            .iter()
            .map(|ms| LatencyRecord::detected(TimeDelta::milliseconds(*ms), 128_000))
            .collect()
    }

    #[test]
    fn test_three_samples() {
        let stats = Statistics::compute(&records_ms(&[10, 20, 30])).unwrap();

        assert_eq!(stats.count, 3);
        assert_eq!(stats.mean, TimeDelta::milliseconds(20));
        assert_eq!(stats.min, TimeDelta::milliseconds(10));
        assert_eq!(stats.max, TimeDelta::milliseconds(30));
        assert_eq!(stats.p50, TimeDelta::milliseconds(20));
        // floor(95 * 3 / 100) = 2
        assert_eq!(stats.p95, TimeDelta::milliseconds(30));
        assert_eq!(stats.p99, TimeDelta::milliseconds(30));
    }

    #[test]
    fn test_population_std_dev() {
        let stats = Statistics::compute(&records_ms(&[10, 20, 30])).unwrap();
        // sqrt(((10^2) + 0 + (10^2)) / 3) ms
        let expected = (200.0f64 / 3.0).sqrt() * 1_000_000.0;
        assert!((stats.std_dev_ns - expected).abs() < 1.0);
    }

    #[test]
    fn test_std_dev_constant_samples() {
        let stats = Statistics::compute(&records_ms(&[5, 5, 5, 5])).unwrap();
        assert_eq!(stats.std_dev_ns, 0.0);
    }

    #[test]
    fn test_input_order_irrelevant() {
        let a = Statistics::compute(&records_ms(&[30, 10, 20])).unwrap();
        let b = Statistics::compute(&records_ms(&[10, 20, 30])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_is_error() {
        assert_eq!(Statistics::compute(&[]), Err(StatsError::Empty));
    }

    #[test]
    fn test_single_sample() {
        let stats = Statistics::compute(&records_ms(&[7])).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.min, stats.max);
        assert_eq!(stats.p99, TimeDelta::milliseconds(7));
        assert_eq!(stats.std_dev_ns, 0.0);
    }

    #[test]
    fn test_percentile_clamps_index() {
        let sorted: Vec<i64> = (1..=100).collect();
        assert_eq!(percentile(&sorted, 50), 51);
        assert_eq!(percentile(&sorted, 99), 100);
        assert_eq!(percentile(&sorted, 100), 100);
        assert_eq!(percentile(&[42], 99), 42);
    }

    #[test]
    fn test_p99_is_not_p98() {
        let sorted: Vec<i64> = (0..200).collect();
        assert_eq!(percentile(&sorted, 99), 198);
        assert_eq!(percentile(&sorted, 98), 196);
    }

    #[test]
    fn test_negative_latencies_kept() {
        let stats = Statistics::compute(&records_ms(&[-2, 4])).unwrap();
        assert_eq!(stats.min, TimeDelta::milliseconds(-2));
        assert_eq!(stats.mean, TimeDelta::milliseconds(1));
    }
}

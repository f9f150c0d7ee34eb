//! Wall-clock helpers
//!
//! Latencies in this tool are differences between two wall clocks (the
//! driver's and the observer's), so they are carried as signed
//! [`TimeDelta`] values rather than `std::time::Duration`.

use chrono::TimeDelta;
use std::time::Duration;

/// Signed nanoseconds in a delta, saturating at the i64 range
#[inline]
pub fn delta_nanos(delta: TimeDelta) -> i64 {
    delta.num_nanoseconds().unwrap_or(if delta < TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Convert a std duration into a delta, saturating on overflow
pub fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

/// Format a duration in human-readable form
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use syncprobe::util::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
/// assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50us");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(5)), "5.00s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    format_nanos(duration.as_nanos() as f64)
}

/// Format a signed delta, keeping the sign of negative latencies
///
/// ```
/// use chrono::TimeDelta;
/// use syncprobe::util::time::format_delta;
///
/// assert_eq!(format_delta(TimeDelta::milliseconds(20)), "20.00ms");
/// assert_eq!(format_delta(TimeDelta::microseconds(-1500)), "-1.50ms");
/// ```
pub fn format_delta(delta: TimeDelta) -> String {
    format_nanos(delta_nanos(delta) as f64)
}

/// Format a nanosecond quantity (possibly fractional or negative)
pub fn format_nanos(nanos: f64) -> String {
    let sign = if nanos < 0.0 { "-" } else { "" };
    let abs = nanos.abs();

    if abs < 1_000.0 {
        format!("{}{:.0}ns", sign, abs)
    } else if abs < 1_000_000.0 {
        format!("{}{:.2}us", sign, abs / 1_000.0)
    } else if abs < 1_000_000_000.0 {
        format!("{}{:.2}ms", sign, abs / 1_000_000.0)
    } else {
        format!("{}{:.2}s", sign, abs / 1_000_000_000.0)
    }
}

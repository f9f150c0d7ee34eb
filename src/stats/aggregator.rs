//! Grouped statistics
//!
//! Produces one [`Statistics`] row for the whole record set ("overall") and
//! one per distinct file size, optionally followed by a row for deletions.
//! Timed-out records are left out unless the aggregator is told otherwise.

use super::{LatencyRecord, Statistics};
use crate::error::StatsError;
use humansize::{format_size, DECIMAL};
use std::collections::BTreeMap;
use std::fmt;

/// Row label in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Overall,
    Bytes(u64),
    Deleted,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Overall => write!(f, "overall"),
            GroupKey::Bytes(bytes) => write!(f, "{}", format_size(*bytes, DECIMAL)),
            GroupKey::Deleted => write!(f, "deleted"),
        }
    }
}

/// Aggregated statistics for one observer session
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub overall: Statistics,
    /// Keyed by file size in bytes, ascending
    pub per_size: BTreeMap<u64, Statistics>,
    pub deleted: Option<Statistics>,
}

impl StatsReport {
    /// Rows in report order: overall, sizes ascending, then deletions
    pub fn rows(&self) -> Vec<(GroupKey, &Statistics)> {
        let mut rows = Vec::with_capacity(self.per_size.len() + 2);
        rows.push((GroupKey::Overall, &self.overall));
        for (bytes, stats) in &self.per_size {
            rows.push((GroupKey::Bytes(*bytes), stats));
        }
        if let Some(ref deleted) = self.deleted {
            rows.push((GroupKey::Deleted, deleted));
        }
        rows
    }
}

/// Builds [`StatsReport`]s from observer records
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsAggregator {
    include_timed_out: bool,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count timed-out records as samples (their elapsed value is the timeout)
    pub fn include_timed_out(mut self, include: bool) -> Self {
        self.include_timed_out = include;
        self
    }

    fn select(&self, records: &[LatencyRecord]) -> Vec<LatencyRecord> {
        records
            .iter()
            .filter(|r| self.include_timed_out || !r.timed_out)
            .copied()
            .collect()
    }

    /// Overall and per-size statistics over creation records
    pub fn aggregate(&self, created: &[LatencyRecord]) -> Result<StatsReport, StatsError> {
        let selected = self.select(created);
        let overall = Statistics::compute(&selected)?;

        let mut grouped: BTreeMap<u64, Vec<LatencyRecord>> = BTreeMap::new();
        for record in &selected {
            grouped.entry(record.byte_size).or_default().push(*record);
        }

        let mut per_size = BTreeMap::new();
        for (bytes, records) in grouped {
            per_size.insert(bytes, Statistics::compute(&records)?);
        }

        Ok(StatsReport {
            overall,
            per_size,
            deleted: None,
        })
    }

    /// Like [`aggregate`](Self::aggregate), plus a deletion row when any
    /// deletion records survive filtering
    pub fn aggregate_with_deletions(
        &self,
        created: &[LatencyRecord],
        deleted: &[LatencyRecord],
    ) -> Result<StatsReport, StatsError> {
        let mut report = self.aggregate(created)?;
        let selected = self.select(deleted);
        if !selected.is_empty() {
            report.deleted = Some(Statistics::compute(&selected)?);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn rec(ms: i64, size: u64) -> LatencyRecord {
        LatencyRecord::detected(TimeDelta::milliseconds(ms), size)
    }

    #[test]
    fn test_groups_by_size() {
        let records = vec![
            rec(10, 128_000),
            rec(40, 512_000),
            rec(20, 128_000),
            rec(30, 128_000),
        ];
        let report = StatsAggregator::new().aggregate(&records).unwrap();

        assert_eq!(report.overall.count, 4);
        assert_eq!(report.per_size.len(), 2);
        assert_eq!(report.per_size[&128_000].count, 3);
        assert_eq!(report.per_size[&128_000].mean, TimeDelta::milliseconds(20));
        assert_eq!(report.per_size[&512_000].max, TimeDelta::milliseconds(40));
        assert!(report.deleted.is_none());
    }

    #[test]
    fn test_timed_out_excluded_by_default() {
        let records = vec![
            rec(10, 128_000),
            LatencyRecord::timed_out(TimeDelta::seconds(61), 128_000),
        ];
        let report = StatsAggregator::new().aggregate(&records).unwrap();
        assert_eq!(report.overall.count, 1);

        let report = StatsAggregator::new()
            .include_timed_out(true)
            .aggregate(&records)
            .unwrap();
        assert_eq!(report.overall.count, 2);
        assert_eq!(report.overall.max, TimeDelta::seconds(61));
    }

    #[test]
    fn test_empty_is_error() {
        assert_eq!(StatsAggregator::new().aggregate(&[]), Err(StatsError::Empty));

        let only_timeouts = vec![LatencyRecord::timed_out(TimeDelta::seconds(61), 1)];
        assert_eq!(
            StatsAggregator::new().aggregate(&only_timeouts),
            Err(StatsError::Empty)
        );
    }

    #[test]
    fn test_rows_order_and_labels() {
        let created = vec![rec(5, 2_000_000), rec(6, 128_000)];
        let deleted = vec![rec(3, 0)];
        let report = StatsAggregator::new()
            .aggregate_with_deletions(&created, &deleted)
            .unwrap();

        let labels: Vec<String> = report.rows().iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(labels, vec!["overall", "128 kB", "2 MB", "deleted"]);
    }

    #[test]
    fn test_no_deleted_row_without_deletions() {
        let report = StatsAggregator::new()
            .aggregate_with_deletions(&[rec(1, 128_000)], &[])
            .unwrap();
        assert!(report.deleted.is_none());
        assert_eq!(report.rows().len(), 2);
    }
}

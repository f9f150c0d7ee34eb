//! CSV report
//!
//! Header row followed by `overall`, one row per file size (ascending) and,
//! if present, a `deleted` row. Latencies use the short human form
//! (`1.50ms`); negative values keep their sign.

use crate::stats::{GroupKey, Statistics, StatsReport};
use crate::util::time::{format_delta, format_nanos};
use crate::Result;
use std::io::Write;

pub const CSV_HEADER: &str =
    "name,num,mean,min,max,stdDev,percentile_50,percentile_95,percentile_99";

/// Writes a [`StatsReport`] as CSV
pub struct CsvReportWriter<'a, W: Write> {
    out: &'a mut W,
}

impl<'a, W: Write> CsvReportWriter<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        Self { out }
    }

    pub fn write_report(&mut self, report: &StatsReport) -> Result<()> {
        writeln!(self.out, "{}", CSV_HEADER)?;
        for (key, stats) in report.rows() {
            self.write_row(key, stats)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn write_row(&mut self, key: GroupKey, stats: &Statistics) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{},{},{},{},{},{}",
            key,
            stats.count,
            format_delta(stats.mean),
            format_delta(stats.min),
            format_delta(stats.max),
            format_nanos(stats.std_dev_ns),
            format_delta(stats.p50),
            format_delta(stats.p95),
            format_delta(stats.p99),
        )?;
        Ok(())
    }
}

//! Report writers
//!
//! The observer prints its report to stdout, either as CSV (one row per
//! group) or as a single JSON document.

pub mod csv;
pub mod json;

use crate::config::OutputFormat;
use crate::stats::StatsReport;
use crate::Result;
use std::io::Write;

pub use csv::CsvReportWriter;
pub use json::JsonReport;

/// Session facts printed alongside the statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    pub timeouts: usize,
    pub skewed: usize,
    pub completed: bool,
}

/// Write `report` to `out` in the requested format
pub fn write_report<W: Write>(
    out: &mut W,
    format: OutputFormat,
    report: &StatsReport,
    session: &SessionInfo,
) -> Result<()> {
    match format {
        OutputFormat::Csv => CsvReportWriter::new(out).write_report(report),
        OutputFormat::Json => JsonReport::new(report, session).write_to(out),
    }
}

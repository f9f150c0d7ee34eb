//! JSON report
//!
//! Same groups as the CSV report, with each latency carried both as signed
//! nanoseconds and in human-readable form.

use super::SessionInfo;
use crate::stats::{Statistics, StatsReport};
use crate::util::time::{delta_nanos, format_delta, format_nanos};
use crate::Result;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Latency with signed nanoseconds and a human-readable form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonLatency {
    pub nanos: i64,
    pub human: String,
}

impl JsonLatency {
    pub fn from_delta(delta: TimeDelta) -> Self {
        Self {
            nanos: delta_nanos(delta),
            human: format_delta(delta),
        }
    }
}

/// One report row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonGroup {
    pub name: String,
    pub num: usize,
    pub mean: JsonLatency,
    pub min: JsonLatency,
    pub max: JsonLatency,
    pub std_dev_nanos: f64,
    pub std_dev: String,
    pub percentile_50: JsonLatency,
    pub percentile_95: JsonLatency,
    pub percentile_99: JsonLatency,
}

impl JsonGroup {
    fn new(name: String, stats: &Statistics) -> Self {
        Self {
            name,
            num: stats.count,
            mean: JsonLatency::from_delta(stats.mean),
            min: JsonLatency::from_delta(stats.min),
            max: JsonLatency::from_delta(stats.max),
            std_dev_nanos: stats.std_dev_ns,
            std_dev: format_nanos(stats.std_dev_ns),
            percentile_50: JsonLatency::from_delta(stats.p50),
            percentile_95: JsonLatency::from_delta(stats.p95),
            percentile_99: JsonLatency::from_delta(stats.p99),
        }
    }
}

/// Complete JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub completed: bool,
    pub timeouts: usize,
    pub skewed: usize,
    pub groups: Vec<JsonGroup>,
}

impl JsonReport {
    pub fn new(report: &StatsReport, session: &SessionInfo) -> Self {
        let groups = report
            .rows()
            .into_iter()
            .map(|(key, stats)| JsonGroup::new(key.to_string(), stats))
            .collect();

        Self {
            completed: session.completed,
            timeouts: session.timeouts,
            skewed: session.skewed,
            groups,
        }
    }

    /// Pretty-print to `out`, followed by a newline
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

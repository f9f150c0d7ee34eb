//! Observer role
//!
//! The observer connects to a driver and reacts to its events:
//! - `ClockSync` fixes the session clock offset (`local now - driver timestamp`)
//! - `FileCreated` polls the target directory until the file shows up with
//!   its final size, records the latency, then acknowledges
//! - `FileDeleted` polls until the name is gone from a fresh listing, records
//!   the latency, then acknowledges
//! - `Done` ends the session
//!
//! Every poll re-lists the directory. Caching the listing, or switching to
//! change notifications, would measure the local cache instead of the
//! propagation delay this tool exists to measure.
//!
//! A timeout, a listing error, or any transport error ends the session. The
//! records gathered up to that point stay in the caller's [`ObserverReport`].

use crate::config::DetectionConfig;
use crate::distributed::protocol::{read_event, write_event, Event, EventKind};
use crate::error::ObserveError;
use crate::stats::LatencyRecord;
use crate::util::time::{format_delta, to_delta};
use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// How long the observer waits for the TCP connection to the driver
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Everything an observer session measured
#[derive(Debug, Clone, Default)]
pub struct ObserverReport {
    /// `observer now - driver timestamp` at ClockSync
    pub clock_offset: Option<TimeDelta>,
    /// Creation latencies, in event order
    pub created: Vec<LatencyRecord>,
    /// Deletion latencies, in event order
    pub deleted: Vec<LatencyRecord>,
    /// Detection windows that ran out
    pub timeouts: usize,
    /// Latencies more negative than the skew threshold
    pub skewed: usize,
    /// The driver sent `Done`
    pub completed: bool,
}

/// Which state a file event waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Name present with exactly this many bytes
    Present { size: u64 },
    /// Name absent
    Absent,
}

impl Expectation {
    fn kind(&self) -> &'static str {
        match self {
            Expectation::Present { .. } => "create",
            Expectation::Absent => "delete",
        }
    }
}

/// Observer for one target directory
#[derive(Debug, Clone)]
pub struct Observer {
    dir: PathBuf,
    detection: DetectionConfig,
}

impl Observer {
    pub fn new(dir: impl Into<PathBuf>, detection: DetectionConfig) -> Self {
        Self {
            dir: dir.into(),
            detection,
        }
    }

    /// Run one session over `stream` until `Done` or the first failure
    ///
    /// Records are appended to `report` as they are measured, so a failed
    /// session still leaves its partial results behind.
    pub async fn run_session<S>(
        &self,
        mut stream: S,
        report: &mut ObserverReport,
    ) -> Result<(), ObserveError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let event = read_event(&mut stream).await
                .context("Connection to driver lost before Done")?;

            match event.kind {
                EventKind::ClockSync => {
                    let offset = Utc::now() - event.timestamp;
                    if let Some(previous) = report.clock_offset {
                        warn!(
                            "second ClockSync, offset changes from {} to {}",
                            format_delta(previous),
                            format_delta(offset)
                        );
                    }
                    report.clock_offset = Some(offset);
                    info!("clocks synchronised, offset {}", format_delta(offset));
                }

                EventKind::FileCreated => {
                    let size = event.size.with_context(|| {
                        format!("FileCreated for '{}' carries no size", event.name)
                    })?;
                    let record = self
                        .observe(&event, Expectation::Present { size }, report)
                        .await?;
                    report.created.push(record);
                    write_event(&mut stream, &Event::ack()).await?;
                }

                EventKind::FileDeleted => {
                    let record = self.observe(&event, Expectation::Absent, report).await?;
                    report.deleted.push(record);
                    write_event(&mut stream, &Event::ack()).await?;
                }

                EventKind::Done => {
                    if report.clock_offset.is_none() {
                        return Err(ObserveError::MissingClockSync {
                            kind: event.kind.as_str(),
                            name: event.name,
                        });
                    }
                    info!(
                        "driver is done: {} created, {} deleted",
                        report.created.len(),
                        report.deleted.len()
                    );
                    report.completed = true;
                    return Ok(());
                }

                EventKind::Ack => {
                    warn!("unexpected Ack from driver, ignoring");
                }
            }
        }
    }

    /// Translate the event time and wait for the expected state
    ///
    /// On timeout a timed-out record is pushed to the report before the error
    /// is returned.
    async fn observe(
        &self,
        event: &Event,
        expect: Expectation,
        report: &mut ObserverReport,
    ) -> Result<LatencyRecord, ObserveError> {
        let offset = report.clock_offset.ok_or_else(|| ObserveError::MissingClockSync {
            kind: event.kind.as_str(),
            name: event.name.clone(),
        })?;
        let sent_at = event.timestamp + offset;

        let (poll, timeout) = match expect {
            Expectation::Present { .. } => {
                (self.detection.create_poll_interval(), self.detection.create_timeout())
            }
            Expectation::Absent => {
                (self.detection.delete_poll_interval(), self.detection.delete_timeout())
            }
        };

        match detect(&self.dir, &event.name, expect, sent_at, poll, timeout).await {
            Ok(record) => {
                if record.elapsed < -to_delta(self.detection.skew_warning()) {
                    report.skewed += 1;
                    warn!(
                        "{} of '{}' measured {}, clocks are skewed",
                        expect.kind(),
                        event.name,
                        format_delta(record.elapsed)
                    );
                }
                Ok(record)
            }
            Err(err) => {
                if err.is_timeout() {
                    report.timeouts += 1;
                    let size = match expect {
                        Expectation::Present { size } => size,
                        Expectation::Absent => 0,
                    };
                    let record = LatencyRecord::timed_out(Utc::now() - sent_at, size);
                    match expect {
                        Expectation::Present { .. } => report.created.push(record),
                        Expectation::Absent => report.deleted.push(record),
                    }
                }
                Err(err)
            }
        }
    }
}

/// Connect to a driver
pub async fn connect(address: &str) -> anyhow::Result<TcpStream> {
    let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(address))
        .await
        .with_context(|| format!("Timed out connecting to {}", address))?
        .with_context(|| format!("Failed to connect to {}", address))?;
    stream.set_nodelay(true).context("Failed to set TCP_NODELAY")?;
    Ok(stream)
}

/// Poll `dir` until `name` reaches the expected state or `timeout` elapses
///
/// `sent_at` is the event time already translated to the local clock; the
/// returned latency is `now - sent_at` at the moment of detection. The ticker
/// lives inside the timed future, so it stops with it.
pub async fn detect(
    dir: &Path,
    name: &str,
    expect: Expectation,
    sent_at: DateTime<Utc>,
    poll: Duration,
    timeout: Duration,
) -> Result<LatencyRecord, ObserveError> {
    let polling = poll_until(dir, name, expect, sent_at, poll);

    match tokio::time::timeout(timeout, polling).await {
        Ok(result) => result,
        Err(_) => Err(ObserveError::Timeout {
            kind: expect.kind(),
            name: name.to_string(),
            timeout,
        }),
    }
}

async fn poll_until(
    dir: &Path,
    name: &str,
    expect: Expectation,
    sent_at: DateTime<Utc>,
    poll: Duration,
) -> Result<LatencyRecord, ObserveError> {
    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let found = probe(dir, name).await?;
        match (expect, found) {
            (Expectation::Present { size }, Some(actual)) if actual == size => {
                let elapsed = Utc::now() - sent_at;
                debug!("created '{}' ({} bytes) after {}", name, actual, format_delta(elapsed));
                return Ok(LatencyRecord::detected(elapsed, actual));
            }
            (Expectation::Present { size }, Some(actual)) => {
                trace!("'{}' visible with {} of {} bytes", name, actual, size);
            }
            (Expectation::Absent, None) => {
                let elapsed = Utc::now() - sent_at;
                debug!("deleted '{}' after {}", name, format_delta(elapsed));
                return Ok(LatencyRecord::detected(elapsed, 0));
            }
            _ => {}
        }
    }
}

/// One fresh directory listing, on the blocking pool
async fn probe(dir: &Path, name: &str) -> Result<Option<u64>, ObserveError> {
    let owned_dir = dir.to_path_buf();
    let owned_name = name.to_string();

    let listed = tokio::task::spawn_blocking(move || scan_dir(&owned_dir, &owned_name))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        .and_then(|result| result);

    listed.map_err(|source| ObserveError::Listing {
        dir: dir.to_path_buf(),
        source,
    })
}

/// Size of `name` in a full listing of `dir`, or `None` if it is not listed
///
/// An entry that vanishes between listing and stat counts as absent.
pub fn scan_dir(dir: &Path, name: &str) -> io::Result<Option<u64>> {
    let wanted = OsStr::new(name);
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() != wanted {
            continue;
        }
        return match entry.metadata() {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        };
    }
    Ok(None)
}

//! Driver role
//!
//! The driver listens for observers and runs one session per connection:
//!
//! 1. Send `ClockSync`
//! 2. Draw a shuffled schedule of file sizes
//! 3. For each sample: create and close the file, send `FileCreated`, wait
//!    for the Ack, pause, delete the file, send `FileDeleted`, wait for the
//!    Ack, pause
//! 4. Send `Done` and close the connection
//!
//! The driver never issues the next filesystem operation before the observer
//! acknowledged the previous one, so at most one probe file per session
//! exists at any time. A session that fails part way still tries to send
//! `Done`, and the file it was holding is removed.

use crate::config::cli_convert::listen_address;
use crate::config::Config;
use crate::distributed::protocol::{read_event, write_event, Event, EventKind};
use crate::distribution::{SampleScheduler, SizeTable};
use crate::util::time::format_duration;
use crate::util::ContentGenerator;
use crate::Result;
use anyhow::{anyhow, bail, Context};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Name prefix of every probe file
pub const FILE_PREFIX: &str = "testfile_";

/// What a driver session needs from the run configuration
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub target_dir: PathBuf,
    pub num_files: usize,
    pub sizes: SizeTable,
    pub jitter_max: Duration,
}

impl DriverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_dir: config.target_dir.clone(),
            num_files: config.schedule.num_files,
            sizes: config.schedule.sizes.clone(),
            jitter_max: config.session.jitter_max(),
        }
    }
}

/// Outcome of a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Files created, acknowledged, deleted and acknowledged
    pub files: usize,
}

/// Accepts observer connections and drives a session on each
pub struct Driver {
    settings: Arc<DriverSettings>,
}

impl Driver {
    pub fn new(settings: DriverSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    /// Bind the configured address and serve until the task is cancelled
    pub async fn run(self, address: &str) -> Result<()> {
        let addr = listen_address(address);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("driver listening on {}", addr);
        info!("creating files in {}", self.settings.target_dir.display());

        self.serve(listener).await
    }

    /// Serve observers on an already bound listener
    ///
    /// Every connection gets its own task and its own session state.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, peer) = listener
                .accept()
                .await
                .context("Failed to accept connection")?;

            info!("observer connected from {}", peer);
            if let Err(e) = stream.set_nodelay(true) {
                warn!("failed to set TCP_NODELAY for {}: {}", peer, e);
            }

            let session = DriverSession::new(Arc::clone(&self.settings));
            tokio::spawn(async move {
                match session.run(stream).await {
                    Ok(summary) => info!("session with {} complete: {} files", peer, summary.files),
                    Err(e) => error!("session with {} failed: {:#}", peer, e),
                }
            });
        }
    }
}

/// Per-connection state
///
/// Each session owns its scheduler and random sources; nothing is shared
/// between concurrent sessions except the read-only settings.
pub struct DriverSession {
    settings: Arc<DriverSettings>,
    scheduler: SampleScheduler,
    content: Arc<Mutex<ContentGenerator>>,
    jitter_rng: Xoshiro256PlusPlus,
}

impl DriverSession {
    pub fn new(settings: Arc<DriverSettings>) -> Self {
        let scheduler = SampleScheduler::new(settings.sizes.clone());
        Self {
            settings,
            scheduler,
            content: Arc::new(Mutex::new(ContentGenerator::new())),
            jitter_rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Drive one session, then always send `Done` and close the stream
    pub async fn run<S>(mut self, mut stream: S) -> Result<SessionSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.drive(&mut stream).await;

        if let Err(e) = write_event(&mut stream, &Event::done()).await {
            warn!("failed to send Done: {:#}", e);
        }
        if let Err(e) = stream.shutdown().await {
            debug!("failed to shut down connection: {}", e);
        }

        result
    }

    async fn drive<S>(&mut self, stream: &mut S) -> Result<SessionSummary>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        write_event(stream, &Event::clock_sync())
            .await
            .context("Failed to send ClockSync")?;

        let samples = self.scheduler.schedule(self.settings.num_files);
        info!(
            "will create and delete {} files (requested {})",
            samples.len(),
            self.settings.num_files
        );

        let mut summary = SessionSummary { files: 0 };
        for sample in samples {
            let pending = self.create_file(sample.byte_size).await?;
            let name = pending.name();
            debug!("created {} ({} bytes)", name, sample.byte_size);

            write_event(stream, &Event::file_created(name.clone(), sample.byte_size)).await?;
            expect_ack(stream, &name).await?;
            self.jitter().await;

            pending.remove().await?;
            debug!("deleted {}", name);

            write_event(stream, &Event::file_deleted(name.clone())).await?;
            expect_ack(stream, &name).await?;
            self.jitter().await;

            summary.files += 1;
        }

        Ok(summary)
    }

    /// Write a new uniquely named file of `size` random bytes and close it
    async fn create_file(&self, size: u64) -> Result<PendingFile> {
        let dir = self.settings.target_dir.clone();
        let content = Arc::clone(&self.content);

        let path = tokio::task::spawn_blocking(move || {
            let mut content = content
                .lock()
                .map_err(|_| anyhow!("Content generator lock poisoned"))?;
            write_probe_file(&dir, &mut content, size)
        })
        .await
        .context("File creation task panicked")??;

        Ok(PendingFile::new(path))
    }

    /// Sleep a uniform random time in `[0, jitter_max)`
    async fn jitter(&mut self) {
        let max_ms = self.settings.jitter_max.as_millis() as u64;
        if max_ms == 0 {
            return;
        }
        let pause = Duration::from_millis(self.jitter_rng.gen_range(0..max_ms));
        debug!("pausing {}", format_duration(pause));
        tokio::time::sleep(pause).await;
    }
}

/// Create `testfile_XXXXXX` in `dir`, fill it and close it
///
/// The file is closed before this returns so its size is final by the time
/// the observer is told about it.
pub fn write_probe_file(dir: &Path, content: &mut ContentGenerator, size: u64) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix(FILE_PREFIX)
        .tempfile_in(dir)
        .with_context(|| format!("Failed to create file in {}", dir.display()))?;

    let written = content
        .write_to(&mut file, size)
        .with_context(|| format!("Failed to write {}", file.path().display()))?;
    if written != size {
        bail!("Short write to {}: {} of {} bytes", file.path().display(), written, size);
    }

    let (_file, path) = file
        .keep()
        .context("Failed to persist probe file")?;
    Ok(path)
}

/// Wait for the observer's Ack of the last event
async fn expect_ack<S>(stream: &mut S, name: &str) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    let event = read_event(stream)
        .await
        .with_context(|| format!("Failed waiting for Ack of {}", name))?;
    if event.kind != EventKind::Ack {
        bail!("Expected Ack for {}, got {}", name, event.kind.as_str());
    }
    Ok(())
}

/// A probe file that still exists on disk
///
/// Dropping it without [`PendingFile::remove`] deletes the file, so an
/// aborted session leaves nothing behind.
struct PendingFile {
    path: PathBuf,
    armed: bool,
}

impl PendingFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    async fn remove(mut self) -> Result<()> {
        tokio::fs::remove_file(&self.path)
            .await
            .with_context(|| format!("Failed to delete {}", self.path.display()))?;
        self.armed = false;
        Ok(())
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("failed to clean up {}: {}", self.path.display(), e);
                }
            }
        }
    }
}

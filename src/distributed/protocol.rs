//! Driver/observer protocol
//!
//! This module defines the single message type exchanged between the driver
//! (which creates and deletes files) and the observer (which waits for those
//! changes to become visible). Messages are MessagePack (rmp-serde) encoded
//! and length-prefixed so either side can find message boundaries on a raw
//! byte stream.
//!
//! # Schema
//!
//! Schema version 1. There is no negotiation; both sides must run the same
//! build.
//!
//! # Message Flow
//!
//! ```text
//! Driver                            Observer
//!   |                                  |
//!   |-------- CLOCK_SYNC(t0) --------->|   offset = now - t0
//!   |                                  |
//!   |---- FILE_CREATED(name,size) ---->|   poll until name has size
//!   |<------------ ACK ----------------|
//!   |---- FILE_DELETED(name) --------->|   poll until name is gone
//!   |<------------ ACK ----------------|
//!   |              ...                 |
//!   |------------ DONE --------------->|
//! ```
//!
//! # Message Framing
//!
//! ```text
//! [4 bytes: message length (little-endian u32)][N bytes: MessagePack event]
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame either side accepts
///
/// Events are a few dozen bytes; anything bigger is a corrupt stream.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Opens a session (Driver → Observer)
    ClockSync,
    /// A file was fully written (Driver → Observer)
    FileCreated,
    /// A file was removed (Driver → Observer)
    FileDeleted,
    /// The last file event is visible (Observer → Driver)
    Ack,
    /// Closes a session (Driver → Observer)
    Done,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ClockSync => "ClockSync",
            EventKind::FileCreated => "FileCreated",
            EventKind::FileDeleted => "FileDeleted",
            EventKind::Ack => "Ack",
            EventKind::Done => "Done",
        }
    }
}

/// Protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,

    /// Sender's wall clock at send time
    #[serde(with = "chrono::serde::ts_nanoseconds")]
    pub timestamp: DateTime<Utc>,

    /// Base name of the file inside the target directory (empty when unused)
    pub name: String,

    /// Expected size in bytes (FileCreated only)
    pub size: Option<u64>,
}

impl Event {
    fn stamped(kind: EventKind, name: String, size: Option<u64>) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            name,
            size,
        }
    }

    pub fn clock_sync() -> Self {
        Self::stamped(EventKind::ClockSync, String::new(), None)
    }

    pub fn file_created(name: impl Into<String>, size: u64) -> Self {
        Self::stamped(EventKind::FileCreated, name.into(), Some(size))
    }

    pub fn file_deleted(name: impl Into<String>) -> Self {
        Self::stamped(EventKind::FileDeleted, name.into(), None)
    }

    pub fn ack() -> Self {
        Self::stamped(EventKind::Ack, String::new(), None)
    }

    pub fn done() -> Self {
        Self::stamped(EventKind::Done, String::new(), None)
    }
}

/// Serialize an event with its length prefix
pub fn serialize_event(event: &Event) -> Result<Vec<u8>> {
    let body = rmp_serde::to_vec(event)
        .context("Failed to serialize event")?;

    let mut framed = Vec::with_capacity(4 + body.len());
    framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
    framed.extend_from_slice(&body);

    Ok(framed)
}

/// Deserialize one framed event from the front of `buf`
///
/// Returns (event, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn deserialize_event(buf: &[u8]) -> Result<(Event, usize)> {
    if buf.len() < 4 {
        anyhow::bail!("Buffer too small for event length (need 4 bytes, got {})", buf.len());
    }

    let len = frame_len([buf[0], buf[1], buf[2], buf[3]])?;
    if buf.len() < 4 + len {
        anyhow::bail!("Incomplete event (need {} bytes, got {})", 4 + len, buf.len());
    }

    let event = decode_body(&buf[4..4 + len])?;
    Ok((event, 4 + len))
}

/// Read one event from a stream
///
/// A clean close before the length prefix is still an error: sessions
/// only end with `Done`.
pub async fn read_event<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Event> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await
        .context("Failed to read event length")?;

    let len = frame_len(len_buf)?;
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await
        .context("Failed to read event body")?;

    decode_body(&body)
}

/// Body length from a frame prefix, rejecting oversized frames
fn frame_len(prefix: [u8; 4]) -> Result<usize> {
    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        anyhow::bail!("Event too large: {} bytes (max {})", len, MAX_FRAME_LEN);
    }
    Ok(len)
}

fn decode_body(body: &[u8]) -> Result<Event> {
    rmp_serde::from_slice(body).context("Failed to deserialize event")
}

/// Write one event to a stream and flush it
pub async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &Event) -> Result<()> {
    let framed = serialize_event(event)?;

    writer.write_all(&framed).await
        .context("Failed to write event")?;
    writer.flush().await
        .context("Failed to flush stream")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap()
    }

    fn assert_roundtrip(event: Event) {
        let bytes = serialize_event(&event).unwrap();
        let (decoded, consumed) = deserialize_event(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_roundtrip_each_kind() {
        for kind in [
            EventKind::ClockSync,
            EventKind::FileCreated,
            EventKind::FileDeleted,
            EventKind::Ack,
            EventKind::Done,
        ] {
            assert_roundtrip(Event {
                kind,
                timestamp: fixed_time(),
                name: "testfile_0a1b2c".to_string(),
                size: Some(2_000_000),
            });
            assert_roundtrip(Event {
                kind,
                timestamp: fixed_time(),
                name: String::new(),
                size: None,
            });
        }
    }

    #[test]
    fn test_constructors_stamp_time() {
        let before = Utc::now();
        let event = Event::file_created("testfile_x", 128_000);
        let after = Utc::now();

        assert_eq!(event.kind, EventKind::FileCreated);
        assert_eq!(event.size, Some(128_000));
        assert!(event.timestamp >= before && event.timestamp <= after);
    }

    #[test]
    fn test_event_framing() {
        let bytes = serialize_event(&Event::done()).unwrap();
        assert!(bytes.len() >= 4);
        let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(bytes.len(), 4 + len);
    }

    #[test]
    fn test_truncated_event_is_error() {
        let bytes = serialize_event(&Event::file_deleted("testfile_y")).unwrap();
        assert!(deserialize_event(&bytes[..2]).is_err());
        assert!(deserialize_event(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_garbage_body_is_error() {
        let mut bytes = vec![3, 0, 0, 0];
        bytes.extend_from_slice(&[0xc1, 0xc1, 0xc1]);
        assert!(deserialize_event(&bytes).is_err());
    }

    #[tokio::test]
    async fn test_stream_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let sent = vec![Event::clock_sync(), Event::file_created("f", 42), Event::done()];

        for event in &sent {
            write_event(&mut a, event).await.unwrap();
        }
        for event in &sent {
            assert_eq!(&read_event(&mut b).await.unwrap(), event);
        }
    }

    #[tokio::test]
    async fn test_read_after_close_is_error() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);
        assert!(read_event(&mut b).await.is_err());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&(u32::MAX).to_le_bytes()).await.unwrap();
        let err = read_event(&mut b).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_stream_and_buffer_decoding_agree() {
        let mut garbage = vec![3, 0, 0, 0];
        garbage.extend_from_slice(&[0xc1, 0xc1, 0xc1]);
        let oversized = (MAX_FRAME_LEN as u32 + 1).to_le_bytes().to_vec();

        for frame in [garbage, oversized] {
            assert!(deserialize_event(&frame).is_err());
            let mut reader = frame.as_slice();
            assert!(read_event(&mut reader).await.is_err());
        }

        let good = serialize_event(&Event::file_created("testfile_z", 7)).unwrap();
        let (from_buf, _) = deserialize_event(&good).unwrap();
        let mut reader = good.as_slice();
        assert_eq!(read_event(&mut reader).await.unwrap(), from_buf);
    }
}

//! Viewer transport: instruction delivery and processing-lag tracking.
//!
//! The render loop and the replay builder never touch sockets directly; they
//! write through the [`InstructionSink`] trait.  The production
//! implementation ([`tcp::StreamSink`]) encodes instructions onto the
//! viewer's TCP stream; tests use [`mock::RecordingSink`] or the generated
//! `MockInstructionSink`.
//!
//! # Processing lag
//!
//! Every emitted `sync` carries a timestamp; a healthy viewer echoes each
//! one back after applying the batch it terminates.  The [`SyncTracker`]
//! keeps the last timestamp sent and the last one acknowledged; their
//! difference estimates how far behind the viewer is running.  The render
//! loop stretches its frame duration to that estimate so emission never
//! outpaces the viewer, but lag is never used for correctness decisions.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use easel_core::{Instruction, ProtocolError, Timestamp};
use thiserror::Error;

pub mod mock;
pub mod tcp;

pub use tcp::{watch_viewer, FrameReader, StreamSink, ViewerExit};

/// Errors that can occur while talking to the viewer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// An I/O error on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The viewer sent bytes that do not frame correctly.
    #[error("protocol violation from viewer: {0}")]
    Protocol(#[from] ProtocolError),

    /// The viewer connection is gone.
    #[error("viewer connection closed")]
    Closed,
}

/// Write side of a viewer connection.
///
/// `send` enqueues one instruction; delivery is only forced by `flush`, which
/// may block on backpressure.  Implementations serialize concurrent writers
/// internally, so the render loop and a join replay can share one sink
/// without interleaving bytes mid-frame.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstructionSink: Send {
    /// Encodes and enqueues one instruction.
    async fn send(&mut self, instruction: &Instruction) -> Result<(), TransportError>;

    /// Forces queued instructions out to the viewer.
    async fn flush(&mut self) -> Result<(), TransportError>;

    /// Estimate of how far behind the viewer's acknowledgements are.
    fn processing_lag(&self) -> Duration;
}

/// Tracks sent and acknowledged `sync` timestamps for one connection.
#[derive(Debug)]
pub struct SyncTracker {
    last_sent: AtomicI64,
    last_acked: AtomicI64,
}

impl SyncTracker {
    /// Creates a tracker with both timestamps at `now`, so a viewer that has
    /// simply not acknowledged anything yet starts from zero lag instead of
    /// an epoch-sized one.
    pub fn new(now: Timestamp) -> Self {
        Self {
            last_sent: AtomicI64::new(now),
            last_acked: AtomicI64::new(now),
        }
    }

    /// Records the timestamp of an emitted `sync`.
    pub fn record_sent(&self, timestamp: Timestamp) {
        self.last_sent.store(timestamp, Ordering::Relaxed);
    }

    /// Records a `sync` acknowledgement received from the viewer.
    pub fn record_ack(&self, timestamp: Timestamp) {
        self.last_acked.store(timestamp, Ordering::Relaxed);
    }

    /// Current lag estimate; zero when the viewer is keeping up.
    pub fn processing_lag(&self) -> Duration {
        let sent = self.last_sent.load(Ordering::Relaxed);
        let acked = self.last_acked.load(Ordering::Relaxed);
        Duration::from_millis(sent.saturating_sub(acked).max(0) as u64)
    }
}

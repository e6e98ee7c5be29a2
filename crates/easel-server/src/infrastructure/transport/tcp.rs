//! TCP-backed transport: the outbound instruction sink, the inbound frame
//! reader, and the viewer lifetime watch.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use easel_core::{encode_instruction, Decoder, Frame, Instruction};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{InstructionSink, SyncTracker, TransportError};

/// [`InstructionSink`] writing encoded frames to an async byte stream.
///
/// Clones share the same underlying stream and lag tracker; a mutex around
/// the write half keeps concurrently written frames whole.  In production
/// the stream is the write half of the viewer's `TcpStream`; tests drive it
/// with an in-memory duplex pipe.
pub struct StreamSink<W> {
    writer: Arc<Mutex<W>>,
    tracker: Arc<SyncTracker>,
}

impl<W> StreamSink<W> {
    pub fn new(writer: W, tracker: Arc<SyncTracker>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            tracker,
        }
    }

    /// The shared lag tracker for this connection.
    pub fn tracker(&self) -> Arc<SyncTracker> {
        Arc::clone(&self.tracker)
    }
}

impl<W> Clone for StreamSink<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

#[async_trait]
impl<W> InstructionSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, instruction: &Instruction) -> Result<(), TransportError> {
        let encoded = encode_instruction(instruction);
        if let Instruction::Sync { timestamp } = instruction {
            self.tracker.record_sent(*timestamp);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(encoded.as_bytes()).await?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.flush().await?;
        Ok(())
    }

    fn processing_lag(&self) -> Duration {
        self.tracker.processing_lag()
    }
}

/// Buffered frame reader over an async byte stream.
pub struct FrameReader<R> {
    reader: R,
    decoder: Decoder,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: Decoder::new(),
        }
    }

    /// Reads until one complete frame is available.  `Ok(None)` means the
    /// stream ended cleanly between frames.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        loop {
            if let Some(frame) = self.decoder.next_frame()? {
                return Ok(Some(frame));
            }
            let mut chunk = [0u8; 4096];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.decoder.feed(&chunk[..n]);
        }
    }
}

/// How the viewer-watch loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerExit {
    /// The viewer sent an explicit `disconnect`.
    Disconnected,
    /// The stream ended or became unreadable.
    ConnectionClosed,
    /// Nothing arrived within the allowed window; the viewer is presumed
    /// unresponsive.
    TimedOut,
}

impl fmt::Display for ViewerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerExit::Disconnected => write!(f, "viewer disconnected"),
            ViewerExit::ConnectionClosed => write!(f, "connection closed"),
            ViewerExit::TimedOut => write!(f, "viewer timed out"),
        }
    }
}

/// Consumes the viewer's inbound stream until it leaves.
///
/// `sync` acknowledgements feed the lag tracker; `disconnect` ends the watch;
/// anything else (input events, nops) is ignored at debug level, since this
/// server emits state but does not consume viewer input.  Each read is bounded
/// by `read_timeout`.
pub async fn watch_viewer<R>(
    reader: &mut FrameReader<R>,
    tracker: &SyncTracker,
    read_timeout: Duration,
) -> ViewerExit
where
    R: AsyncRead + Unpin,
{
    loop {
        match tokio::time::timeout(read_timeout, reader.next_frame()).await {
            Err(_) => return ViewerExit::TimedOut,
            Ok(Ok(None)) => return ViewerExit::ConnectionClosed,
            Ok(Err(e)) => {
                warn!("viewer stream error: {e}");
                return ViewerExit::ConnectionClosed;
            }
            Ok(Ok(Some(frame))) => match frame.opcode.as_str() {
                "sync" => match frame.args.first().and_then(|a| a.parse().ok()) {
                    Some(timestamp) => tracker.record_ack(timestamp),
                    None => debug!("ignoring malformed sync ack: {:?}", frame.args),
                },
                "disconnect" => return ViewerExit::Disconnected,
                "nop" => {}
                other => debug!("ignoring viewer instruction {other:?}"),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sink_pair(
        buffer: usize,
    ) -> (
        StreamSink<tokio::io::DuplexStream>,
        tokio::io::DuplexStream,
    ) {
        let (near, far) = tokio::io::duplex(buffer);
        let tracker = Arc::new(SyncTracker::new(0));
        (StreamSink::new(near, tracker), far)
    }

    #[tokio::test]
    async fn test_sink_writes_encoded_frames() {
        let (mut sink, mut far) = sink_pair(256);
        sink.send(&Instruction::Move {
            layer: 1,
            parent: 0,
            x: 6,
            y: 6,
            z: 0,
        })
        .await
        .unwrap();
        sink.flush().await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"4.move,1.1,1.0,1.6,1.6,1.0;");
    }

    #[tokio::test]
    async fn test_sink_records_sent_sync_timestamps() {
        let (mut sink, _far) = sink_pair(256);
        sink.send(&Instruction::Sync { timestamp: 90 }).await.unwrap();
        assert_eq!(sink.processing_lag(), Duration::from_millis(90));
    }

    #[tokio::test]
    async fn test_clones_share_one_stream() {
        let (sink, mut far) = sink_pair(256);
        let mut a = sink.clone();
        let mut b = sink;
        a.send(&Instruction::Close { layer: 1 }).await.unwrap();
        b.send(&Instruction::Close { layer: 2 }).await.unwrap();

        let mut buf = vec![0u8; 64];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"5.close,1.1;5.close,1.2;");
    }

    #[tokio::test]
    async fn test_frame_reader_reassembles_partial_writes() {
        let (mut near, far) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(far);

        near.write_all(b"4.sync,2.").await.unwrap();
        near.write_all(b"42;").await.unwrap();

        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame, Frame::new("sync", vec!["42".to_string()]));
    }

    #[tokio::test]
    async fn test_frame_reader_reports_clean_eof_as_none() {
        let (near, far) = tokio::io::duplex(256);
        drop(near);
        let mut reader = FrameReader::new(far);
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watch_viewer_feeds_sync_acks_to_the_tracker() {
        let (mut near, far) = tokio::io::duplex(256);
        let tracker = SyncTracker::new(0);
        tracker.record_sent(150);

        near.write_all(b"4.sync,3.150;").await.unwrap();
        drop(near);

        let mut reader = FrameReader::new(far);
        let exit = watch_viewer(&mut reader, &tracker, Duration::from_secs(1)).await;
        assert_eq!(exit, ViewerExit::ConnectionClosed);
        assert_eq!(tracker.processing_lag(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_watch_viewer_returns_on_disconnect_frame() {
        let (mut near, far) = tokio::io::duplex(256);
        near.write_all(b"10.disconnect;").await.unwrap();

        let mut reader = FrameReader::new(far);
        let tracker = SyncTracker::new(0);
        let exit = watch_viewer(&mut reader, &tracker, Duration::from_secs(1)).await;
        assert_eq!(exit, ViewerExit::Disconnected);
    }

    #[tokio::test]
    async fn test_watch_viewer_times_out_on_silence() {
        let (_near, far) = tokio::io::duplex(256);
        let mut reader = FrameReader::new(far);
        let tracker = SyncTracker::new(0);
        let exit = watch_viewer(&mut reader, &tracker, Duration::from_millis(10)).await;
        assert_eq!(exit, ViewerExit::TimedOut);
    }

    #[tokio::test]
    async fn test_watch_viewer_ignores_input_instructions() {
        let (mut near, far) = tokio::io::duplex(256);
        near.write_all(b"5.mouse,3.100,3.200,1.1;10.disconnect;")
            .await
            .unwrap();

        let mut reader = FrameReader::new(far);
        let tracker = SyncTracker::new(0);
        let exit = watch_viewer(&mut reader, &tracker, Duration::from_secs(1)).await;
        assert_eq!(exit, ViewerExit::Disconnected);
    }
}

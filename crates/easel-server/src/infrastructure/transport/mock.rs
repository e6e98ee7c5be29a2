//! Recording sink for tests.
//!
//! Captures every instruction in encoded wire form so tests can assert on
//! the exact byte stream a viewer would receive.  Clones share the same
//! recording, which lets a test keep a handle while a session owns the sink.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use easel_core::{encode_instruction, Instruction};

use super::{InstructionSink, TransportError};

/// An [`InstructionSink`] that records instead of transmitting.
#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Arc<Mutex<Vec<String>>>,
    flushes: Arc<AtomicUsize>,
    lag: Duration,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recording sink reporting a fixed processing lag.
    pub fn with_lag(lag: Duration) -> Self {
        Self {
            lag,
            ..Self::default()
        }
    }

    /// Every recorded frame, in emission order, in encoded form.
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().expect("lock poisoned").clone()
    }

    /// The full recorded byte stream.
    pub fn byte_stream(&self) -> String {
        self.frames.lock().expect("lock poisoned").concat()
    }

    /// Number of instructions recorded so far.
    pub fn instruction_count(&self) -> usize {
        self.frames.lock().expect("lock poisoned").len()
    }

    /// Number of completed flushes.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl InstructionSink for RecordingSink {
    async fn send(&mut self, instruction: &Instruction) -> Result<(), TransportError> {
        self.frames
            .lock()
            .expect("lock poisoned")
            .push(encode_instruction(instruction));
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn processing_lag(&self) -> Duration {
        self.lag
    }
}

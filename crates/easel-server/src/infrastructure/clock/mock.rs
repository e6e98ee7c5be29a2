//! Mock clock for unit and integration testing.
//!
//! Time only moves when a sleep completes, and sleeps only complete when the
//! test releases a frame permit.  This lets tests park the render loop at a
//! precise point (mid-sleep), observe state, then let exactly one more frame
//! happen.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use easel_core::Timestamp;
use tokio::sync::Semaphore;

use super::Clock;

/// A [`Clock`] under test control.
///
/// Each call to [`Clock::sleep`] records the requested duration, then blocks
/// until a permit from [`release_frames`](MockClock::release_frames) is
/// available; on wake it advances the mock time by the requested duration.
pub struct MockClock {
    now_ms: AtomicI64,
    requested: Mutex<Vec<Duration>>,
    permits: Semaphore,
}

impl MockClock {
    /// Creates a clock frozen at `start_ms` with no frame permits.
    pub fn new(start_ms: Timestamp) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
            requested: Mutex::new(Vec::new()),
            permits: Semaphore::new(0),
        }
    }

    /// Allows `n` pending or future sleeps to complete.
    pub fn release_frames(&self, n: usize) {
        self.permits.add_permits(n);
    }

    /// Moves the clock forward without a sleep.
    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }

    /// Every sleep duration requested so far, in call order.
    pub fn requested_sleeps(&self) -> Vec<Duration> {
        self.requested.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Clock for MockClock {
    fn now(&self) -> Timestamp {
        self.now_ms.load(Ordering::Relaxed)
    }

    async fn sleep(&self, duration: Duration) {
        self.requested
            .lock()
            .expect("lock poisoned")
            .push(duration);
        self.permits
            .acquire()
            .await
            .expect("mock clock semaphore closed")
            .forget();
        self.now_ms
            .fetch_add(duration.as_millis() as i64, Ordering::Relaxed);
    }
}

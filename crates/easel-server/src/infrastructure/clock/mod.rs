//! Timing capability for the render loop.
//!
//! The pacing logic depends on two things only: reading the current time and
//! suspending for a duration.  Both sit behind the [`Clock`] trait so the
//! loop can be driven deterministically in tests, frame by frame, without
//! real-time waits.  Production uses [`SystemClock`] (wall-clock time plus
//! `tokio::time::sleep`); tests substitute [`mock::MockClock`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use easel_core::Timestamp;

pub mod mock;

/// Time source and sleep capability used by the render loop.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now(&self) -> Timestamp;

    /// Suspends the calling task for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock [`Clock`] backed by the Tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Timestamp)
            .unwrap_or(0)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_reports_a_current_timestamp() {
        let clock = SystemClock;
        let now = clock.now();
        // Any plausible wall-clock value is after 2020-01-01.
        assert!(now > 1_577_836_800_000, "timestamp {now} is in the past");
    }

    #[test]
    fn test_system_clock_is_monotonic_enough_for_deltas() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}

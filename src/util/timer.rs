//! Clearable one-shot timer.

use std::time::Duration;

use tokio::task::JoinHandle;

/// A callback armed to run once after a delay.
///
/// Clearing (or dropping) the timer before it fires guarantees the callback
/// never runs. Must be armed from within a Tokio runtime.
#[derive(Debug)]
pub struct Timer {
    delay: Duration,
    handle: JoinHandle<()>,
}

impl Timer {
    pub fn arm<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });
        Self { delay, handle }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel the pending callback. Idempotent.
    pub fn clear(&self) {
        self.handle.abort();
    }

    /// True once the callback has run or the timer was cleared.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

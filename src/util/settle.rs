//! Single-assignment settlement for racing completion sources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::oneshot;

/// One-shot settlement shared between competing triggers.
///
/// The first call to [`Settlement::settle`] (or [`Settlement::settle_with`])
/// wins and delivers its value to the paired receiver. Every later call is a
/// no-op and returns `false`.
///
/// # Example
/// ```
/// use apsflow::util::settle::Settlement;
///
/// # async fn example() {
/// let (settlement, outcome) = Settlement::new();
/// assert!(settlement.settle("first"));
/// assert!(!settlement.settle("second"));
/// assert_eq!(outcome.await.unwrap(), "first");
/// # }
/// ```
#[derive(Debug)]
pub struct Settlement<T> {
    settled: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Settlement<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let settlement = Self {
            settled: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
        };
        (settlement, rx)
    }

    /// Whether a value has already been claimed.
    pub fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    pub fn settle(&self, value: T) -> bool {
        self.settle_with(value, || {})
    }

    /// Settle with `value`, running `on_claim` exactly once before delivery.
    ///
    /// `on_claim` only runs for the winning caller, so it is the place to
    /// release resources tied to the pending operation.
    pub fn settle_with(&self, value: T, on_claim: impl FnOnce()) -> bool {
        if self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        on_claim();
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(sender) = sender {
            // The waiter may have gone away; the claim still stands.
            let _ = sender.send(value);
        }
        true
    }
}

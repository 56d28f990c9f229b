//! Shared timer, settlement and retry utilities.

pub mod retry;
pub mod settle;
pub mod timer;

pub use retry::{RetryPolicy, Retryable};
pub use settle::Settlement;
pub use timer::{duration_millis, Timer};

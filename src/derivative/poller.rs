//! Convergence poller: watch a remote job until it reaches a terminal state.
//!
//! The next fetch is scheduled only after the current one completes, so at
//! most one status request per watch is ever outstanding.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{JobState, JobStatus, PollError};
use crate::util::duration_millis;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

/// Progress notification for a job that is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent<'a> {
    pub job_id: &'a str,
    pub state: JobState,
    pub progress: Option<&'a str>,
    /// 1-based fetch count that produced this event.
    pub tick: u64,
}

type ProgressSink = Box<dyn FnMut(ProgressEvent<'_>) + Send>;

/// Cancels a watch from outside. Cloning shares the same watch.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    token: CancellationToken,
}

impl WatchHandle {
    /// Stop the watch. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Builder and driver for one convergence watch.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use apsflow::derivative::{JobStatus, Poller};
///
/// # async fn example() -> Result<(), apsflow::derivative::PollError> {
/// let status = Poller::new("job-1")
///     .with_interval(Duration::from_millis(10))
///     .on_progress(|event| println!("{}: {:?}", event.job_id, event.progress))
///     .watch(|_job_id| async { Ok(JobStatus::success(serde_json::json!({}))) })
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Poller {
    job_id: String,
    interval: Duration,
    on_progress: Option<ProgressSink>,
    cancel: CancellationToken,
}

impl Poller {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            interval: DEFAULT_INTERVAL,
            on_progress: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Delay between the end of one fetch and the start of the next.
    /// A zero interval keeps the default.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.interval = interval;
        }
        self
    }

    pub fn on_progress<F>(mut self, sink: F) -> Self
    where
        F: FnMut(ProgressEvent<'_>) + Send + 'static,
    {
        self.on_progress = Some(Box::new(sink));
        self
    }

    /// Tie this watch to an existing cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn handle(&self) -> WatchHandle {
        WatchHandle {
            token: self.cancel.clone(),
        }
    }

    /// Poll `fetch_status` until the job succeeds or fails.
    ///
    /// Resolves with the terminal `Success` status. A `Failed` status ends the
    /// watch with [`PollError::Failed`]; an error from `fetch_status` itself
    /// ends it unchanged. Cancelling through a [`WatchHandle`] discards any
    /// in-flight fetch and ends the watch with [`PollError::Cancelled`].
    pub async fn watch<F, Fut>(self, mut fetch_status: F) -> Result<JobStatus, PollError>
    where
        F: FnMut(&str) -> Fut,
        Fut: Future<Output = Result<JobStatus, PollError>>,
    {
        let Self {
            job_id,
            interval,
            mut on_progress,
            cancel,
        } = self;
        let mut session = PollSession::new(&job_id, interval);
        info!(job_id = %job_id, interval_ms = duration_millis(interval), "Watching job");

        loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(session.cancelled()),
                result = fetch_status(&job_id) => result,
            };
            if cancel.is_cancelled() {
                return Err(session.cancelled());
            }

            let status = fetched?;
            session.record(&status);

            match status.state {
                JobState::Success => {
                    info!(job_id = %job_id, ticks = session.ticks, "Job succeeded");
                    return Ok(status);
                }
                JobState::Failed => {
                    info!(job_id = %job_id, ticks = session.ticks, "Job failed");
                    return Err(PollError::Failed {
                        job_id,
                        status: Box::new(status),
                    });
                }
                JobState::Pending | JobState::InProgress => {
                    if let Some(sink) = on_progress.as_mut() {
                        sink(ProgressEvent {
                            job_id: &job_id,
                            state: status.state,
                            progress: status.progress.as_deref(),
                            tick: session.ticks,
                        });
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(session.cancelled()),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }
}

impl fmt::Debug for Poller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("job_id", &self.job_id)
            .field("interval", &self.interval)
            .field("on_progress", &self.on_progress.as_ref().map(|_| ".."))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Per-watch bookkeeping, owned by the running watch.
struct PollSession<'a> {
    job_id: &'a str,
    interval: Duration,
    status: Option<JobState>,
    last_progress: Option<String>,
    ticks: u64,
}

impl<'a> PollSession<'a> {
    fn new(job_id: &'a str, interval: Duration) -> Self {
        Self {
            job_id,
            interval,
            status: None,
            last_progress: None,
            ticks: 0,
        }
    }

    fn record(&mut self, status: &JobStatus) {
        self.ticks += 1;
        self.status = Some(status.state);
        if status.progress.is_some() {
            self.last_progress = status.progress.clone();
        }
        debug!(
            job_id = %self.job_id,
            tick = self.ticks,
            state = %status.state,
            progress = self.last_progress.as_deref().unwrap_or(""),
            next_in_ms = duration_millis(self.interval),
            "Job status fetched"
        );
    }

    fn cancelled(&self) -> PollError {
        info!(
            job_id = %self.job_id,
            ticks = self.ticks,
            last_state = ?self.status,
            "Watch cancelled"
        );
        PollError::Cancelled
    }
}

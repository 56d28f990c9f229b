//! Model translation jobs and the convergence poller that watches them.

pub mod client;
pub mod error;
pub mod job;
pub mod poller;

pub use client::{encode_urn, DerivativeClient, TranslationJob};
pub use error::PollError;
pub use job::{JobState, JobStatus};
pub use poller::{Poller, ProgressEvent, WatchHandle, DEFAULT_INTERVAL};

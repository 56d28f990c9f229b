use thiserror::Error;

use super::JobStatus;
use crate::util::Retryable;

/// Reasons a watch ends without a successful job.
#[derive(Debug, Clone, Error)]
pub enum PollError {
    /// The remote job reported failure; carries its diagnostics.
    #[error("Job {job_id} failed")]
    Failed {
        job_id: String,
        status: Box<JobStatus>,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Watch cancelled")]
    Cancelled,
}

impl PollError {
    /// Remote diagnostic payload for a failed job.
    pub fn diagnostics(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Failed { status, .. } => status.error.as_ref(),
            _ => None,
        }
    }
}

impl Retryable for PollError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for PollError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

impl From<serde_json::Error> for PollError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

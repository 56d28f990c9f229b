use thiserror::Error;

use crate::util::Retryable;

/// Outcomes of an authorization handshake other than a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Port {port} unavailable: {reason}")]
    PortUnavailable { port: u16, reason: String },
    #[error("Authorization cancelled by user")]
    Cancelled,
    #[error("Authorization timed out after {timeout_ms}ms")]
    TimedOut { timeout_ms: u64 },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// Whether this outcome came from the user rather than a failure.
    pub fn is_user_initiated(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl Retryable for AuthError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

impl From<url::ParseError> for AuthError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidResponse(format!("bad URL: {error}"))
    }
}

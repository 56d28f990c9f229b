//! Error types for apsflow.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::auth::AuthError;
use crate::derivative::PollError;
use crate::util::Retryable;

/// Crate-level error for operations that span subsystems.
#[derive(Error, Debug)]
pub enum ApsError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ApsError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth(error) => match error {
                AuthError::PortUnavailable { .. } => ErrorCategory::PortUnavailable,
                AuthError::Cancelled => ErrorCategory::Cancelled,
                AuthError::TimedOut { .. } => ErrorCategory::Timeout,
                AuthError::Transport(_) => ErrorCategory::Transport,
                AuthError::InvalidResponse(_) => ErrorCategory::Api,
            },
            Self::Poll(error) => match error {
                PollError::Failed { .. } => ErrorCategory::JobFailed,
                PollError::Transport(_) => ErrorCategory::Transport,
                PollError::InvalidResponse(_) => ErrorCategory::Api,
                PollError::Cancelled => ErrorCategory::Cancelled,
            },
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 | 500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Network(_) => ErrorCategory::Transport,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether the user backed out; not an error for logging purposes.
    pub fn is_cancellation(&self) -> bool {
        self.category() == ErrorCategory::Cancelled
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::PortUnavailable => RecoverySuggestion::ChooseDifferentPort,
            ErrorCategory::Cancelled => RecoverySuggestion::RetryLogin,
            ErrorCategory::Timeout => RecoverySuggestion::WaitLonger,
            ErrorCategory::Transport | ErrorCategory::Server => {
                RecoverySuggestion::RetryWithBackoff
            }
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::JobFailed => RecoverySuggestion::InspectJobDiagnostics,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

impl Retryable for ApsError {
    fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Transport | ErrorCategory::Server
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApsError>;

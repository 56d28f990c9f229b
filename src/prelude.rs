//! Convenience re-exports.

pub use crate::auth::{
    begin_handshake, AuthError, Handshake, HandshakeConfig, HttpTokenExchanger, TokenExchanger,
    TokenResult,
};
pub use crate::config::ApsConfig;
pub use crate::derivative::{
    encode_urn, DerivativeClient, JobState, JobStatus, PollError, Poller, ProgressEvent,
    WatchHandle,
};
pub use crate::error::{ApsError, ErrorCategory, RecoverySuggestion};
pub use crate::util::RetryPolicy;

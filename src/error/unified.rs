//! Error classification and recovery hints for UIs built on top.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    PortUnavailable,
    Cancelled,
    Timeout,
    Transport,
    Authentication,
    Server,
    JobFailed,
    Api,
    Configuration,
    Serialization,
    Unknown,
}

/// Suggested corrective action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Restart the login on another callback port.
    ChooseDifferentPort,
    /// The user backed out; offer to sign in again.
    RetryLogin,
    /// Nobody acted in time; allow a longer window.
    WaitLonger,
    RetryWithBackoff,
    CheckCredentials,
    InspectJobDiagnostics,
    CheckConfiguration,
    ContactSupport,
}

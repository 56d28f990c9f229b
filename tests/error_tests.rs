//! Tests for the error system.

use apsflow::auth::AuthError;
use apsflow::derivative::{JobStatus, PollError};
use apsflow::error::unified::*;
use apsflow::error::*;
use apsflow::util::Retryable;
use serde_json::json;

#[test]
fn error_api_creation() {
    let err = ApsError::api(404, "Not found");
    assert!(matches!(&err, ApsError::Api { status: 404, .. }));
    assert_eq!(err.to_string(), "API error (status 404): Not found");
}

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    struct Case {
        error: ApsError,
        expected_category: ErrorCategory,
        expected_retryable: bool,
        expected_recovery: RecoverySuggestion,
    }

    let network_error = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    let serde_error = serde_json::from_str::<serde_json::Value>("{not-json}").unwrap_err();

    let cases = vec![
        Case {
            error: AuthError::PortUnavailable {
                port: 8080,
                reason: "address in use".to_string(),
            }
            .into(),
            expected_category: ErrorCategory::PortUnavailable,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ChooseDifferentPort,
        },
        Case {
            error: AuthError::Cancelled.into(),
            expected_category: ErrorCategory::Cancelled,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::RetryLogin,
        },
        Case {
            error: AuthError::TimedOut { timeout_ms: 120_000 }.into(),
            expected_category: ErrorCategory::Timeout,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::WaitLonger,
        },
        Case {
            error: AuthError::Transport("reset".to_string()).into(),
            expected_category: ErrorCategory::Transport,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: PollError::Failed {
                job_id: "job".to_string(),
                status: Box::new(JobStatus::failed(json!({}))),
            }
            .into(),
            expected_category: ErrorCategory::JobFailed,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::InspectJobDiagnostics,
        },
        Case {
            error: PollError::Cancelled.into(),
            expected_category: ErrorCategory::Cancelled,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::RetryLogin,
        },
        Case {
            error: ApsError::api(403, "forbidden"),
            expected_category: ErrorCategory::Authentication,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckCredentials,
        },
        Case {
            error: ApsError::api(429, "slow down"),
            expected_category: ErrorCategory::Server,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: ApsError::api(400, "bad request"),
            expected_category: ErrorCategory::Api,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: ApsError::Configuration("bad-config".to_string()),
            expected_category: ErrorCategory::Configuration,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::CheckConfiguration,
        },
        Case {
            error: ApsError::Network(network_error),
            expected_category: ErrorCategory::Transport,
            expected_retryable: true,
            expected_recovery: RecoverySuggestion::RetryWithBackoff,
        },
        Case {
            error: ApsError::Serialization(serde_error),
            expected_category: ErrorCategory::Serialization,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
        Case {
            error: ApsError::InvalidArgument("empty".to_string()),
            expected_category: ErrorCategory::Unknown,
            expected_retryable: false,
            expected_recovery: RecoverySuggestion::ContactSupport,
        },
    ];

    for case in cases {
        assert_eq!(
            case.error.category(),
            case.expected_category,
            "category for {}",
            case.error
        );
        assert_eq!(
            case.error.is_retryable(),
            case.expected_retryable,
            "retryable for {}",
            case.error
        );
        assert_eq!(
            case.error.recovery_suggestion(),
            case.expected_recovery,
            "recovery for {}",
            case.error
        );
    }
}

#[test]
fn wrapped_errors_display_transparently() {
    let err: ApsError = AuthError::TimedOut { timeout_ms: 50 }.into();
    assert_eq!(err.to_string(), AuthError::TimedOut { timeout_ms: 50 }.to_string());
    assert!(!err.is_cancellation());

    let cancelled: ApsError = AuthError::Cancelled.into();
    assert!(cancelled.is_cancellation());
}

#[test]
fn only_transport_failures_are_retryable_at_the_source() {
    assert!(AuthError::Transport("x".to_string()).is_retryable());
    assert!(!AuthError::Cancelled.is_retryable());
    assert!(!AuthError::TimedOut { timeout_ms: 1 }.is_retryable());
    assert!(PollError::Transport("x".to_string()).is_retryable());
    assert!(!PollError::InvalidResponse("x".to_string()).is_retryable());
    assert!(!PollError::Cancelled.is_retryable());
}

#[test]
fn failed_job_exposes_remote_payload() {
    let payload = json!({ "status": "failed", "messages": [{ "code": "E1" }] });
    let err = PollError::Failed {
        job_id: "job".to_string(),
        status: Box::new(JobStatus::failed(payload.clone())),
    };
    assert_eq!(err.diagnostics(), Some(&payload));
    assert_eq!(PollError::Cancelled.diagnostics(), None);
}

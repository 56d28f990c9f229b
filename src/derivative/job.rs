//! Translation job status as seen by the poller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use super::PollError;

/// Remote job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum JobState {
    #[strum(serialize = "pending")]
    Pending,
    #[strum(serialize = "inprogress")]
    InProgress,
    #[strum(serialize = "success")]
    Success,
    /// A remote `timeout` is a failure of the job itself.
    #[strum(to_string = "failed", serialize = "timeout")]
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

/// One status observation of a remote job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    /// Human-readable progress marker, e.g. `"25% complete"`.
    pub progress: Option<String>,
    /// Full manifest, present once the job succeeded.
    pub manifest: Option<Value>,
    /// Remote diagnostics, present once the job failed.
    pub error: Option<Value>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self::with_state(JobState::Pending)
    }

    pub fn in_progress(progress: impl Into<String>) -> Self {
        Self {
            progress: Some(progress.into()),
            ..Self::with_state(JobState::InProgress)
        }
    }

    pub fn success(manifest: Value) -> Self {
        Self {
            progress: Some("complete".to_string()),
            manifest: Some(manifest),
            ..Self::with_state(JobState::Success)
        }
    }

    pub fn failed(error: Value) -> Self {
        Self {
            error: Some(error),
            ..Self::with_state(JobState::Failed)
        }
    }

    fn with_state(state: JobState) -> Self {
        Self {
            state,
            progress: None,
            manifest: None,
            error: None,
        }
    }

    /// Interpret a model-derivative manifest document.
    pub fn from_manifest(manifest: Value) -> Result<Self, PollError> {
        let raw_status = manifest
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| PollError::InvalidResponse("manifest has no status".to_string()))?;
        let state: JobState = raw_status.parse().map_err(|_| {
            PollError::InvalidResponse(format!("unknown manifest status: {raw_status}"))
        })?;
        let progress = manifest
            .get("progress")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(match state {
            JobState::Pending | JobState::InProgress => Self {
                progress,
                ..Self::with_state(state)
            },
            JobState::Success => Self {
                progress,
                manifest: Some(manifest),
                ..Self::with_state(state)
            },
            JobState::Failed => {
                let mut messages = Vec::new();
                collect_messages(&manifest, &mut messages);
                Self {
                    progress,
                    error: Some(serde_json::json!({
                        "status": raw_status,
                        "messages": messages,
                    })),
                    ..Self::with_state(state)
                }
            }
        })
    }
}

fn collect_messages(node: &Value, out: &mut Vec<Value>) {
    if let Some(messages) = node.get("messages").and_then(Value::as_array) {
        out.extend(messages.iter().cloned());
    }
    for key in ["derivatives", "children"] {
        if let Some(children) = node.get(key).and_then(Value::as_array) {
            for child in children {
                collect_messages(child, out);
            }
        }
    }
}

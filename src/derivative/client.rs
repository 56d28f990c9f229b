use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{JobStatus, PollError, Poller};
use crate::error::ApsError;

pub const DEFAULT_BASE_URL: &str = "https://developer.api.autodesk.com";
const DESIGNDATA_PATH: &str = "/modelderivative/v2/designdata";

/// Encode an object id (e.g. `urn:adsk.objects:os.object:bucket/file.rvt`)
/// as a URL-safe derivative URN.
pub fn encode_urn(object_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(object_id.as_bytes())
}

/// Accepted translation job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranslationJob {
    pub urn: String,
    pub result: String,
}

/// Model-derivative API client: submit translations and read their status.
///
/// # Example
/// ```no_run
/// use apsflow::derivative::{encode_urn, DerivativeClient, Poller};
///
/// # async fn example() -> Result<(), apsflow::error::ApsError> {
/// let client = DerivativeClient::new("access-token");
/// let urn = encode_urn("urn:adsk.objects:os.object:bucket/house.rvt");
/// client.submit_translation(&urn, &["svf2"]).await?;
/// let status = client.watch_translation(&urn, Poller::new(urn.clone())).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DerivativeClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl DerivativeClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Start a translation job for `urn` into the given output formats.
    pub async fn submit_translation(
        &self,
        urn: &str,
        formats: &[&str],
    ) -> Result<TranslationJob, ApsError> {
        if formats.is_empty() {
            return Err(ApsError::InvalidArgument(
                "at least one output format is required".to_string(),
            ));
        }
        let body = json!({
            "input": { "urn": urn },
            "output": {
                "formats": formats
                    .iter()
                    .map(|format| json!({ "type": format, "views": ["2d", "3d"] }))
                    .collect::<Vec<_>>(),
            }
        });
        let resp = self
            .client
            .post(format!("{}{DESIGNDATA_PATH}/job", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ApsError::api(status.as_u16(), message));
        }
        Ok(resp.json().await?)
    }

    /// Fetch the current job status from the manifest.
    pub async fn fetch_status(&self, urn: &str) -> Result<JobStatus, PollError> {
        let resp = self
            .client
            .get(format!("{}{DESIGNDATA_PATH}/{urn}/manifest", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            let manifest: Value = resp.json().await?;
            return JobStatus::from_manifest(manifest);
        }
        Err(PollError::Transport(format!(
            "Manifest request for {urn} failed with status {status}"
        )))
    }

    /// Drive `poller` against this client's manifest endpoint.
    pub async fn watch_translation(
        &self,
        urn: &str,
        poller: Poller,
    ) -> Result<JobStatus, PollError> {
        let status = poller
            .watch(|job_id| {
                let job_id = job_id.to_string();
                async move { self.fetch_status(&job_id).await }
            })
            .await?;
        tracing::debug!(%urn, "Translation converged");
        Ok(status)
    }
}

impl std::fmt::Debug for DerivativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivativeClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

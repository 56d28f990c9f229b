use async_trait::async_trait;
use serde::Deserialize;

use super::{AuthError, TokenResult};

pub const DEFAULT_TOKEN_URL: &str = "https://developer.api.autodesk.com/authentication/v2/token";

/// Trades an authorization code for a token pair.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<TokenResult, AuthError>;
}

/// Token endpoint client for the authorization-code grant.
///
/// # Example
/// ```no_run
/// use apsflow::auth::{HttpTokenExchanger, TokenExchanger};
///
/// # async fn example() -> Result<(), apsflow::auth::AuthError> {
/// let exchanger = HttpTokenExchanger::new("client-id").with_client_secret("secret");
/// let token = exchanger
///     .exchange("code-from-callback", "http://localhost:8080/auth/callback")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpTokenExchanger {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Option<String>,
}

impl HttpTokenExchanger {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: client_id.into(),
            client_secret: None,
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<TokenResult, AuthError> {
        let mut request = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", self.client_id.as_str()),
            ]);
        if let Some(secret) = &self.client_secret {
            request = request.basic_auth(&self.client_id, Some(secret));
        }
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Transport(format!(
                "Token exchange failed with status {status}: {}",
                truncate(&body, 200)
            )));
        }
        let payload: TokenResponse = resp.json().await?;
        Ok(TokenResult::new(payload.access_token, payload.expires_in)?
            .with_refresh_token(payload.refresh_token))
    }
}

impl std::fmt::Debug for HttpTokenExchanger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTokenExchanger")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    refresh_token: Option<String>,
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

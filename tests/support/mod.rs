#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use apsflow::auth::{AuthError, HandshakeConfig, TokenExchanger, TokenResult};
use async_trait::async_trait;
use tokio::sync::Notify;

/// Token exchanger that records calls and answers with a canned outcome.
pub struct StubExchanger {
    outcome: Result<(String, u64), AuthError>,
    delay: Duration,
    calls: Mutex<Vec<(String, String)>>,
    started: Notify,
}

impl StubExchanger {
    pub fn succeeding(access_token: &str, expires_in: u64) -> Self {
        Self::with_outcome(Ok((access_token.to_string(), expires_in)))
    }

    pub fn failing(error: AuthError) -> Self {
        Self::with_outcome(Err(error))
    }

    fn with_outcome(outcome: Result<(String, u64), AuthError>) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            started: Notify::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Resolves once an exchange has begun.
    pub async fn started(&self) {
        self.started.notified().await;
    }
}

#[async_trait]
impl TokenExchanger for StubExchanger {
    async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<TokenResult, AuthError> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((code.to_string(), redirect_uri.to_string()));
        self.started.notify_one();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.outcome {
            Ok((token, expires_in)) => TokenResult::new(token.clone(), *expires_in),
            Err(error) => Err(error.clone()),
        }
    }
}

pub fn handshake_config(timeout: Duration) -> HandshakeConfig {
    handshake_config_on_port(0, timeout)
}

pub fn handshake_config_on_port(port: u16, timeout: Duration) -> HandshakeConfig {
    HandshakeConfig::builder()
        .client_id("client-1")
        .port(port)
        .scopes(vec![
            "data:read".to_string(),
            "data:write".to_string(),
            "data:read".to_string(),
        ])
        .timeout(timeout)
        .authorize_url("https://auth.example.com/authorize")
        .open_browser(false)
        .build()
}

/// HTTP client that never reuses connections or goes through a proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .expect("build http client")
}

pub fn local_url(port: u16, path_and_query: &str) -> String {
    format!("http://127.0.0.1:{port}{path_and_query}")
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local addr")
        .port()
}

//! Configuration system (layered: defaults < TOML file < environment).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::exchange::DEFAULT_TOKEN_URL;
use crate::auth::handshake::{DEFAULT_AUTHORIZE_URL, DEFAULT_PORT};
use crate::auth::{HandshakeConfig, HttpTokenExchanger};
use crate::derivative::client::DEFAULT_BASE_URL;
use crate::derivative::DerivativeClient;
use crate::error::ApsError;

const DEFAULT_SCOPES: &[&str] = &[
    "data:read",
    "data:write",
    "data:create",
    "bucket:read",
    "viewables:read",
];
const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Settings for talking to the platform.
///
/// # Example
/// ```
/// use apsflow::config::ApsConfig;
///
/// let config: ApsConfig = toml::from_str(r#"
///     client_id = "my-client"
///     callback_port = 3000
/// "#).unwrap();
/// assert_eq!(config.callback_port, 3000);
/// assert_eq!(config.poll_interval_ms, 2000);
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApsConfig {
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub callback_port: u16,
    pub scopes: Vec<String>,
    pub handshake_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub authorize_url: String,
    pub token_url: String,
    pub derivative_base_url: String,
}

impl Default for ApsConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            callback_port: DEFAULT_PORT,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            derivative_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for ApsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("callback_port", &self.callback_port)
            .field("scopes", &self.scopes)
            .field("handshake_timeout_ms", &self.handshake_timeout_ms)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("derivative_base_url", &self.derivative_base_url)
            .finish()
    }
}

impl ApsConfig {
    /// Default config file location (`<config dir>/apsflow/config.toml`).
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "apsflow", "apsflow")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ApsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            ApsError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }

    /// Defaults, then the default config file if present, then the environment.
    pub fn load() -> Result<Self, ApsError> {
        let config = match Self::default_config_path() {
            Some(path) if path.exists() => Self::load_from_path(path)?,
            _ => Self::default(),
        };
        Ok(config.apply_env())
    }

    /// Defaults overlaid with environment variables (and `.env`).
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    pub fn apply_env(self) -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; malformed numbers are ignored with a warning.
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("APS_CLIENT_ID") {
            self.client_id = value;
        }
        if let Some(value) = lookup("APS_CLIENT_SECRET") {
            self.client_secret = Some(value);
        }
        if let Some(port) = parse_env(&lookup, "APS_CALLBACK_PORT") {
            self.callback_port = port;
        }
        if let Some(value) = lookup("APS_SCOPES") {
            self.scopes = value
                .split([',', ' '])
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(ms) = parse_env(&lookup, "APS_AUTH_TIMEOUT_MS") {
            self.handshake_timeout_ms = ms;
        }
        if let Some(ms) = parse_env(&lookup, "APS_POLL_INTERVAL_MS") {
            self.poll_interval_ms = ms;
        }
        if let Some(value) = lookup("APS_AUTHORIZE_URL") {
            self.authorize_url = value;
        }
        if let Some(value) = lookup("APS_TOKEN_URL") {
            self.token_url = value;
        }
        if let Some(value) = lookup("APS_DERIVATIVE_URL") {
            self.derivative_base_url = value;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ApsError> {
        if self.client_id.trim().is_empty() {
            return Err(ApsError::Configuration(
                "client_id is required (set APS_CLIENT_ID)".to_string(),
            ));
        }
        if self.handshake_timeout_ms == 0 {
            return Err(ApsError::Configuration(
                "handshake_timeout_ms must be positive".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ApsError::Configuration(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig::builder()
            .client_id(self.client_id.clone())
            .port(self.callback_port)
            .scopes(self.scopes.clone())
            .timeout(self.handshake_timeout())
            .authorize_url(self.authorize_url.clone())
            .build()
    }

    pub fn token_exchanger(&self) -> HttpTokenExchanger {
        let exchanger =
            HttpTokenExchanger::new(self.client_id.clone()).with_token_url(self.token_url.clone());
        match &self.client_secret {
            Some(secret) => exchanger.with_client_secret(secret.clone()),
            None => exchanger,
        }
    }

    pub fn derivative_client(&self, access_token: impl Into<String>) -> DerivativeClient {
        DerivativeClient::new(access_token).with_base_url(self.derivative_base_url.clone())
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(%key, value = %raw, "Ignoring malformed environment value");
            None
        }
    }
}

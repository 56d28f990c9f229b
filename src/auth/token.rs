use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Access token produced by a successful handshake.
///
/// # Example
/// ```
/// use apsflow::auth::TokenResult;
///
/// let token = TokenResult::new("access", 3599).unwrap();
/// assert_eq!(token.expires_in_seconds(), 3599);
/// assert!(!token.is_expired_at(token.issued_at()));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredToken")]
pub struct TokenResult {
    access_token: String,
    expires_in_seconds: u64,
    refresh_token: Option<String>,
    issued_at: DateTime<Utc>,
}

impl TokenResult {
    pub fn new(
        access_token: impl Into<String>,
        expires_in_seconds: u64,
    ) -> Result<Self, AuthError> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "token response has an empty access token".to_string(),
            ));
        }
        if expires_in_seconds == 0 {
            return Err(AuthError::InvalidResponse(
                "token response has a non-positive expiry".to_string(),
            ));
        }
        Ok(Self {
            access_token,
            expires_in_seconds,
            refresh_token: None,
            issued_at: Utc::now(),
        })
    }

    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_in_seconds(&self) -> u64 {
        self.expires_in_seconds
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.expires_in_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Unchecked wire shape; deserialization goes through [`TokenResult::new`].
#[derive(Deserialize)]
struct StoredToken {
    access_token: String,
    expires_in_seconds: u64,
    #[serde(default)]
    refresh_token: Option<String>,
    issued_at: DateTime<Utc>,
}

impl TryFrom<StoredToken> for TokenResult {
    type Error = AuthError;

    fn try_from(stored: StoredToken) -> Result<Self, Self::Error> {
        let mut token = Self::new(stored.access_token, stored.expires_in_seconds)?
            .with_refresh_token(stored.refresh_token);
        token.issued_at = stored.issued_at;
        Ok(token)
    }
}

impl fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResult")
            .field("access_token", &"<redacted>")
            .field("expires_in_seconds", &self.expires_in_seconds)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

//! Three-legged authorization handshake over a local redirect listener.
//!
//! A session races three triggers: the OAuth callback (followed by the code
//! exchange), an explicit cancel, and a timeout. The first to arrive settles
//! the session, closes the listener and clears the timer. Later triggers are
//! ignored.
//!
//! A callback carrying a code claims the session before the exchange starts.
//! From then on cancels are no-ops; only the exchange outcome or the timeout
//! can settle it.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use bon::Builder;
use serde::Deserialize;
use strum::Display;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::consent::{self, CALLBACK_PATH, CANCEL_PATH};
use super::{AuthError, TokenExchanger, TokenResult};
use crate::util::{duration_millis, Settlement, Timer};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_AUTHORIZE_URL: &str =
    "https://developer.api.autodesk.com/authentication/v2/authorize";

/// How long to let the listener finish in-flight responses after settling.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

type Outcome = Result<TokenResult, AuthError>;

/// Parameters for one handshake attempt.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use apsflow::auth::HandshakeConfig;
///
/// let config = HandshakeConfig::builder()
///     .client_id("my-client")
///     .port(0)
///     .scopes(vec!["data:read".to_string()])
///     .timeout(Duration::from_secs(30))
///     .open_browser(false)
///     .build();
/// assert_eq!(config.client_id, "my-client");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct HandshakeConfig {
    #[builder(into)]
    pub client_id: String,
    /// Local listener port. `0` picks an ephemeral port.
    #[builder(default = DEFAULT_PORT)]
    pub port: u16,
    #[builder(default)]
    pub scopes: Vec<String>,
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
    #[builder(into, default = DEFAULT_AUTHORIZE_URL.to_string())]
    pub authorize_url: String,
    #[builder(default = true)]
    pub open_browser: bool,
}

/// Lifecycle of an authorization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Listening,
    /// A callback code is being exchanged for a token.
    Exchanging,
    Resolved,
    Cancelled,
    TimedOut,
    /// The code exchange or callback failed in transport.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Listening | Self::Exchanging)
    }
}

struct AuthSession {
    id: Uuid,
    client_id: String,
    port: u16,
    scopes: Vec<String>,
    redirect_uri: String,
    consent_page: String,
    timeout: Duration,
    state: Mutex<SessionState>,
    settlement: Settlement<Outcome>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    listener_closes: AtomicUsize,
    timer: Mutex<Option<Timer>>,
    exchanger: Arc<dyn TokenExchanger>,
}

impl AuthSession {
    fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    fn is_terminal(&self) -> bool {
        self.settlement.is_settled()
    }

    fn resolve(&self, token: TokenResult) -> bool {
        self.finish(SessionState::Resolved, Ok(token))
    }

    /// Claim the session for a code exchange. Fails if another callback
    /// already claimed it or the session has settled.
    fn begin_exchange(&self) -> bool {
        let mut state = lock(&self.state);
        if *state != SessionState::Listening || self.is_terminal() {
            return false;
        }
        *state = SessionState::Exchanging;
        true
    }

    /// Explicit cancel. A no-op once a callback is exchanging its code.
    fn cancel(&self) -> bool {
        if self.state() == SessionState::Exchanging {
            debug!(session_id = %self.id, "Ignoring cancel during code exchange");
            return false;
        }
        self.abandon()
    }

    /// Cancel regardless of an in-flight exchange.
    fn abandon(&self) -> bool {
        self.finish(SessionState::Cancelled, Err(AuthError::Cancelled))
    }

    fn time_out(&self) -> bool {
        let timeout_ms = duration_millis(self.timeout);
        self.finish(SessionState::TimedOut, Err(AuthError::TimedOut { timeout_ms }))
    }

    fn fail(&self, error: AuthError) -> bool {
        self.finish(SessionState::Failed, Err(error))
    }

    fn finish(&self, next: SessionState, outcome: Outcome) -> bool {
        let settled = self.settlement.settle_with(outcome, || {
            *lock(&self.state) = next;
            self.close_listener();
            if let Some(timer) = lock(&self.timer).take() {
                timer.clear();
            }
        });
        if settled {
            info!(session_id = %self.id, port = self.port, state = %next, "Authorization session settled");
        } else {
            debug!(
                session_id = %self.id,
                ignored = %next,
                state = %self.state(),
                "Ignoring trigger for settled authorization session"
            );
        }
        settled
    }

    fn close_listener(&self) {
        if let Some(shutdown) = lock(&self.shutdown).take() {
            let _ = shutdown.send(());
            self.listener_closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Read-only view of a running or finished session.
#[derive(Clone)]
pub struct SessionMonitor {
    session: Arc<AuthSession>,
}

impl SessionMonitor {
    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn port(&self) -> u16 {
        self.session.port
    }

    pub fn scopes(&self) -> &[String] {
        &self.session.scopes
    }

    /// Number of times the listener was told to close. Never exceeds one.
    pub fn listener_closes(&self) -> usize {
        self.session.listener_closes.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("session_id", &self.session.id)
            .field("port", &self.session.port)
            .field("state", &self.state())
            .field("listener_closes", &self.listener_closes())
            .finish()
    }
}

/// A started handshake: the listener is bound and the timer is armed.
///
/// Dropping a handshake before it settles cancels it, even mid-exchange.
pub struct Handshake {
    session: Arc<AuthSession>,
    outcome: oneshot::Receiver<Outcome>,
    server: JoinHandle<()>,
    authorize_url: String,
}

impl Handshake {
    /// Bind the listener, arm the timeout and start serving.
    ///
    /// Fails with [`AuthError::PortUnavailable`] when the port cannot be bound;
    /// no session exists in that case.
    pub async fn start(
        config: HandshakeConfig,
        exchanger: Arc<dyn TokenExchanger>,
    ) -> Result<Self, AuthError> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, config.port))
            .await
            .map_err(|e| AuthError::PortUnavailable {
                port: config.port,
                reason: e.to_string(),
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::PortUnavailable {
                port: config.port,
                reason: e.to_string(),
            })?
            .port();

        let scopes = consent::normalize_scopes(&config.scopes);
        let redirect_uri = consent::redirect_uri(port);
        let authorize_url =
            consent::authorize_url(&config.authorize_url, &config.client_id, &redirect_uri, &scopes)?;
        let consent_page =
            consent::render_consent_page(&config.client_id, port, &scopes, &authorize_url);

        let (settlement, outcome) = Settlement::new();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let session = Arc::new(AuthSession {
            id: Uuid::new_v4(),
            client_id: config.client_id,
            port,
            scopes,
            redirect_uri,
            consent_page,
            timeout: config.timeout,
            state: Mutex::new(SessionState::Listening),
            settlement,
            shutdown: Mutex::new(Some(shutdown_tx)),
            listener_closes: AtomicUsize::new(0),
            timer: Mutex::new(None),
            exchanger,
        });

        let app = router(session.clone());
        let session_id = session.id;
        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                warn!(%session_id, error = %e, "Authorization listener stopped with error");
            }
        });

        let weak = Arc::downgrade(&session);
        let timer = Timer::arm(config.timeout, move || {
            if let Some(session) = weak.upgrade() {
                session.time_out();
            }
        });
        if session.is_terminal() {
            timer.clear();
        } else {
            *lock(&session.timer) = Some(timer);
        }

        info!(
            session_id = %session.id,
            client_id = %session.client_id,
            port,
            timeout_ms = duration_millis(config.timeout),
            "Authorization listener started"
        );

        Ok(Self {
            session,
            outcome,
            server,
            authorize_url: authorize_url.to_string(),
        })
    }

    pub fn port(&self) -> u16 {
        self.session.port
    }

    /// Local consent page to show the user.
    pub fn consent_url(&self) -> String {
        format!("http://localhost:{}/", self.session.port)
    }

    /// Remote authorization endpoint URL embedded in the consent page.
    pub fn authorize_url(&self) -> &str {
        &self.authorize_url
    }

    pub fn redirect_uri(&self) -> &str {
        &self.session.redirect_uri
    }

    pub fn monitor(&self) -> SessionMonitor {
        SessionMonitor {
            session: self.session.clone(),
        }
    }

    /// Open the consent page in the default browser. Failure is only logged.
    pub fn open_consent_page(&self) {
        open_in_browser(self.consent_url());
    }

    /// Cancel the session from the caller's side. Returns `false` when the
    /// session already settled or a callback is exchanging its code.
    pub fn cancel(&self) -> bool {
        self.session.cancel()
    }

    /// Wait for the first trigger to settle the session.
    pub async fn wait(mut self) -> Result<TokenResult, AuthError> {
        let result = match (&mut self.outcome).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Transport(
                "authorization session ended without an outcome".to_string(),
            )),
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.server)
            .await
            .is_err()
        {
            debug!(session_id = %self.session.id, "Aborting authorization listener after grace period");
            self.server.abort();
        }
        result
    }
}

impl Drop for Handshake {
    fn drop(&mut self) {
        if !self.session.is_terminal() {
            self.session.abandon();
        }
        if !self.server.is_finished() {
            self.server.abort();
        }
    }
}

impl fmt::Debug for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshake")
            .field("session", &self.monitor())
            .field("authorize_url", &self.authorize_url)
            .finish()
    }
}

/// Run a complete handshake: start the listener, open the consent page and
/// wait for the outcome.
pub async fn begin_handshake(
    config: HandshakeConfig,
    exchanger: Arc<dyn TokenExchanger>,
) -> Result<TokenResult, AuthError> {
    let open_browser = config.open_browser;
    let handshake = Handshake::start(config, exchanger).await?;
    if open_browser {
        handshake.open_consent_page();
    }
    handshake.wait().await
}

fn open_in_browser(url: String) {
    tokio::task::spawn_blocking(move || {
        if let Err(e) = webbrowser::open(&url) {
            warn!(%url, error = %e, "Could not open browser; visit the consent page manually");
        }
    });
}

fn router(session: Arc<AuthSession>) -> Router {
    Router::new()
        .route("/", get(consent_page))
        .route(CALLBACK_PATH, get(callback))
        .route(CANCEL_PATH, get(cancel))
        .fallback(not_found)
        .with_state(session)
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

type PageResponse = (StatusCode, Html<String>);

fn page(status: StatusCode, title: &str, message: &str) -> PageResponse {
    (status, Html(consent::render_message_page(title, message)))
}

fn already_finished() -> PageResponse {
    page(
        StatusCode::GONE,
        "Session finished",
        "This login session has already finished. You can close this window.",
    )
}

fn exchange_in_progress() -> PageResponse {
    page(
        StatusCode::CONFLICT,
        "Sign-in in progress",
        "This login is already completing. You can close this window.",
    )
}

async fn consent_page(State(session): State<Arc<AuthSession>>) -> PageResponse {
    if session.is_terminal() {
        return already_finished();
    }
    (StatusCode::OK, Html(session.consent_page.clone()))
}

async fn callback(
    State(session): State<Arc<AuthSession>>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> PageResponse {
    if session.is_terminal() {
        return already_finished();
    }
    if session.state() == SessionState::Exchanging {
        return exchange_in_progress();
    }
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            let error = AuthError::Transport(format!("malformed callback query: {rejection}"));
            let message = error.to_string();
            session.fail(error);
            return page(StatusCode::BAD_REQUEST, "Login failed", &message);
        }
    };

    let code = match params {
        CallbackParams {
            code: Some(code), ..
        } if !code.is_empty() => code,
        CallbackParams {
            error: Some(error), ..
        } if error == "access_denied" => {
            session.cancel();
            return page(
                StatusCode::OK,
                "Login cancelled",
                "Authorization was declined. You can close this window.",
            );
        }
        CallbackParams {
            error: Some(error),
            error_description,
            ..
        } => {
            let detail = error_description.map(|d| format!(": {d}")).unwrap_or_default();
            let error =
                AuthError::Transport(format!("authorization server returned {error}{detail}"));
            let message = error.to_string();
            session.fail(error);
            return page(StatusCode::BAD_GATEWAY, "Login failed", &message);
        }
        _ => {
            let error =
                AuthError::Transport("callback request is missing the code parameter".to_string());
            let message = error.to_string();
            session.fail(error);
            return page(StatusCode::BAD_REQUEST, "Login failed", &message);
        }
    };

    if !session.begin_exchange() {
        return if session.is_terminal() {
            already_finished()
        } else {
            exchange_in_progress()
        };
    }
    debug!(session_id = %session.id, "Exchanging authorization code");
    match session.exchanger.exchange(&code, &session.redirect_uri).await {
        Ok(token) => {
            if session.resolve(token) {
                page(
                    StatusCode::OK,
                    "Login successful",
                    "You are signed in. You can close this window.",
                )
            } else {
                already_finished()
            }
        }
        Err(error) => {
            let message = error.to_string();
            if session.fail(error) {
                page(StatusCode::BAD_GATEWAY, "Login failed", &message)
            } else {
                already_finished()
            }
        }
    }
}

async fn cancel(State(session): State<Arc<AuthSession>>) -> PageResponse {
    if session.cancel() {
        page(
            StatusCode::OK,
            "Login cancelled",
            "Authorization was cancelled. You can close this window.",
        )
    } else {
        already_finished()
    }
}

async fn not_found() -> PageResponse {
    page(StatusCode::NOT_FOUND, "Not found", "Unknown path.")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

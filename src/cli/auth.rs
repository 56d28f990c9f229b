//! CLI handler for `apsflow login`.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthError, Handshake};
use crate::config::ApsConfig;
use crate::error::ApsError;

use super::LoginArgs;

/// Handle `apsflow login`.
pub async fn handle_login(args: LoginArgs) -> Result<(), ApsError> {
    let mut config = ApsConfig::load()?;
    if let Some(port) = args.port {
        config.callback_port = port;
    }
    if let Some(secs) = args.timeout_secs {
        config.handshake_timeout_ms = secs.saturating_mul(1000);
    }
    config.validate()?;

    let open_browser = !args.no_browser;
    let handshake =
        Handshake::start(config.handshake_config(), Arc::new(config.token_exchanger())).await?;
    println!("Sign in at: {}", handshake.consent_url());
    println!(
        "Waiting up to {}s for authorization on port {}...",
        Duration::from_millis(config.handshake_timeout_ms).as_secs(),
        handshake.port()
    );
    if open_browser {
        handshake.open_consent_page();
    }

    match handshake.wait().await {
        Ok(token) => {
            println!(
                "Login successful; token expires {}",
                token.expires_at().format("%Y-%m-%d %H:%M:%S UTC")
            );
            if args.print_token {
                println!("{}", token.access_token());
            }
            Ok(())
        }
        Err(AuthError::Cancelled) => {
            println!("Login cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

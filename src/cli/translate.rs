//! CLI handlers for `apsflow translate` and `apsflow watch`.

use std::time::Duration;

use crate::config::ApsConfig;
use crate::derivative::{encode_urn, DerivativeClient, JobStatus, PollError, Poller};
use crate::error::ApsError;

use super::{TranslateArgs, WatchArgs};

const ACCESS_TOKEN_ENV: &str = "APS_ACCESS_TOKEN";

/// Handle `apsflow translate`.
pub async fn handle_translate(args: TranslateArgs) -> Result<(), ApsError> {
    let (config, client) = load_client()?;
    let urn = encode_urn(&args.object_id);
    let job = client.submit_translation(&urn, &[args.format.as_str()]).await?;
    println!("Submitted translation ({}) for {}", job.result, job.urn);
    watch(&client, &urn, interval(&config, args.interval_ms)).await
}

/// Handle `apsflow watch`.
pub async fn handle_watch(args: WatchArgs) -> Result<(), ApsError> {
    let (config, client) = load_client()?;
    watch(&client, &args.urn, interval(&config, args.interval_ms)).await
}

fn load_client() -> Result<(ApsConfig, DerivativeClient), ApsError> {
    let config = ApsConfig::load()?;
    let token = std::env::var(ACCESS_TOKEN_ENV).map_err(|_| {
        ApsError::Configuration(format!(
            "{ACCESS_TOKEN_ENV} is not set (run `apsflow login --print-token`)"
        ))
    })?;
    let client = config.derivative_client(token);
    Ok((config, client))
}

fn interval(config: &ApsConfig, override_ms: Option<u64>) -> Duration {
    override_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.poll_interval())
}

async fn watch(client: &DerivativeClient, urn: &str, interval: Duration) -> Result<(), ApsError> {
    let poller = Poller::new(urn)
        .with_interval(interval)
        .on_progress(|event| {
            eprintln!(
                "[{}] {} {}",
                event.tick,
                event.state,
                event.progress.unwrap_or("")
            );
        });
    let handle = poller.handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let result = client.watch_translation(urn, poller).await;
    ctrl_c.abort();

    match result {
        Ok(status) => {
            print_success(&status);
            Ok(())
        }
        Err(PollError::Cancelled) => {
            eprintln!("Stopped watching {urn}");
            Ok(())
        }
        Err(e @ PollError::Failed { .. }) => {
            if let Some(diagnostics) = e.diagnostics() {
                eprintln!("{}", serde_json::to_string_pretty(diagnostics)?);
            }
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_success(status: &JobStatus) {
    let derivatives = status
        .manifest
        .as_ref()
        .and_then(|m| m.get("derivatives"))
        .and_then(|d| d.as_array())
        .map(Vec::len)
        .unwrap_or(0);
    println!("Translation complete ({derivatives} derivatives)");
}

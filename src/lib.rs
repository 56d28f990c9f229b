//! apsflow — authorization handshake and job convergence for Autodesk
//! Platform Services.
//!
//! Two self-contained pieces:
//!
//! - [`auth`]: a three-legged OAuth handshake that serves a consent page on a
//!   local port and races the callback, an explicit cancel and a timeout.
//! - [`derivative`]: a poller that watches a model-translation job until it
//!   succeeds or fails, reporting progress without overlapping requests.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use apsflow::prelude::*;
//!
//! # async fn example() -> apsflow::error::Result<()> {
//! let config = ApsConfig::from_env();
//! config.validate()?;
//! let token = begin_handshake(
//!     config.handshake_config(),
//!     Arc::new(config.token_exchanger()),
//! )
//! .await?;
//!
//! let client = config.derivative_client(token.access_token());
//! let urn = encode_urn("urn:adsk.objects:os.object:bucket/house.rvt");
//! client.submit_translation(&urn, &["svf2"]).await?;
//! let poller = Poller::new(urn.clone())
//!     .with_interval(config.poll_interval())
//!     .on_progress(|event| println!("{}", event.progress.unwrap_or("pending")));
//! let status = client.watch_translation(&urn, poller).await?;
//! println!("{:?}", status.manifest);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod derivative;
pub mod error;
pub mod prelude;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

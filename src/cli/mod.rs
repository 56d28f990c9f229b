//! CLI entry point for apsflow.

pub mod auth;
pub mod translate;

use clap::{Parser, Subcommand};

/// apsflow CLI
#[derive(Parser, Debug)]
#[command(name = "apsflow", version, about = "Sign in and watch model translations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in through the browser
    Login(LoginArgs),
    /// Submit a translation job and watch it
    Translate(TranslateArgs),
    /// Watch an existing translation job
    Watch(WatchArgs),
}

/// Arguments for `apsflow login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Local callback port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Seconds to wait for the user (overrides config)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the consent URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,

    /// Print the access token (for exporting as APS_ACCESS_TOKEN)
    #[arg(long)]
    pub print_token: bool,
}

/// Arguments for `apsflow translate`.
#[derive(Parser, Debug)]
pub struct TranslateArgs {
    /// Object id of the uploaded design
    pub object_id: String,

    /// Output format
    #[arg(short, long, default_value = "svf2")]
    pub format: String,

    /// Poll interval in milliseconds (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

/// Arguments for `apsflow watch`.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Base64 URN of the design
    pub urn: String,

    /// Poll interval in milliseconds (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,
}

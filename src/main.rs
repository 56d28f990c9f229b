//! apsflow CLI binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use apsflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apsflow=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Login(args) => apsflow::cli::auth::handle_login(args).await,
        Commands::Translate(args) => apsflow::cli::translate::handle_translate(args).await,
        Commands::Watch(args) => apsflow::cli::translate::handle_watch(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        eprintln!("Hint: {:?}", e.recovery_suggestion());
        std::process::exit(1);
    }
}

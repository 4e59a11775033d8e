use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventful::cli::{run_command, Cli};
use eventful::config::Config;
use eventful::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config)?;
    cli.apply_overrides(&mut config);

    // Logs go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!(
        api = %config.api.base_url,
        data_dir = %config.session.data_dir.display(),
        "Starting Eventful v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::new(config).context("Failed to initialize client")?;

    let result = run_command(&state, &cli.command).await;

    let collected = state.queries.collect_garbage();
    tracing::debug!(collected, remaining = state.queries.len(), "Query cache swept");

    result
}

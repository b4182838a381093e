//! squatwatch - watch certificate transparency for domains that look like yours.

use anyhow::Result;
use clap::Parser;
use squatwatch::{app::App, cli::Cli, config::Config};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_tracing("info");
            error!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);
    info!("squatwatch starting up...");

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("CertStream URL: {}", config.network.certstream_url);
    info!("Reconnect Delay: {}s", config.network.reconnect_delay_seconds);
    match (&config.matching.pattern_file, config.matching.mutate.as_slice()) {
        (Some(path), _) => info!("Pattern File: {}", path.display()),
        (None, []) => info!("Pattern Source: None"),
        (None, seeds) => info!("Mutating: {}", seeds.join(", ")),
    }
    info!("Output File: {}", config.output.path.display());
    info!("Queue Capacity: {}", config.output.queue_capacity);
    info!("Discord Webhooks: {}", config.output.discord_webhooks.len());
    info!("Slack Webhooks: {}", config.output.slack_webhooks.len());
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let app = match App::builder(config).build(shutdown_rx).await {
        Ok(app) => app,
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(1);
        }
    };
    info!(patterns = app.pattern_count(), "Monitoring certstream. Press Ctrl-C to stop.");
    let app_handle = tokio::spawn(app.run());

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, shutting down...");
    // Receivers may already be gone if every task exited on its own.
    let _ = shutdown_tx.send(true);

    app_handle.await??;
    info!("squatwatch shut down.");
    Ok(())
}

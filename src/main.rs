//! today-alerts entry point.

use today_alerts::config::Config;
use today_alerts::digest::DigestService;
use today_alerts::messaging::SlackAdapter;
use today_alerts::server::{self, ServerState};

use anyhow::Context as _;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "today-alerts")]
#[command(about = "Slack slash command that lists today's @here, @channel and direct mentions")]
struct Cli {
    /// Path to config file (optional)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Listen port, overriding PORT and the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    today_alerts::logging::init_tracing(cli.debug);

    // slack-morphism's hyper connector needs a process-wide rustls provider.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing::info!(
        port = config.server.port,
        command = %config.server.command,
        max_messages = config.digest.max_messages,
        timezone = ?config.digest.timezone,
        "configuration loaded"
    );

    let adapter = Arc::new(
        SlackAdapter::new(config.slack.bot_token.clone(), config.digest.history_limit)
            .context("failed to create slack adapter")?,
    );
    let bot_user_id = adapter
        .health_check()
        .await
        .context("slack bot token was rejected")?;
    tracing::info!(bot_user_id = %bot_user_id, "slack bot user ID resolved");

    let digest = DigestService::new(adapter.clone(), adapter, config.digest.clone());
    let state = Arc::new(ServerState {
        digest: Arc::new(digest),
        signing_secret: config.slack.signing_secret.clone(),
        command: config.server.command.clone(),
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let bind = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let server = server::start_http_server(bind, state, shutdown_rx).await?;

    tracing::info!("today-alerts is running");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Err(error) = server.await {
        tracing::warn!(%error, "HTTP server task failed");
    }

    tracing::info!("today-alerts stopped");
    Ok(())
}

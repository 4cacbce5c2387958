use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use finance_tracker_api::config::AppConfig;
use finance_tracker_api::services::UserService;
use finance_tracker_api::{app, database, AppState};

/// Personal finance tracking API server
#[derive(Debug, Parser)]
#[command(name = "finance-tracker-api", version, about)]
struct Args {
    /// Port to listen on (overrides SERVER_PORT / PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    info!("Starting Finance Tracker API in {:?} mode", config.environment);
    if config.uses_development_secret() {
        warn!("Using the built-in development JWT secret; set JWT_SECRET for any shared deployment");
    }

    let store = database::connect(&config.database)
        .await
        .context("failed to open datastore")?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let bootstrap_admin = config.security.bootstrap_admin.clone();
    let state = AppState::new(config, store);

    if let Some(admin) = bootstrap_admin {
        UserService::new(&state)
            .bootstrap_admin(&admin)
            .await
            .map_err(|e| anyhow::anyhow!("failed to create bootstrap administrator: {}", e))?;
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Finance Tracker API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

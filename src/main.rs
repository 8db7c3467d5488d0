//! Keepalive - endpoint health checks with rolling uptime history.

mod config;
mod coordinator;
mod history;
mod probe;
mod viewer;
mod web;

use config::ServerConfig;
use history::HistoryStore;
use probe::Prober;
use viewer::StatsViewer;
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("keepalive=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting keepalive on port {}...", cfg.http_port);
    tracing::info!("Using history at {}", cfg.history_path);

    if cfg.targets.is_empty() {
        tracing::warn!("No default targets configured; set KEEPALIVE_PROJECTS or KEEPALIVE_URL_<n>/KEEPALIVE_KEY_<n>");
    } else {
        tracing::info!("Loaded {} default targets", cfg.targets.len());
    }

    let prober = Arc::new(Prober::new(cfg.probe_timeout)?);
    tracing::info!("Probe timeout {:?}", prober.timeout());

    let history = HistoryStore::new(&cfg.history_path);
    tracing::info!("History holds {} rounds ({})", history.load().len(), history.path().display());

    let viewer = Arc::new(
        StatsViewer::new(cfg.stats_source.clone(), history, cfg.refresh_interval)
            .with_fetch_timeout(cfg.stats_timeout),
    );

    // Start web server
    let server = Server::new(cfg, prober, viewer);
    server.start().await?;

    Ok(())
}

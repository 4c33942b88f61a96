mod api;
mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;
use mission_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use mission_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging comes up before bootstrap so connection and migration events are visible
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let routes = api::router(app.control.clone(), app.config.analysis.max_upload_bytes)
        .merge(health::router(app.db_pool.clone(), app.control.clone()));

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "mission-server listening"
    );
    axum::serve(listener, routes).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "mission-server stopping"
    );
    app.control.stop_campaign("shutdown").await;
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, app.control.wait_campaign()).await {
        Ok(Some(report)) => tracing::info!(
            event_name = "campaign.drained",
            correlation_id = "shutdown",
            sent = report.sent,
            failed = report.failed,
            cancelled = report.cancelled,
            "campaign stopped before exit"
        ),
        Ok(None) => {}
        Err(_) => tracing::warn!(
            event_name = "campaign.drain_timed_out",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "campaign did not stop within the grace period"
        ),
    }
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for shutdown signal"
        );
    }
}

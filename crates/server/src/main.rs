mod api;
mod bootstrap;
mod health;
mod reminders;

use anyhow::Result;
use docgate_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use docgate_core::config::LogFormat::*;
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
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let sweep_interval = app.config.notify.sweep_interval_minutes;
    let _sweep = app.batcher.clone().spawn_sweep(sweep_interval);
    let _reminders = reminders::spawn(
        app.workflow.clone(),
        app.batcher.clone(),
        sweep_interval,
        app.config.workflow.max_page_size,
    );

    let router = api::router(api::AppState {
        workflow: app.workflow.clone(),
        coordinator: app.coordinator.clone(),
        batcher: app.batcher.clone(),
        max_page_size: app.config.workflow.max_page_size,
    })
    .merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "docgate-server listening"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "docgate-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}

//! Casemail - credential store and mail relay entry point

use anyhow::{Context, Result};
use casemail_api::{create_router, AppState};
use casemail_common::config::{Config, LoggingConfig};
use casemail_core::{Cipher, SmtpMailer};
use casemail_storage::{DatabasePool, DbEmailSettingsRepository};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Casemail server...");

    config.validate().context("Invalid configuration")?;

    // Initialize encryption
    let cipher = Arc::new(Cipher::from_config(&config.encryption)?);

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;

    // Run migrations
    db_pool.migrate().await?;

    let repo = Arc::new(DbEmailSettingsRepository::new(db_pool));
    let mailer = Arc::new(SmtpMailer::new(Duration::from_secs(
        config.relay.timeout_secs,
    )));

    if !config.api.require_auth {
        warn!("API authentication is disabled; every request is treated as admin");
    } else if config.api.keys.is_empty() {
        warn!("No API keys configured; every /api request will be rejected");
    }

    let state = AppState::new(repo, cipher, mailer, &config.api);
    let app = create_router(state, &config.api);

    let addr = format!("{}:{}", config.server.bind_address, config.api.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;
    info!("Starting API server on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Casemail server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolves once `signal` fires; a listener that fails never resolves
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}

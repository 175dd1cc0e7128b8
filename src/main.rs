mod config;
mod entities;
mod http;
mod models;
mod state;
mod store;

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::state::AppState;
use crate::store::PlatformStore;
use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ApiConfig::load().context("Failed to load configuration")?;

    // The one-time async initialization: engine allocation failure here is
    // fatal, the service never runs with silent no-op persistence.
    let store = PlatformStore::open(&config.database)
        .await
        .context("Failed to open the platform store")?;
    let app_state = AppState::new(Arc::new(store), config.audit.default_actor.clone());

    let listener = TcpListener::bind(config.server.address())
        .await
        .context("Failed to bind HTTP listener")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to obtain listener address")?;
    info!("AirdropHub API listening on {local_addr}");

    let router: Router = http::router(app_state.clone());
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited with error")?;

    app_state.store.close();
    Ok(())
}

fn init_tracing() {
    let default_filter = "info";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    info!("Shutdown signal received");
}

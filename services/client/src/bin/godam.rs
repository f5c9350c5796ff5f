//! services/client/src/bin/godam.rs

use std::sync::Arc;

use client_lib::{
    adapters::{ApiInventoryFeed, FileStore, ShellNavigator, SystemClock},
    config::Config,
    error::ClientError,
    http::ApiClient,
    runtime::SessionRuntime,
    tasks::NotificationPoller,
};
use godam_core::{AuthGuard, NotificationManager, TokenManager};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting session shell...");

    // --- 2. Build the Adapters ---
    let store = Arc::new(FileStore::new(&config.storage_path));
    info!(path = %store.path().display(), "Using storage file");
    let clock = Arc::new(SystemClock);
    let navigator = Arc::new(ShellNavigator::new(config.start_path.clone()));
    let settings = config.session_settings();

    // --- 3. Build the Managers ---
    let tokens = TokenManager::new(store.clone(), clock.clone(), navigator, settings.clone());
    if let Some(token) = &config.session_token {
        tokens.store_token(token, config.identity);
    }
    if !AuthGuard::new(tokens.clone()).enforce(config.identity) {
        warn!(identity = %config.identity, "No valid session; polls are skipped until one is stored");
    }

    let api = ApiClient::new(config.api_base_url.clone(), tokens.clone())?;
    let notifications = NotificationManager::new(store, clock.clone(), settings);

    // --- 4. Wire the Poller to an Alert Sink ---
    let (alert_tx, mut alert_rx) = mpsc::channel(64);
    let poller = NotificationPoller::new(
        Arc::new(ApiInventoryFeed::new(api, config.identity)),
        notifications,
        clock,
        config.low_stock_threshold,
        alert_tx,
    );
    let sink = tokio::spawn(async move {
        while let Some(alert) = alert_rx.recv().await {
            match serde_json::to_string(&alert) {
                Ok(json) => info!(alert = %json, "New alert"),
                Err(e) => warn!(error = %e, "Failed to encode alert"),
            }
        }
    });

    // --- 5. Run Until Interrupted ---
    let runtime = SessionRuntime::start(tokens, Some(poller), config.poll_interval());
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    runtime.dispose().await;
    if let Err(e) = sink.await {
        warn!(error = %e, "Alert sink ended abnormally");
    }

    Ok(())
}

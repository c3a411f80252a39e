//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::Result;
use codedrop_core::{Clock, Config, SystemClock};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Everything `main` needs to serve and later shut down
pub struct App {
    pub state: Arc<AppState>,
    pub router: axum::Router,
    pub sweeper: Option<JoinHandle<()>>,
}

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<App> {
    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!("Configuration loaded and validated successfully");

    let stores = services::setup_stores(&config).await?;
    let storage = storage::setup_storage(&config).await?;
    let notifier = services::setup_notifier(&config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sweeper = services::start_expiry_sweeper(&config, stores.files.clone(), clock.clone());
    let state = services::build_state(config, stores, storage, clock, notifier);
    let router = routes::setup_routes(state.clone());

    Ok(App {
        state,
        router,
        sweeper,
    })
}

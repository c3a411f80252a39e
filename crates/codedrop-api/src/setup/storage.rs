//! Storage gateway setup

use anyhow::{Context, Result};
use codedrop_core::Config;
use codedrop_storage::{create_storage, StorageGateway};
use std::sync::Arc;

/// Build the configured storage backend and check it is reachable.
///
/// An unreachable backend is logged, not fatal: `/health` keeps reporting it.
pub async fn setup_storage(config: &Config) -> Result<Arc<dyn StorageGateway>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage backend")?;

    match storage.health_check().await {
        Ok(()) => tracing::info!(backend = %storage.backend_type(), "Storage backend reachable"),
        Err(e) => tracing::warn!(
            error = %e,
            backend = %storage.backend_type(),
            "Storage backend not reachable at startup"
        ),
    }

    Ok(storage)
}

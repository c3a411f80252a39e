//! Record stores, the file-access service and background tasks

use crate::auth::JwtKeys;
use crate::limiter::AccessAttemptLimiter;
use crate::state::AppState;
use anyhow::Result;
use codedrop_core::{Clock, Config, RecordStoreKind};
use codedrop_db::{
    FileRecordStore, InMemoryFileRecordStore, InMemoryUserStore, PgFileRecordRepository,
    PgUserRepository, UserStore,
};
use codedrop_services::{EmailNotifier, ExpirySweeper, FileAccessService, LogNotifier, Notifier};
use codedrop_storage::StorageGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Persistence for file records and accounts
#[derive(Clone)]
pub struct Stores {
    pub files: Arc<dyn FileRecordStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            files: Arc::new(InMemoryFileRecordStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
        }
    }
}

pub async fn setup_stores(config: &Config) -> Result<Stores> {
    match config.record_store() {
        RecordStoreKind::Postgres => {
            let pool = super::database::setup_database(config).await?;
            Ok(Stores {
                files: Arc::new(PgFileRecordRepository::new(pool.clone())),
                users: Arc::new(PgUserRepository::new(pool)),
            })
        }
        RecordStoreKind::Memory => {
            tracing::warn!("Using in-memory record store; records are lost on restart");
            Ok(Stores::in_memory())
        }
    }
}

/// SMTP when configured, otherwise a notifier that only logs.
pub fn setup_notifier(config: &Config) -> Arc<dyn Notifier> {
    match EmailNotifier::from_config(config) {
        Some(email) => Arc::new(email),
        None => Arc::new(LogNotifier),
    }
}

pub fn build_state(
    config: Config,
    stores: Stores,
    storage: Arc<dyn StorageGateway>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
) -> Arc<AppState> {
    let files = Arc::new(FileAccessService::new(stores.files, clock, notifier));
    let jwt = Arc::new(JwtKeys::new(config.jwt_secret(), config.jwt_expiry_hours()));
    let access_limiter = AccessAttemptLimiter::new(
        config.access_attempt_limit(),
        config.access_attempt_window_secs(),
    );

    Arc::new(AppState {
        config,
        files,
        storage,
        users: stores.users,
        jwt,
        access_limiter,
    })
}

/// Start the eager expiry sweep unless `EXPIRY_SWEEP_INTERVAL_SECS=0`.
pub fn start_expiry_sweeper(
    config: &Config,
    store: Arc<dyn FileRecordStore>,
    clock: Arc<dyn Clock>,
) -> Option<JoinHandle<()>> {
    let interval_secs = config.expiry_sweep_interval_secs();
    if interval_secs == 0 {
        tracing::info!("Expiry sweep disabled; records expire on access only");
        return None;
    }

    tracing::info!(interval_secs, "Starting expiry sweeper");
    let sweeper = Arc::new(ExpirySweeper::new(
        store,
        clock,
        Duration::from_secs(interval_secs),
    ));
    Some(sweeper.start())
}

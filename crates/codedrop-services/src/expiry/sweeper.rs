use std::sync::Arc;
use std::time::Duration;

use codedrop_core::{AppError, Clock};
use codedrop_db::FileRecordStore;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn FileRecordStore>,
    clock: Arc<dyn Clock>,
    period: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn FileRecordStore>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        Self {
            store,
            clock,
            period,
        }
    }

    /// Start the background sweep loop.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match self.run_once().await {
                    Ok(0) => tracing::debug!("Expiry sweep found nothing to expire"),
                    Ok(expired) => tracing::info!(expired, "Expiry sweep completed"),
                    Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
                }
            }
        })
    }

    /// Expire every uploaded record whose window has closed. Returns how many moved.
    #[tracing::instrument(skip(self), fields(sweep.operation = "expire_lapsed"))]
    pub async fn run_once(&self) -> Result<u64, AppError> {
        self.store.expire_lapsed(self.clock.now()).await
    }
}

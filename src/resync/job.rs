//! Periodic synchronization job.
//!
//! Invokes `TenantsSynchronizer::synchronize` once per resync interval.
//! Failed cycles are logged and the next tick simply tries again from the
//! unchanged checkpoint.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use super::TenantsSynchronizer;

/// Drives a synchronizer on a fixed interval.
pub struct SynchronizationJob {
    synchronizer: Arc<TenantsSynchronizer>,
    interval: Duration,
}

impl SynchronizationJob {
    pub fn new(synchronizer: Arc<TenantsSynchronizer>) -> Self {
        let interval = synchronizer.resync_interval();
        Self {
            synchronizer,
            interval,
        }
    }

    /// Override the tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run cycles forever. The first cycle starts immediately.
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run cycles until `shutdown` resolves. Shutdown is observed between cycles.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            job = %self.synchronizer.name(),
            tenant_type = %self.synchronizer.tenant_type(),
            interval = ?self.interval,
            "Starting tenant synchronization job"
        );

        // tokio intervals must be non-zero
        let mut ticker = interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(job = %self.synchronizer.name(), "Stopping tenant synchronization job");
                    return;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    /// Run a single cycle, logging its outcome.
    pub async fn run_once(&self) -> bool {
        match self.synchronizer.synchronize().await {
            Ok(()) => {
                info!(job = %self.synchronizer.name(), "Tenant synchronization completed");
                true
            }
            Err(e) => {
                error!(job = %self.synchronizer.name(), error = %e, "Tenant synchronization failed");
                false
            }
        }
    }
}

//! Persisted resync checkpoint.
//!
//! The checkpoint is the pair (last consumed tenant timestamp, last full
//! resync timestamp), both Unix milliseconds as decimal strings.

#[cfg(feature = "k8s")]
mod config_map;
pub mod mock;

#[cfg(feature = "k8s")]
pub use config_map::ConfigMapKubeClient;
pub use mock::MockKubeClient;

use async_trait::async_trait;
use tracing::debug;

/// Value reported for both timestamps when no checkpoint is persisted.
pub const INITIAL_TIMESTAMP: &str = "1";

/// Errors from the checkpoint store.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[cfg(feature = "k8s")]
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Config map {0} has no data")]
    MissingData(String),

    #[error("Checkpoint store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value checkpoint store backed by a Kubernetes ConfigMap.
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Returns `(last_consumed_tenant_timestamp, last_full_resync_timestamp)`.
    async fn get_tenant_fetcher_config_map_data(&self) -> Result<(String, String), CheckpointError>;

    async fn update_tenant_fetcher_config_map_data(
        &self,
        last_run_timestamp: &str,
        last_resync_timestamp: &str,
    ) -> Result<(), CheckpointError>;
}

/// Checkpoint store used when Kubernetes is disabled: every cycle starts from
/// the initial timestamp and updates are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopKubeClient;

#[async_trait]
impl KubeClient for NoopKubeClient {
    async fn get_tenant_fetcher_config_map_data(&self) -> Result<(String, String), CheckpointError> {
        Ok((INITIAL_TIMESTAMP.to_string(), INITIAL_TIMESTAMP.to_string()))
    }

    async fn update_tenant_fetcher_config_map_data(
        &self,
        last_run_timestamp: &str,
        last_resync_timestamp: &str,
    ) -> Result<(), CheckpointError> {
        debug!(last_run_timestamp, last_resync_timestamp, "Kubernetes disabled, checkpoint not persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_returns_initial_timestamps() {
        let client = NoopKubeClient;
        client
            .update_tenant_fetcher_config_map_data("100", "200")
            .await
            .unwrap();

        let (last_run, last_resync) = client.get_tenant_fetcher_config_map_data().await.unwrap();

        assert_eq!(last_run, "1");
        assert_eq!(last_resync, "1");
    }
}

//! In-memory checkpoint store for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CheckpointError, KubeClient, INITIAL_TIMESTAMP};

/// Mock checkpoint store keeping the pair in memory.
pub struct MockKubeClient {
    data: RwLock<(String, String)>,
    updates: RwLock<usize>,
    fail_on_get: RwLock<bool>,
    fail_on_update: RwLock<bool>,
}

impl Default for MockKubeClient {
    fn default() -> Self {
        Self::new(INITIAL_TIMESTAMP, INITIAL_TIMESTAMP)
    }
}

impl MockKubeClient {
    pub fn new(last_run: &str, last_resync: &str) -> Self {
        Self {
            data: RwLock::new((last_run.to_string(), last_resync.to_string())),
            updates: RwLock::new(0),
            fail_on_get: RwLock::new(false),
            fail_on_update: RwLock::new(false),
        }
    }

    pub async fn data(&self) -> (String, String) {
        self.data.read().await.clone()
    }

    pub async fn update_count(&self) -> usize {
        *self.updates.read().await
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        *self.fail_on_get.write().await = fail;
    }

    pub async fn set_fail_on_update(&self, fail: bool) {
        *self.fail_on_update.write().await = fail;
    }
}

#[async_trait]
impl KubeClient for MockKubeClient {
    async fn get_tenant_fetcher_config_map_data(&self) -> Result<(String, String), CheckpointError> {
        if *self.fail_on_get.read().await {
            return Err(CheckpointError::Unavailable("Mock get failure".to_string()));
        }
        Ok(self.data.read().await.clone())
    }

    async fn update_tenant_fetcher_config_map_data(
        &self,
        last_run_timestamp: &str,
        last_resync_timestamp: &str,
    ) -> Result<(), CheckpointError> {
        if *self.fail_on_update.read().await {
            return Err(CheckpointError::Unavailable("Mock update failure".to_string()));
        }
        *self.data.write().await = (
            last_run_timestamp.to_string(),
            last_resync_timestamp.to_string(),
        );
        *self.updates.write().await += 1;
        Ok(())
    }
}

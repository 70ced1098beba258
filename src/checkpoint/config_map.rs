//! Checkpoint stored in a Kubernetes ConfigMap.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{
    api::{Api, Patch, PatchParams},
    Client,
};
use serde_json::json;
use tracing::{debug, warn};

use super::{CheckpointError, KubeClient, INITIAL_TIMESTAMP};
use crate::config::KubeConfig;

/// Reads and merge-patches the two checkpoint keys of one ConfigMap.
pub struct ConfigMapKubeClient {
    api: Api<ConfigMap>,
    name: String,
    last_run_field: String,
    last_resync_field: String,
}

impl ConfigMapKubeClient {
    pub fn new(client: Client, config: &KubeConfig) -> Self {
        Self {
            api: Api::namespaced(client, &config.config_map_namespace),
            name: config.config_map_name.clone(),
            last_run_field: config.last_consumed_tenant_timestamp_field.clone(),
            last_resync_field: config.last_full_resync_timestamp_field.clone(),
        }
    }

    /// Connect with the in-cluster or kubeconfig credentials.
    pub async fn from_config(config: &KubeConfig) -> Result<Self, CheckpointError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, config))
    }
}

#[async_trait]
impl KubeClient for ConfigMapKubeClient {
    async fn get_tenant_fetcher_config_map_data(&self) -> Result<(String, String), CheckpointError> {
        let config_map = self.api.get(&self.name).await?;
        let data = config_map
            .data
            .ok_or_else(|| CheckpointError::MissingData(self.name.clone()))?;

        let field = |key: &str| {
            data.get(key).cloned().unwrap_or_else(|| {
                warn!(config_map = %self.name, key, "Checkpoint key missing, starting from the initial timestamp");
                INITIAL_TIMESTAMP.to_string()
            })
        };

        Ok((field(&self.last_run_field), field(&self.last_resync_field)))
    }

    async fn update_tenant_fetcher_config_map_data(
        &self,
        last_run_timestamp: &str,
        last_resync_timestamp: &str,
    ) -> Result<(), CheckpointError> {
        let patch = json!({
            "data": {
                self.last_run_field.as_str(): last_run_timestamp,
                self.last_resync_field.as_str(): last_resync_timestamp,
            }
        });

        self.api
            .patch(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        debug!(config_map = %self.name, last_run_timestamp, last_resync_timestamp, "Checkpoint updated");
        Ok(())
    }
}

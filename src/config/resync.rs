//! Scheduling, checkpoint, storage and write-sink configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Cycle scheduling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResyncConfig {
    /// Pause between synchronization cycles in seconds.
    pub interval_secs: u64,
    /// Interval after which the consumption checkpoint is reset, in seconds.
    pub full_resync_interval_secs: u64,
}

impl ResyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn full_resync_interval(&self) -> Duration {
        Duration::from_secs(self.full_resync_interval_secs)
    }
}

impl Default for ResyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            full_resync_interval_secs: 12 * 60 * 60,
        }
    }
}

/// Checkpoint ConfigMap location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KubeConfig {
    /// When false the checkpoint is not persisted at all.
    pub use_kubernetes: bool,
    pub config_map_namespace: String,
    pub config_map_name: String,
    pub last_consumed_tenant_timestamp_field: String,
    pub last_full_resync_timestamp_field: String,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            use_kubernetes: false,
            config_map_namespace: "compass-system".to_string(),
            config_map_name: "tenant-fetcher-config".to_string(),
            last_consumed_tenant_timestamp_field: "lastConsumedTenantTimestamp".to_string(),
            last_full_resync_timestamp_field: "lastFullResyncTimestamp".to_string(),
        }
    }
}

/// Local tenant store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// sqlx connection string.
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tenant-fetcher.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

/// Where tenant writes are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectorMode {
    /// Director GraphQL mutations over HTTP.
    #[default]
    Graphql,
    /// Write straight into the local tenant store.
    Direct,
}

/// Director GraphQL write sink.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectorConfig {
    pub mode: DirectorMode,
    /// GraphQL endpoint URL.
    pub url: String,
    pub timeout_secs: u64,
    /// Static headers added to every mutation request.
    pub headers: HashMap<String, String>,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            mode: DirectorMode::default(),
            url: "http://127.0.0.1:3000/graphql".to_string(),
            timeout_secs: 30,
            headers: HashMap::new(),
        }
    }
}

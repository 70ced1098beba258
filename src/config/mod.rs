//! Job configuration.
//!
//! A single immutable `JobConfig` is loaded at process start from YAML and
//! environment variables and handed to every component constructor.

mod events;
mod resync;

pub use events::{
    ApiConfig, ApiEndpointsConfig, EventsConfig, MovedSubaccountsFieldMapping, PagingConfig,
    QueryConfig, RetryConfig, TenantFieldMapping, CENTRAL_REGION,
};
pub use resync::{DirectorConfig, DirectorMode, KubeConfig, ResyncConfig, StorageConfig};

use serde::Deserialize;

use crate::model::TenantType;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "tenant-fetcher.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "TENANT_FETCHER_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "TENANT_FETCHER";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "TENANT_FETCHER_LOG";

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Static configuration of one tenant fetcher job.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Job name used in logs and metrics.
    pub job_name: String,
    /// Kind of tenants this job synchronizes.
    pub tenant_type: TenantType,
    /// Provider stamped on every synchronized tenant.
    pub tenant_provider: String,
    /// Prepended to the region of every synchronized tenant.
    pub region_prefix: String,
    pub events: EventsConfig,
    pub resync: ResyncConfig,
    pub kube: KubeConfig,
    pub storage: StorageConfig,
    pub director: DirectorConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: "tenant-fetcher".to_string(),
            tenant_type: TenantType::Account,
            tenant_provider: "external-provider".to_string(),
            region_prefix: String::new(),
            events: EventsConfig::default(),
            resync: ResyncConfig::default(),
            kube: KubeConfig::default(),
            storage: StorageConfig::default(),
            director: DirectorConfig::default(),
        }
    }
}

impl JobConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `tenant-fetcher.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: JobConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations a job cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.tenant_type, TenantType::Account | TenantType::Subaccount) {
            return Err(ConfigError::Invalid(format!(
                "Tenant events for type {} are not supported",
                self.tenant_type
            )));
        }
        if self.events.tenant_operation_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "tenant_operation_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.events.retry.attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry attempts must be greater than zero".to_string(),
            ));
        }
        // The mover holds one connection for its transaction while the
        // direct write sink acquires another.
        if self.director.mode == DirectorMode::Direct && self.storage.max_connections < 2 {
            return Err(ConfigError::Invalid(
                "storage.max_connections must be at least 2 in direct director mode".to_string(),
            ));
        }
        Ok(())
    }

    /// Regions processed per cycle: the regional API names, or the central
    /// region when no regional API is configured.
    pub fn supported_regions(&self) -> Vec<String> {
        if self.events.regions.is_empty() {
            return vec![self.events.central.region_name.clone()];
        }
        // BTreeMap keys are already sorted
        self.events.regions.keys().cloned().collect()
    }
}

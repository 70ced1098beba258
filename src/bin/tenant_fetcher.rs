//! tenant-fetcher: periodic tenant synchronization job
//!
//! Reads tenant lifecycle events from the universal events API and each
//! configured regional API, and applies them to the local tenant store.
//!
//! ## Configuration
//! ```yaml
//! job_name: account-fetcher
//! tenant_type: account
//! tenant_provider: external-provider
//! events:
//!   central:
//!     endpoints:
//!       tenant_created: https://registry.example.com/events?type=GA_CREATED
//!   regions:
//!     eu-1:
//!       endpoints:
//!         tenant_created: https://eu-1.registry.example.com/events?type=GA_CREATED
//! storage:
//!   database_url: sqlite://tenant-fetcher.db?mode=rwc
//! director:
//!   mode: direct
//! ```
//!
//! Every key can be overridden with `TENANT_FETCHER__<SECTION>__<KEY>`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use tenant_fetcher::checkpoint::{KubeClient, NoopKubeClient};
use tenant_fetcher::client::{EventApiClient, HttpEventApiClient};
use tenant_fetcher::config::{DirectorMode, JobConfig};
use tenant_fetcher::director::{DirectorGraphQLClient, GraphQLDirectorClient};
use tenant_fetcher::metrics::MetricsPusher;
use tenant_fetcher::resync::{
    EventSources, SubaccountMover, SynchronizationJob, TenantsManager, TenantsSynchronizer,
};
use tenant_fetcher::storage::{SqliteTenantStore, Transactioner};
use tenant_fetcher::utils::bootstrap::{init_tracing, shutdown_signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = JobConfig::load(config_path.as_deref()).map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        job = %config.job_name,
        tenant_type = %config.tenant_type,
        regions = ?config.supported_regions(),
        "Starting tenant-fetcher"
    );

    let metrics = metrics_pusher(&config);
    let sources = event_sources(&config, &metrics)?;

    let store = SqliteTenantStore::connect(&config.storage).await?;
    let transact: Arc<dyn Transactioner> = Arc::new(store.clone());

    let director: Arc<dyn DirectorGraphQLClient> = match config.director.mode {
        DirectorMode::Graphql => Arc::new(GraphQLDirectorClient::new(
            config.director.url.clone(),
            Duration::from_secs(config.director.timeout_secs),
            config.director.headers.clone(),
        )?),
        DirectorMode::Direct => {
            info!("Writing tenants directly to the local store");
            Arc::new(store)
        }
    };

    let kube_client = kube_client(&config).await?;

    let manager = Arc::new(TenantsManager::new(&config, sources.clone(), director.clone())?);
    let mover = Arc::new(SubaccountMover::new(sources, transact.clone(), director));

    let synchronizer = Arc::new(TenantsSynchronizer::new(
        &config,
        transact,
        manager.clone(),
        mover,
        manager,
        kube_client,
        metrics,
    ));

    SynchronizationJob::new(synchronizer)
        .run_until(shutdown_signal())
        .await;

    info!("tenant-fetcher stopped");
    Ok(())
}

#[cfg(feature = "otel")]
fn metrics_pusher(config: &JobConfig) -> Arc<dyn MetricsPusher> {
    Arc::new(tenant_fetcher::metrics::OtelMetricsPusher::new(config.job_name.clone()))
}

#[cfg(not(feature = "otel"))]
fn metrics_pusher(config: &JobConfig) -> Arc<dyn MetricsPusher> {
    Arc::new(tenant_fetcher::metrics::LoggingMetricsPusher::new(config.job_name.clone()))
}

/// One HTTP client for the universal API and one per configured region.
fn event_sources(
    config: &JobConfig,
    metrics: &Arc<dyn MetricsPusher>,
) -> Result<EventSources, Box<dyn std::error::Error>> {
    let events = &config.events;
    let timeout = Duration::from_secs(events.client_timeout_secs);

    let http_client = |api| {
        HttpEventApiClient::new(
            api,
            events.field_mapping.clone(),
            events.moved_subaccounts_field_mapping.clone(),
            config.tenant_provider.clone(),
            timeout,
            metrics.clone(),
        )
    };

    let universal: Arc<dyn EventApiClient> = Arc::new(http_client(events.central.clone())?);

    let mut regional: HashMap<String, Arc<dyn EventApiClient>> = HashMap::new();
    for (region, api) in &events.regions {
        let mut api = api.clone();
        api.region_name = region.clone();
        regional.insert(region.clone(), Arc::new(http_client(api)?));
    }

    Ok(EventSources::new(universal, regional, events))
}

#[cfg(feature = "k8s")]
async fn kube_client(config: &JobConfig) -> Result<Arc<dyn KubeClient>, Box<dyn std::error::Error>> {
    if !config.kube.use_kubernetes {
        info!("Kubernetes disabled, checkpoint is not persisted");
        return Ok(Arc::new(NoopKubeClient));
    }
    let client = tenant_fetcher::checkpoint::ConfigMapKubeClient::from_config(&config.kube).await?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "k8s"))]
async fn kube_client(config: &JobConfig) -> Result<Arc<dyn KubeClient>, Box<dyn std::error::Error>> {
    if config.kube.use_kubernetes {
        tracing::warn!("Built without the k8s feature, checkpoint is not persisted");
    }
    Ok(Arc::new(NoopKubeClient))
}

//! One synchronization cycle over every supported region.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use super::checkpoint::{convert_time_to_unix_millis, resync_timestamps};
use super::{
    dedupe_tenants, exclude_tenants, tenant_ids, ResyncError, TenantCreator, TenantDeleter,
    TenantMover, WithContext,
};
use crate::checkpoint::KubeClient;
use crate::config::JobConfig;
use crate::metrics::MetricsPusher;
use crate::model::{BusinessTenantMapping, TenantMappingInput, TenantType, TENANT_ON_DEMAND_PROVIDER};
use crate::storage::Transactioner;

/// Synchronizes tenants of one type with the external tenants registry.
///
/// Creates, moves and deletes are applied in that order for each region.
/// A failed cycle leaves the checkpoint untouched so the next cycle sees
/// the same events again.
pub struct TenantsSynchronizer {
    job_name: String,
    tenant_type: TenantType,
    tenant_provider: String,
    region_prefix: String,
    resync_interval: Duration,
    full_resync_interval: Duration,
    supported_regions: Vec<String>,

    transact: Arc<dyn Transactioner>,
    creator: Arc<dyn TenantCreator>,
    mover: Arc<dyn TenantMover>,
    deleter: Arc<dyn TenantDeleter>,
    kube_client: Arc<dyn KubeClient>,
    metrics: Arc<dyn MetricsPusher>,
}

impl TenantsSynchronizer {
    pub fn new(
        config: &JobConfig,
        transact: Arc<dyn Transactioner>,
        creator: Arc<dyn TenantCreator>,
        mover: Arc<dyn TenantMover>,
        deleter: Arc<dyn TenantDeleter>,
        kube_client: Arc<dyn KubeClient>,
        metrics: Arc<dyn MetricsPusher>,
    ) -> Self {
        let supported_regions = config.supported_regions();
        if config.events.regions.is_empty() {
            info!(job = %config.job_name, region = %supported_regions[0], "Job has only one central region");
        }

        Self {
            job_name: config.job_name.clone(),
            tenant_type: config.tenant_type,
            tenant_provider: config.tenant_provider.clone(),
            region_prefix: config.region_prefix.clone(),
            resync_interval: config.resync.interval(),
            full_resync_interval: config.resync.full_resync_interval(),
            supported_regions,
            transact,
            creator,
            mover,
            deleter,
            kube_client,
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.job_name
    }

    pub fn tenant_type(&self) -> TenantType {
        self.tenant_type
    }

    /// Interval between two regular cycles.
    pub fn resync_interval(&self) -> Duration {
        self.resync_interval
    }

    pub fn supported_regions(&self) -> &[String] {
        &self.supported_regions
    }

    /// Run one cycle. A failure is reported to the metrics sink and returned.
    pub async fn synchronize(&self) -> Result<(), ResyncError> {
        let result = self.synchronize_tenants().await;
        if let Err(err) = &result {
            self.metrics.report_failed_sync(err);
        }
        result
    }

    /// Store `tenant_id` if it is not known locally yet.
    ///
    /// The tenant is looked up in every region. When no region knows it, a
    /// placeholder under `parent_tenant_id` is stored instead.
    pub async fn synchronize_tenant(
        &self,
        parent_tenant_id: &str,
        tenant_id: &str,
    ) -> Result<(), ResyncError> {
        let existing = self
            .fetch_from_store(tenant_id)
            .await
            .with_context(|| format!("while checking if tenant with ID {} already exists", tenant_id))?;
        if existing.is_some() {
            info!(tenant = %tenant_id, "Tenant with external ID already exists");
            return Ok(());
        }

        let Some(mut fetched) = self.creator.fetch_tenant(tenant_id).await? else {
            info!(tenant = %tenant_id, "Tenant was not found, it will be stored lazily");
            let lazy = TenantMappingInput {
                name: tenant_id.to_string(),
                external_tenant: tenant_id.to_string(),
                parent: parent_tenant_id.to_string(),
                tenant_type: TenantType::Subaccount,
                provider: TENANT_ON_DEMAND_PROVIDER.to_string(),
                ..Default::default()
            };
            return self.creator.create_tenants(&[lazy]).await;
        };

        let parent_not_found = || {
            ResyncError::ParentNotFound(format!(
                "parent tenant not found of tenant with ID {}",
                tenant_id
            ))
        };
        if fetched.parent.is_empty() {
            return Err(parent_not_found());
        }

        let parent = self
            .fetch_from_store(&fetched.parent)
            .await
            .with_context(|| format!("while checking if parent tenant with ID {} exists", fetched.parent))?
            .ok_or_else(parent_not_found)?;

        fetched.parent = parent.id;
        self.creator.create_tenants(&[fetched]).await
    }

    async fn synchronize_tenants(&self) -> Result<(), ResyncError> {
        let timestamps =
            resync_timestamps(self.kube_client.as_ref(), self.full_resync_interval, Utc::now())
                .await?;
        let from = timestamps.last_consumed_tenant_timestamp.as_str();
        info!(
            job = %self.job_name,
            full_resync = timestamps.full_resync,
            from,
            "Consuming tenant events"
        );

        for region in &self.supported_regions {
            info!(region = %region, "Processing new events for region");

            let to_create = self.creator.tenants_to_create(region, from).await?;
            let to_move = self.mover.tenants_to_move(region, from).await?;
            let to_delete = self.deleter.tenants_to_delete(region, from).await?;

            let to_create = exclude_tenants(dedupe_tenants(to_create), &to_delete);

            let total = to_create.len() + to_move.len() + to_delete.len();
            info!(region = %region, total, "Amount of new events for region");
            if total == 0 {
                info!(region = %region, "No new events for processing, resync completed for region");
                continue;
            }

            let current = if !to_create.is_empty() || !to_delete.is_empty() {
                self.current_tenants(&tenant_ids(to_create.iter().chain(to_delete.iter())))
                    .await?
            } else {
                HashMap::new()
            };

            // Most destructive last
            if !to_create.is_empty() {
                self.create_tenants(&current, to_create, region)
                    .await
                    .context("while creating tenants")?;
            }

            if !to_move.is_empty() {
                self.mover
                    .move_tenants(&to_move)
                    .await
                    .context("while moving tenants")?;
            }

            if !to_delete.is_empty() {
                self.delete_tenants(&current, &to_delete)
                    .await
                    .context("while deleting tenants")?;
            }

            info!(region = %region, "Processed all new events for region");
        }

        self.kube_client
            .update_tenant_fetcher_config_map_data(
                &convert_time_to_unix_millis(timestamps.start_time),
                &timestamps.last_resync_timestamp,
            )
            .await
            .context("while updating checkpoint")
    }

    async fn fetch_from_store(
        &self,
        external_id: &str,
    ) -> Result<Option<BusinessTenantMapping>, ResyncError> {
        let mut tx = self.transact.begin().await?;
        let tenant = tx.get_by_external_id(external_id).await?;
        tx.commit().await?;
        Ok(tenant)
    }

    /// Internal IDs of stored tenants by external ID.
    async fn current_tenants(
        &self,
        external_ids: &[String],
    ) -> Result<HashMap<String, String>, ResyncError> {
        let mut tx = self.transact.begin().await?;
        let tenants = tx
            .list_by_external_ids(external_ids)
            .await
            .context("while listing tenants")?;
        tx.commit().await?;

        Ok(tenants
            .into_iter()
            .map(|t| (t.external_tenant, t.id))
            .collect())
    }

    async fn create_tenants(
        &self,
        current: &HashMap<String, String>,
        tenants: Vec<TenantMappingInput>,
        region: &str,
    ) -> Result<(), ResyncError> {
        let full_region = format!("{}{}", self.region_prefix, region);

        let mut batch = missing_parent_tenants(current, &tenants, &self.tenant_provider, &full_region);
        for mut tenant in tenants {
            if let Some(parent_id) = current.get(&tenant.parent) {
                tenant.parent = parent_id.clone();
            }
            tenant.region = full_region.clone();
            batch.push(tenant);
        }

        self.creator.create_tenants(&batch).await
    }

    async fn delete_tenants(
        &self,
        current: &HashMap<String, String>,
        tenants: &[TenantMappingInput],
    ) -> Result<(), ResyncError> {
        let known: Vec<TenantMappingInput> = tenants
            .iter()
            .filter(|t| current.contains_key(&t.external_tenant))
            .cloned()
            .collect();

        if known.is_empty() {
            return Ok(());
        }
        self.deleter.delete_tenants(&known).await
    }
}

/// Parents referenced by `tenants` that are not stored yet, one level up the hierarchy.
fn missing_parent_tenants(
    current: &HashMap<String, String>,
    tenants: &[TenantMappingInput],
    provider: &str,
    region: &str,
) -> Vec<TenantMappingInput> {
    let parents = tenants
        .iter()
        .filter(|t| !t.parent.is_empty() && !current.contains_key(&t.parent))
        .map(|t| TenantMappingInput {
            name: t.parent.clone(),
            external_tenant: t.parent.clone(),
            parent: String::new(),
            tenant_type: t.tenant_type.parent_type(),
            provider: provider.to_string(),
            region: region.to_string(),
            ..Default::default()
        })
        .collect();

    dedupe_tenants(parents)
}

//! Created, updated and deleted tenants of one tenant type.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::pagination;
use super::sources::EventSources;
use super::{exclude_tenants, ResyncError, TenantCreator, TenantDeleter, WithContext};
use crate::client::EventApiClient;
use crate::config::JobConfig;
use crate::director::DirectorGraphQLClient;
use crate::events::{EventsType, PageConfig, QueryParams};
use crate::model::{TenantConverter, TenantMappingInput, TenantType};
use crate::utils::retry::RetryPolicy;

/// Event types a manager consumes for its tenant type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SupportedEvents {
    created: EventsType,
    updated: EventsType,
    deleted: EventsType,
}

impl SupportedEvents {
    fn for_tenant_type(tenant_type: TenantType) -> Result<Self, ResyncError> {
        match tenant_type {
            TenantType::Account => Ok(Self {
                created: EventsType::CreatedAccount,
                updated: EventsType::UpdatedAccount,
                deleted: EventsType::DeletedAccount,
            }),
            TenantType::Subaccount => Ok(Self {
                created: EventsType::CreatedSubaccount,
                updated: EventsType::UpdatedSubaccount,
                deleted: EventsType::DeletedSubaccount,
            }),
            other => Err(ResyncError::UnsupportedTenantType(other.to_string())),
        }
    }
}

/// Creates, updates and deletes tenants associated with an external tenants registry.
pub struct TenantsManager {
    sources: EventSources,
    director: Arc<dyn DirectorGraphQLClient>,
    converter: TenantConverter,
    supported_events: SupportedEvents,
    chunk_size: usize,
}

impl TenantsManager {
    pub fn new(
        config: &JobConfig,
        sources: EventSources,
        director: Arc<dyn DirectorGraphQLClient>,
    ) -> Result<Self, ResyncError> {
        Ok(Self {
            sources,
            director,
            converter: TenantConverter::new(),
            supported_events: SupportedEvents::for_tenant_type(config.tenant_type)?,
            chunk_size: config.events.tenant_operation_chunk_size.max(1),
        })
    }
}

#[async_trait]
impl TenantCreator for TenantsManager {
    async fn fetch_tenant(
        &self,
        external_tenant_id: &str,
    ) -> Result<Option<TenantMappingInput>, ResyncError> {
        let params = self.sources.entity_params(external_tenant_id);

        let found = fetch_created_tenants_with_retries(
            self.sources.universal.as_ref(),
            &self.sources.retry,
            self.supported_events,
            &params,
            &self.sources.page_config,
        )
        .await?;

        if let Some(tenant) = found.into_iter().next() {
            info!(tenant = %external_tenant_id, "Tenant found from central region with universal client");
            return Ok(Some(tenant));
        }

        info!(tenant = %external_tenant_id, "Tenant not found from central region, checking regional APIs");

        if self.sources.regional.is_empty() {
            error!("No regions are configured");
            return Ok(None);
        }

        let mut lookups = JoinSet::new();
        for (region, client) in &self.sources.regional {
            let region = region.clone();
            let client = Arc::clone(client);
            let retry = self.sources.retry;
            let events = self.supported_events;
            let params = params.clone();
            let page_config = self.sources.page_config.clone();
            lookups.spawn(async move {
                let result = fetch_created_tenants_with_retries(
                    client.as_ref(),
                    &retry,
                    events,
                    &params,
                    &page_config,
                )
                .await;
                (region, result)
            });
        }

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((region, Ok(tenants))) => match tenants.into_iter().next() {
                    Some(tenant) => {
                        info!(region = %region, tenant = %external_tenant_id, "Tenant found in region");
                        lookups.abort_all();
                        return Ok(Some(tenant));
                    }
                    None => warn!(region = %region, tenant = %external_tenant_id, "Tenant not found in region"),
                },
                Ok((region, Err(err))) => {
                    error!(region = %region, error = %err, "Failed to fetch created tenants from region");
                }
                Err(err) => error!(error = %err, "Regional tenant lookup did not complete"),
            }
        }

        error!(tenant = %external_tenant_id, "Tenant not found in all configured regions");
        Ok(None)
    }

    /// Created tenants followed by the updated ones that were not also created.
    async fn tenants_to_create(
        &self,
        region: &str,
        from_timestamp: &str,
    ) -> Result<Vec<TenantMappingInput>, ResyncError> {
        let mut created = self
            .sources
            .fetch_tenants(region, from_timestamp, self.supported_events.created)
            .await
            .with_context(|| format!("while fetching created tenants for region {}", region))?;

        let updated = self
            .sources
            .fetch_tenants(region, from_timestamp, self.supported_events.updated)
            .await
            .with_context(|| format!("while fetching updated tenants for region {}", region))?;

        let updated = exclude_tenants(updated, &created);
        created.extend(updated);
        Ok(created)
    }

    async fn create_tenants(&self, tenants: &[TenantMappingInput]) -> Result<(), ResyncError> {
        let inputs = self.converter.multiple_to_graphql_input(tenants);
        for chunk in inputs.chunks(self.chunk_size) {
            self.director.write_tenants(chunk).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TenantDeleter for TenantsManager {
    async fn tenants_to_delete(
        &self,
        region: &str,
        from_timestamp: &str,
    ) -> Result<Vec<TenantMappingInput>, ResyncError> {
        self.sources
            .fetch_tenants(region, from_timestamp, self.supported_events.deleted)
            .await
            .with_context(|| format!("while fetching deleted tenants for region {}", region))
    }

    async fn delete_tenants(&self, tenants: &[TenantMappingInput]) -> Result<(), ResyncError> {
        let inputs = self.converter.multiple_to_graphql_input(tenants);
        for chunk in inputs.chunks(self.chunk_size) {
            self.director.delete_tenants(chunk).await?;
        }
        Ok(())
    }
}

/// Created tenants, then updated tenants not also created, from one API.
async fn fetch_created_tenants_with_retries(
    client: &dyn EventApiClient,
    retry: &RetryPolicy,
    events: SupportedEvents,
    params: &QueryParams,
    page_config: &PageConfig,
) -> Result<Vec<TenantMappingInput>, ResyncError> {
    let mut created =
        pagination::fetch_tenants_with_retries(client, retry, events.created, params, page_config)
            .await
            .context("while fetching created tenants")?;

    let updated =
        pagination::fetch_tenants_with_retries(client, retry, events.updated, params, page_config)
            .await
            .context("while fetching updated tenants")?;

    let updated = exclude_tenants(updated, &created);
    created.extend(updated);
    Ok(created)
}

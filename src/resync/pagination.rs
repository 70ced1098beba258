//! Paginated walks over an events API.

use tracing::debug;

use super::{ResyncError, WithContext};
use crate::client::EventApiClient;
use crate::events::{EventsPage, EventsType, PageConfig, QueryParams};
use crate::model::{MovedSubaccountMappingInput, TenantMappingInput};
use crate::utils::retry::RetryPolicy;

/// Apply `apply` to every page of `events_type`, starting at the page number
/// in `params`.
///
/// A missing first page means the endpoint has nothing to offer and is not an
/// error. Every later page must exist and report the same total results count
/// as the first one.
pub async fn walk_through_pages<F>(
    client: &dyn EventApiClient,
    events_type: EventsType,
    mut params: QueryParams,
    page_config: &PageConfig,
    mut apply: F,
) -> Result<(), ResyncError>
where
    F: FnMut(&EventsPage) -> Result<(), ResyncError> + Send,
{
    let first_page = client
        .fetch_tenant_events_page(events_type, &params)
        .await
        .context("while fetching tenant events page")?;
    let Some(first_page) = first_page else {
        debug!(events_type = %events_type, "No events page returned");
        return Ok(());
    };

    apply(&first_page).context("while applying function on events page")?;

    let initial_count = first_page.int_field(&page_config.total_results_field);
    let total_pages = first_page.int_field(&page_config.total_pages_field);

    let raw_start = params
        .get(&page_config.page_num_field)
        .cloned()
        .unwrap_or_default();
    let page_start: i64 = raw_start.parse().map_err(|e| {
        ResyncError::Internal(format!(
            "invalid value {:?} of page parameter {}: {}",
            raw_start, page_config.page_num_field, e
        ))
    })?;

    for page_num in (page_start + 1)..=total_pages {
        params.insert(page_config.page_num_field.clone(), page_num.to_string());

        let page = client
            .fetch_tenant_events_page(events_type, &params)
            .await
            .context("while fetching tenant events page")?
            .ok_or_else(|| {
                ResyncError::Internal("next page was expected but response was empty".to_string())
            })?;

        if page.int_field(&page_config.total_results_field) != initial_count {
            return Err(ResyncError::Internal(
                "total results number changed during fetching consecutive events pages".to_string(),
            ));
        }

        apply(&page)?;
    }

    Ok(())
}

/// Collect the items of every page, retrying the whole walk on failure.
pub async fn fetch_with_retries<T, F>(
    client: &dyn EventApiClient,
    retry: &RetryPolicy,
    events_type: EventsType,
    params: &QueryParams,
    page_config: &PageConfig,
    extract: F,
) -> Result<Vec<T>, ResyncError>
where
    T: Send,
    F: Fn(&EventsPage) -> Vec<T> + Sync,
{
    let extract = &extract;
    retry
        .run(events_type.as_str(), || async move {
            let mut items = Vec::new();
            walk_through_pages(client, events_type, params.clone(), page_config, |page| {
                items.extend(extract(page));
                Ok(())
            })
            .await
            .context("while walking through pages")?;
            Ok::<_, ResyncError>(items)
        })
        .await
}

pub async fn fetch_tenants_with_retries(
    client: &dyn EventApiClient,
    retry: &RetryPolicy,
    events_type: EventsType,
    params: &QueryParams,
    page_config: &PageConfig,
) -> Result<Vec<TenantMappingInput>, ResyncError> {
    fetch_with_retries(client, retry, events_type, params, page_config, |page| {
        page.tenant_mappings(events_type)
    })
    .await
    .context("while fetching tenants")
}

pub async fn fetch_moved_subaccounts_with_retries(
    client: &dyn EventApiClient,
    retry: &RetryPolicy,
    params: &QueryParams,
    page_config: &PageConfig,
) -> Result<Vec<MovedSubaccountMappingInput>, ResyncError> {
    fetch_with_retries(
        client,
        retry,
        EventsType::MovedSubaccount,
        params,
        page_config,
        EventsPage::moved_subaccounts,
    )
    .await
    .context("while fetching moved subaccounts")
}

//! Universal and regional events APIs queried together.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use super::pagination;
use super::{ResyncError, WithContext};
use crate::client::EventApiClient;
use crate::config::{EventsConfig, QueryConfig};
use crate::events::{EventsType, PageConfig, QueryParams};
use crate::model::{MovedSubaccountMappingInput, TenantMappingInput};
use crate::utils::retry::RetryPolicy;

/// The universal events API plus the optional per-region ones.
///
/// The universal API is filtered by region through a query parameter,
/// regional APIs only serve their own region.
#[derive(Clone)]
pub struct EventSources {
    pub(super) universal: Arc<dyn EventApiClient>,
    pub(super) regional: HashMap<String, Arc<dyn EventApiClient>>,
    pub(super) query: QueryConfig,
    pub(super) page_config: PageConfig,
    pub(super) retry: RetryPolicy,
}

impl EventSources {
    pub fn new(
        universal: Arc<dyn EventApiClient>,
        regional: HashMap<String, Arc<dyn EventApiClient>>,
        config: &EventsConfig,
    ) -> Self {
        Self {
            universal,
            regional,
            query: config.query.clone(),
            page_config: PageConfig::from_config(&config.query, &config.paging),
            retry: RetryPolicy::from(&config.retry),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Paging parameters plus `additional`.
    pub(super) fn params<I>(&self, additional: I) -> QueryParams
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = QueryParams::from([
            (self.query.page_num_field.clone(), self.query.page_start_value.clone()),
            (self.query.page_size_field.clone(), self.query.page_size_value.clone()),
        ]);
        params.extend(additional);
        params
    }

    /// Parameters for the universal API, filtered by region when both the
    /// region and its query field are known.
    pub(super) fn universal_params(&self, from_timestamp: &str, region: &str) -> QueryParams {
        let mut params =
            self.params([(self.query.timestamp_field.clone(), from_timestamp.to_string())]);
        if !region.is_empty() && !self.query.region_field.is_empty() {
            params.insert(self.query.region_field.clone(), region.to_string());
        }
        params
    }

    pub(super) fn regional_params(&self, from_timestamp: &str) -> QueryParams {
        self.params([(self.query.timestamp_field.clone(), from_timestamp.to_string())])
    }

    pub(super) fn entity_params(&self, external_tenant_id: &str) -> QueryParams {
        self.params([(self.query.entity_field.clone(), external_tenant_id.to_string())])
    }

    /// Tenants of `events_type` for `region` from the universal API and, if
    /// one is registered, the regional API.
    pub(super) async fn fetch_tenants(
        &self,
        region: &str,
        from_timestamp: &str,
        events_type: EventsType,
    ) -> Result<Vec<TenantMappingInput>, ResyncError> {
        let universal = pagination::fetch_tenants_with_retries(
            self.universal.as_ref(),
            &self.retry,
            events_type,
            &self.universal_params(from_timestamp, region),
            &self.page_config,
        )
        .await
        .context("while fetching tenants with universal client")?;

        let Some(client) = self.regional.get(region) else {
            info!(region, "Region does not have local events client enabled");
            return Ok(universal);
        };

        let regional = pagination::fetch_tenants_with_retries(
            client.as_ref(),
            &self.retry,
            events_type,
            &self.regional_params(from_timestamp),
            &self.page_config,
        )
        .await?;

        Ok(merge_regional(universal, regional, |t| &t.external_tenant))
    }

    pub(super) async fn fetch_moved_subaccounts(
        &self,
        region: &str,
        from_timestamp: &str,
    ) -> Result<Vec<MovedSubaccountMappingInput>, ResyncError> {
        let universal = pagination::fetch_moved_subaccounts_with_retries(
            self.universal.as_ref(),
            &self.retry,
            &self.universal_params(from_timestamp, region),
            &self.page_config,
        )
        .await
        .context("while fetching moved subaccounts with universal client")?;

        let Some(client) = self.regional.get(region) else {
            info!(region, "Region does not have local events client enabled");
            return Ok(universal);
        };

        let regional = pagination::fetch_moved_subaccounts_with_retries(
            client.as_ref(),
            &self.retry,
            &self.regional_params(from_timestamp),
            &self.page_config,
        )
        .await?;

        Ok(merge_regional(universal, regional, |m| &m.subaccount_id))
    }
}

/// Append the regional items whose key is not already present in `universal`.
pub(super) fn merge_regional<T, K>(mut universal: Vec<T>, regional: Vec<T>, key: K) -> Vec<T>
where
    K: Fn(&T) -> &String,
{
    let known: HashSet<String> = universal.iter().map(|item| key(item).clone()).collect();
    universal.extend(regional.into_iter().filter(|item| !known.contains(key(item))));
    universal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockEventApiClient;

    fn sources(regional: HashMap<String, Arc<dyn EventApiClient>>) -> EventSources {
        EventSources::new(
            Arc::new(MockEventApiClient::new()),
            regional,
            &EventsConfig::default(),
        )
    }

    #[test]
    fn test_universal_params_carry_region() {
        let sources = sources(HashMap::new());

        let params = sources.universal_params("1000", "eu-1");

        assert_eq!(params["pageNum"], "1");
        assert_eq!(params["pageSize"], "150");
        assert_eq!(params["timestamp"], "1000");
        assert_eq!(params["region"], "eu-1");
    }

    #[test]
    fn test_regional_params_omit_region() {
        let sources = sources(HashMap::new());

        let params = sources.regional_params("1000");

        assert_eq!(params.len(), 3);
        assert!(!params.contains_key("region"));
    }

    #[test]
    fn test_universal_params_without_region_field() {
        let mut sources = sources(HashMap::new());
        sources.query.region_field = String::new();

        let params = sources.universal_params("1000", "eu-1");

        assert!(!params.contains_key("region"));
    }

    #[test]
    fn test_entity_params() {
        let params = sources(HashMap::new()).entity_params("ga-1");

        assert_eq!(params["entityId"], "ga-1");
        assert!(!params.contains_key("timestamp"));
    }

    #[test]
    fn test_merge_prefers_universal() {
        let universal = vec![("a".to_string(), 1), ("b".to_string(), 1)];
        let regional = vec![("b".to_string(), 2), ("c".to_string(), 2)];

        let merged = merge_regional(universal, regional, |item| &item.0);

        assert_eq!(
            merged,
            vec![("a".to_string(), 1), ("b".to_string(), 1), ("c".to_string(), 2)]
        );
    }
}

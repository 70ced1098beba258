//! Scripted events API client for testing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ClientError, EventApiClient};
use crate::config::{MovedSubaccountsFieldMapping, QueryConfig, TenantFieldMapping};
use crate::events::{EventsPage, EventsType, QueryParams};

/// Mock events API serving scripted pages.
///
/// Pages are served by the value of the page number parameter, so page `n`
/// of a type is the `n`th payload added for it. A type without pages, or a
/// page number past the last payload, yields `None`.
pub struct MockEventApiClient {
    field_mapping: TenantFieldMapping,
    moved_subaccounts_field_mapping: MovedSubaccountsFieldMapping,
    provider_name: String,
    page_num_field: String,
    pages: RwLock<HashMap<EventsType, Vec<Value>>>,
    failures_remaining: RwLock<HashMap<EventsType, usize>>,
    page_failures: RwLock<HashMap<(EventsType, usize), usize>>,
    delay: RwLock<Option<Duration>>,
    calls: RwLock<Vec<(EventsType, QueryParams)>>,
}

impl Default for MockEventApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEventApiClient {
    pub fn new() -> Self {
        Self {
            field_mapping: TenantFieldMapping::default(),
            moved_subaccounts_field_mapping: MovedSubaccountsFieldMapping::default(),
            provider_name: "test-provider".to_string(),
            page_num_field: QueryConfig::default().page_num_field,
            pages: RwLock::new(HashMap::new()),
            failures_remaining: RwLock::new(HashMap::new()),
            page_failures: RwLock::new(HashMap::new()),
            delay: RwLock::new(None),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn with_provider(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = provider_name.into();
        self
    }

    /// Append the next page for `events_type`.
    pub async fn add_page(&self, events_type: EventsType, payload: Value) {
        self.pages
            .write()
            .await
            .entry(events_type)
            .or_default()
            .push(payload);
    }

    /// Fail the next `count` requests for `events_type`.
    pub async fn fail_next(&self, events_type: EventsType, count: usize) {
        self.failures_remaining
            .write()
            .await
            .insert(events_type, count);
    }

    /// Fail the next `count` requests for page `page` of `events_type`.
    pub async fn fail_page(&self, events_type: EventsType, page: usize, count: usize) {
        self.page_failures
            .write()
            .await
            .insert((events_type, page), count);
    }

    /// Delay every response.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub async fn calls(&self) -> Vec<(EventsType, QueryParams)> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self, events_type: EventsType) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|(t, _)| *t == events_type)
            .count()
    }
}

#[async_trait]
impl EventApiClient for MockEventApiClient {
    async fn fetch_tenant_events_page(
        &self,
        events_type: EventsType,
        params: &QueryParams,
    ) -> Result<Option<EventsPage>, ClientError> {
        self.calls.write().await.push((events_type, params.clone()));

        if let Some(delay) = *self.delay.read().await {
            tokio::time::sleep(delay).await;
        }

        if let Some(remaining) = self.failures_remaining.write().await.get_mut(&events_type) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClientError::Unavailable(format!(
                    "Mock failure for {}",
                    events_type
                )));
            }
        }

        let page_num = params
            .get(&self.page_num_field)
            .and_then(|p| p.parse::<usize>().ok())
            .unwrap_or(1);

        if let Some(remaining) = self.page_failures.write().await.get_mut(&(events_type, page_num)) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClientError::Unavailable(format!(
                    "Mock failure for {} page {}",
                    events_type, page_num
                )));
            }
        }

        let pages = self.pages.read().await;
        let payload = pages
            .get(&events_type)
            .and_then(|pages| pages.get(page_num.saturating_sub(1)))
            .cloned();

        Ok(payload.map(|payload| {
            EventsPage::new(
                self.field_mapping.clone(),
                self.moved_subaccounts_field_mapping.clone(),
                self.provider_name.clone(),
                payload,
            )
        }))
    }
}

//! reqwest-backed events API client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::{ClientError, EventApiClient};
use crate::config::{ApiConfig, MovedSubaccountsFieldMapping, TenantFieldMapping};
use crate::events::{EventsPage, EventsType, QueryParams};
use crate::metrics::MetricsPusher;

/// Events API client for one registry.
pub struct HttpEventApiClient {
    client: Client,
    api: ApiConfig,
    field_mapping: TenantFieldMapping,
    moved_subaccounts_field_mapping: MovedSubaccountsFieldMapping,
    provider_name: String,
    metrics: Arc<dyn MetricsPusher>,
}

impl HttpEventApiClient {
    pub fn new(
        api: ApiConfig,
        field_mapping: TenantFieldMapping,
        moved_subaccounts_field_mapping: MovedSubaccountsFieldMapping,
        provider_name: impl Into<String>,
        timeout: Duration,
        metrics: Arc<dyn MetricsPusher>,
    ) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api,
            field_mapping,
            moved_subaccounts_field_mapping,
            provider_name: provider_name.into(),
            metrics,
        })
    }

    fn headers(&self) -> &HashMap<String, String> {
        &self.api.headers
    }
}

#[async_trait]
impl EventApiClient for HttpEventApiClient {
    async fn fetch_tenant_events_page(
        &self,
        events_type: EventsType,
        params: &QueryParams,
    ) -> Result<Option<EventsPage>, ClientError> {
        let endpoint = events_type.endpoint(&self.api.endpoints);
        if endpoint.is_empty() {
            debug!(region = %self.api.region_name, events_type = %events_type, "Endpoint not assigned, skipping");
            return Ok(None);
        }

        let url = Url::parse_with_params(endpoint, params.iter())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        let mut request = self.client.get(url.clone());
        for (name, value) in self.headers() {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        self.metrics
            .record_eventing_request("GET", status.as_u16(), url.path());

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(ClientError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let payload =
            serde_json::from_str(&body).map_err(|e| ClientError::InvalidBody(e.to_string()))?;

        Ok(Some(EventsPage::new(
            self.field_mapping.clone(),
            self.moved_subaccounts_field_mapping.clone(),
            self.provider_name.clone(),
            payload,
        )))
    }
}

//! Tenant Events API configuration types.
//!
//! Field names are fully configurable because every registry shapes its
//! pages differently; the defaults match the central registry.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// Name of the synthetic region used when no regional APIs are configured.
pub const CENTRAL_REGION: &str = "central";

/// Events API configuration shared by the central and regional clients.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Query parameter names and values.
    pub query: QueryConfig,
    /// Page body field names used for pagination.
    pub paging: PagingConfig,
    /// Event-to-tenant field mapping.
    pub field_mapping: TenantFieldMapping,
    /// Moved-subaccount event field mapping.
    pub moved_subaccounts_field_mapping: MovedSubaccountsFieldMapping,
    /// Central ("universal") registry.
    pub central: ApiConfig,
    /// Per-region registries keyed by region name.
    pub regions: BTreeMap<String, ApiConfig>,
    /// Maximum tenants per Director write request.
    pub tenant_operation_chunk_size: usize,
    /// Retry behavior for a complete paginated fetch.
    pub retry: RetryConfig,
    /// Per-request HTTP timeout in seconds.
    pub client_timeout_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            paging: PagingConfig::default(),
            field_mapping: TenantFieldMapping::default(),
            moved_subaccounts_field_mapping: MovedSubaccountsFieldMapping::default(),
            central: ApiConfig::default(),
            regions: BTreeMap::new(),
            tenant_operation_chunk_size: 500,
            retry: RetryConfig::default(),
            client_timeout_secs: 60,
        }
    }
}

/// Query parameter names and their static values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub page_num_field: String,
    pub page_size_field: String,
    pub timestamp_field: String,
    /// Region filter parameter; empty disables region filtering.
    pub region_field: String,
    /// Parameter used for single-entity lookups.
    pub entity_field: String,
    pub page_start_value: String,
    pub page_size_value: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_num_field: "pageNum".to_string(),
            page_size_field: "pageSize".to_string(),
            timestamp_field: "timestamp".to_string(),
            region_field: "region".to_string(),
            entity_field: "entityId".to_string(),
            page_start_value: "1".to_string(),
            page_size_value: "150".to_string(),
        }
    }
}

/// Field names in the page body that drive pagination.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub total_pages_field: String,
    pub total_results_field: String,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            total_pages_field: "totalPages".to_string(),
            total_results_field: "totalResults".to_string(),
        }
    }
}

/// Mapping of event fields to tenant attributes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenantFieldMapping {
    /// Path of the events array in the page body.
    pub events_field: String,
    /// Field of each event holding the tenant details object.
    pub details_field: String,
    pub name_field: String,
    pub id_field: String,
    pub global_account_guid_field: String,
    pub subaccount_id_field: String,
    pub customer_id_field: String,
    pub subdomain_field: String,
    pub region_field: String,
    pub entity_type_field: String,
    pub license_type_field: String,
    pub labels_field: String,
    /// Key under which the event's global account GUID is merged into the details.
    pub global_account_key: String,
    /// Optional discriminator applied to account creation events.
    pub discriminator_field: String,
    pub discriminator_value: String,
}

impl Default for TenantFieldMapping {
    fn default() -> Self {
        Self {
            events_field: "events".to_string(),
            details_field: "details".to_string(),
            name_field: "name".to_string(),
            id_field: "id".to_string(),
            global_account_guid_field: "globalAccountGUID".to_string(),
            subaccount_id_field: "subaccountId".to_string(),
            customer_id_field: "customerId".to_string(),
            subdomain_field: "subdomain".to_string(),
            region_field: "region".to_string(),
            entity_type_field: "entityType".to_string(),
            license_type_field: "licenseType".to_string(),
            labels_field: "labels".to_string(),
            global_account_key: "gaID".to_string(),
            discriminator_field: String::new(),
            discriminator_value: String::new(),
        }
    }
}

/// Mapping of moved-subaccount event fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovedSubaccountsFieldMapping {
    pub subaccount_id: String,
    pub source_tenant: String,
    pub target_tenant: String,
}

impl Default for MovedSubaccountsFieldMapping {
    fn default() -> Self {
        Self {
            subaccount_id: "subaccountId".to_string(),
            source_tenant: "sourceGlobalAccountGUID".to_string(),
            target_tenant: "targetGlobalAccountGUID".to_string(),
        }
    }
}

/// One registry instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub region_name: String,
    pub endpoints: ApiEndpointsConfig,
    /// Static headers added to every request.
    pub headers: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            region_name: CENTRAL_REGION.to_string(),
            endpoints: ApiEndpointsConfig::default(),
            headers: HashMap::new(),
        }
    }
}

/// Endpoint per event type. An empty endpoint is not assigned.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiEndpointsConfig {
    pub tenant_created: String,
    pub tenant_deleted: String,
    pub tenant_updated: String,
    pub subaccount_created: String,
    pub subaccount_deleted: String,
    pub subaccount_updated: String,
    pub subaccount_moved: String,
}

/// Retry configuration for event fetches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub attempts: usize,
    /// Fixed delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 7,
            delay_ms: 100,
        }
    }
}

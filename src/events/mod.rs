//! Tenant events: event types, the pagination contract and page parsing.

pub mod json;
mod page;

pub use page::EventsPage;

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{ApiEndpointsConfig, PagingConfig, QueryConfig};

/// Query parameters of one events request. Keys iterate in sorted order.
pub type QueryParams = BTreeMap<String, String>;

/// Kind of tenant event; selects the endpoint and the page mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventsType {
    CreatedAccount,
    DeletedAccount,
    UpdatedAccount,
    CreatedSubaccount,
    DeletedSubaccount,
    UpdatedSubaccount,
    MovedSubaccount,
}

impl EventsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventsType::CreatedAccount => "CreatedAccount",
            EventsType::DeletedAccount => "DeletedAccount",
            EventsType::UpdatedAccount => "UpdatedAccount",
            EventsType::CreatedSubaccount => "CreatedSubaccount",
            EventsType::DeletedSubaccount => "DeletedSubaccount",
            EventsType::UpdatedSubaccount => "UpdatedSubaccount",
            EventsType::MovedSubaccount => "MovedSubaccount",
        }
    }

    /// Endpoint configured for this event type; empty when not assigned.
    pub fn endpoint<'a>(&self, endpoints: &'a ApiEndpointsConfig) -> &'a str {
        match self {
            EventsType::CreatedAccount => &endpoints.tenant_created,
            EventsType::DeletedAccount => &endpoints.tenant_deleted,
            EventsType::UpdatedAccount => &endpoints.tenant_updated,
            EventsType::CreatedSubaccount => &endpoints.subaccount_created,
            EventsType::DeletedSubaccount => &endpoints.subaccount_deleted,
            EventsType::UpdatedSubaccount => &endpoints.subaccount_updated,
            EventsType::MovedSubaccount => &endpoints.subaccount_moved,
        }
    }
}

impl fmt::Display for EventsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field names the pagination walk reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageConfig {
    pub total_pages_field: String,
    pub total_results_field: String,
    /// Query parameter carrying the page number.
    pub page_num_field: String,
}

impl PageConfig {
    pub fn from_config(query: &QueryConfig, paging: &PagingConfig) -> Self {
        Self {
            total_pages_field: paging.total_pages_field.clone(),
            total_results_field: paging.total_results_field.clone(),
            page_num_field: query.page_num_field.clone(),
        }
    }
}

/// Failure to convert a single event. Logged by the page parser, never fatal
/// to the page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid json payload")]
    InvalidJson,

    #[error("invalid format of {0} field")]
    InvalidFieldFormat(String),

    #[error("Missing or invalid format of the ID field")]
    MissingId,
}

//! Tenant Events API clients.
//!
//! One client instance per registry: the central ("universal") one plus one
//! per configured region.

mod http;
pub mod mock;

pub use http::HttpEventApiClient;
pub use mock::MockEventApiClient;

use async_trait::async_trait;

use crate::events::{EventsPage, EventsType, QueryParams};

/// Errors from an events API request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid events endpoint {0}")]
    InvalidUrl(String),

    #[error("while sending get request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("request to \"{url}\" returned status code {status} and body \"{body}\"")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("while decoding events page: {0}")]
    InvalidBody(String),

    #[error("events api unavailable: {0}")]
    Unavailable(String),
}

/// Fetches one page of tenant events.
#[async_trait]
pub trait EventApiClient: Send + Sync {
    /// Fetch the page selected by `params` for `events_type`.
    ///
    /// `Ok(None)` means there is nothing to read: the endpoint for the type
    /// is not assigned or the registry answered 204 No Content.
    async fn fetch_tenant_events_page(
        &self,
        events_type: EventsType,
        params: &QueryParams,
    ) -> Result<Option<EventsPage>, ClientError>;
}

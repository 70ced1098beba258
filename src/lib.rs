//! Tenant Fetcher - tenant synchronization with an external tenants registry.
//!
//! Consumes tenant lifecycle events (created, updated, deleted, moved) from
//! a universal events API and optional regional ones, and applies them to a
//! local tenant store through a GraphQL write sink.

pub mod checkpoint;
pub mod client;
pub mod config;
pub mod director;
pub mod events;
pub mod metrics;
pub mod model;
pub mod resync;
pub mod storage;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod utils;

//! Write sink for synchronized tenants.
//!
//! Tenants are written through Director GraphQL mutations. The SQLite
//! tenant store implements the same trait for direct mode.

mod graphql;
pub mod mock;

pub use graphql::GraphQLDirectorClient;
pub use mock::RecordingDirectorClient;

use async_trait::async_trait;

use crate::model::GraphQLTenantInput;

/// Errors from the write sink.
#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error("while sending graphql request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("director returned status code {status} and body \"{body}\"")]
    UnexpectedStatus { status: u16, body: String },

    #[error("graphql errors: {0}")]
    GraphQL(String),

    #[error("tenant store write failed: {0}")]
    Store(String),

    #[error("director unavailable: {0}")]
    Unavailable(String),
}

/// Tenant mutations used by the synchronizer.
#[async_trait]
pub trait DirectorGraphQLClient: Send + Sync {
    /// Create or update tenants, matched by external tenant ID.
    async fn write_tenants(&self, tenants: &[GraphQLTenantInput]) -> Result<(), DirectorError>;

    /// Delete tenants, matched by external tenant ID.
    async fn delete_tenants(&self, tenants: &[GraphQLTenantInput]) -> Result<(), DirectorError>;

    /// Update the tenant with internal ID `id`.
    async fn update_tenant(&self, id: &str, tenant: &GraphQLTenantInput)
        -> Result<(), DirectorError>;
}

//! Read side of the local tenant store.
//!
//! The synchronizer opens short transactions to look up existing tenants and
//! to check formation membership before moving subaccounts. Writes go through
//! the `director` write sink.

pub mod mock;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use mock::MockTenantStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTenantStore;

use async_trait::async_trait;

use crate::model::BusinessTenantMapping;

/// Errors from tenant storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "sqlite")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Transaction already finished")]
    TransactionClosed,

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Opens tenant store transactions.
#[async_trait]
pub trait Transactioner: Send + Sync {
    /// Begin a transaction. Dropping it without `commit` rolls it back.
    async fn begin(&self) -> Result<Box<dyn TenantTransaction>>;
}

/// Reads performed inside one transaction.
#[async_trait]
pub trait TenantTransaction: Send {
    /// Stored tenants whose external ID is in `external_ids`. Unknown IDs are
    /// simply absent from the result.
    async fn list_by_external_ids(
        &mut self,
        external_ids: &[String],
    ) -> Result<Vec<BusinessTenantMapping>>;

    /// Stored tenant with the given external ID.
    async fn get_by_external_id(&mut self, external_id: &str)
        -> Result<Option<BusinessTenantMapping>>;

    /// IDs of runtimes scoped to the tenant with internal ID `tenant_id`.
    async fn list_runtimes(&mut self, tenant_id: &str) -> Result<Vec<String>>;

    /// Scenario label values of each runtime as seen from `tenant_id`.
    ///
    /// One entry per runtime that carries a scenarios label.
    async fn scenario_labels_for_runtimes(
        &mut self,
        tenant_id: &str,
        runtime_ids: &[String],
    ) -> Result<Vec<Vec<String>>>;

    async fn commit(&mut self) -> Result<()>;
}

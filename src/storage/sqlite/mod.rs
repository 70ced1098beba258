//! SQLite tenant store.

mod tenant_store;

pub use tenant_store::SqliteTenantStore;

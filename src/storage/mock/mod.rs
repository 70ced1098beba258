//! In-memory tenant store for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Result, StorageError, TenantTransaction, Transactioner};
use crate::model::BusinessTenantMapping;

#[derive(Default)]
struct MockState {
    tenants: Vec<BusinessTenantMapping>,
    runtimes: HashMap<String, Vec<String>>,
    scenarios: HashMap<(String, String), Vec<String>>,
    begun: usize,
    committed: usize,
    fail_on_begin: bool,
    fail_on_commit: bool,
    fail_on_read: bool,
}

/// Mock tenant store holding tenants, runtimes and scenario labels in memory.
#[derive(Default, Clone)]
pub struct MockTenantStore {
    state: Arc<RwLock<MockState>>,
}

impl MockTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_tenant(&self, tenant: BusinessTenantMapping) {
        self.state.write().await.tenants.push(tenant);
    }

    /// Scope a runtime to the tenant with internal ID `tenant_id`.
    pub async fn add_runtime(&self, tenant_id: &str, runtime_id: &str) {
        self.state
            .write()
            .await
            .runtimes
            .entry(tenant_id.to_string())
            .or_default()
            .push(runtime_id.to_string());
    }

    /// Scenarios label of a runtime as seen from `tenant_id`.
    pub async fn set_scenarios(&self, tenant_id: &str, runtime_id: &str, scenarios: &[&str]) {
        self.state.write().await.scenarios.insert(
            (tenant_id.to_string(), runtime_id.to_string()),
            scenarios.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub async fn set_fail_on_begin(&self, fail: bool) {
        self.state.write().await.fail_on_begin = fail;
    }

    pub async fn set_fail_on_commit(&self, fail: bool) {
        self.state.write().await.fail_on_commit = fail;
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        self.state.write().await.fail_on_read = fail;
    }

    pub async fn begun_count(&self) -> usize {
        self.state.read().await.begun
    }

    pub async fn committed_count(&self) -> usize {
        self.state.read().await.committed
    }
}

#[async_trait]
impl Transactioner for MockTenantStore {
    async fn begin(&self) -> Result<Box<dyn TenantTransaction>> {
        let mut state = self.state.write().await;
        if state.fail_on_begin {
            return Err(StorageError::Unavailable("Mock begin failure".to_string()));
        }
        state.begun += 1;
        Ok(Box::new(MockTransaction {
            state: Arc::clone(&self.state),
            finished: false,
        }))
    }
}

struct MockTransaction {
    state: Arc<RwLock<MockState>>,
    finished: bool,
}

impl MockTransaction {
    async fn check_read(&self) -> Result<()> {
        if self.finished {
            return Err(StorageError::TransactionClosed);
        }
        if self.state.read().await.fail_on_read {
            return Err(StorageError::Unavailable("Mock read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TenantTransaction for MockTransaction {
    async fn list_by_external_ids(
        &mut self,
        external_ids: &[String],
    ) -> Result<Vec<BusinessTenantMapping>> {
        self.check_read().await?;
        Ok(self
            .state
            .read()
            .await
            .tenants
            .iter()
            .filter(|t| external_ids.contains(&t.external_tenant))
            .cloned()
            .collect())
    }

    async fn get_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<BusinessTenantMapping>> {
        self.check_read().await?;
        Ok(self
            .state
            .read()
            .await
            .tenants
            .iter()
            .find(|t| t.external_tenant == external_id)
            .cloned())
    }

    async fn list_runtimes(&mut self, tenant_id: &str) -> Result<Vec<String>> {
        self.check_read().await?;
        Ok(self
            .state
            .read()
            .await
            .runtimes
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn scenario_labels_for_runtimes(
        &mut self,
        tenant_id: &str,
        runtime_ids: &[String],
    ) -> Result<Vec<Vec<String>>> {
        self.check_read().await?;
        let state = self.state.read().await;
        Ok(runtime_ids
            .iter()
            .filter_map(|runtime_id| {
                state
                    .scenarios
                    .get(&(tenant_id.to_string(), runtime_id.clone()))
                    .cloned()
            })
            .collect())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.finished {
            return Err(StorageError::TransactionClosed);
        }
        let mut state = self.state.write().await;
        if state.fail_on_commit {
            return Err(StorageError::Unavailable("Mock commit failure".to_string()));
        }
        state.committed += 1;
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TenantType;

    fn tenant(id: &str, external: &str) -> BusinessTenantMapping {
        BusinessTenantMapping {
            id: id.to_string(),
            name: external.to_string(),
            external_tenant: external.to_string(),
            parent: None,
            tenant_type: TenantType::Account,
            provider: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_and_commit() {
        let store = MockTenantStore::new();
        store.add_tenant(tenant("int-1", "ext-1")).await;
        store.add_tenant(tenant("int-2", "ext-2")).await;

        let mut tx = store.begin().await.unwrap();
        let found = tx
            .list_by_external_ids(&["ext-2".to_string(), "unknown".to_string()])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "int-2");
        assert_eq!(store.begun_count().await, 1);
        assert_eq!(store.committed_count().await, 1);
        assert!(matches!(
            tx.commit().await,
            Err(StorageError::TransactionClosed)
        ));
    }

    #[tokio::test]
    async fn test_scenarios_per_runtime() {
        let store = MockTenantStore::new();
        store.add_runtime("sub", "rt-1").await;
        store.add_runtime("sub", "rt-2").await;
        store.set_scenarios("source", "rt-1", &["DEFAULT", "formation"]).await;

        let mut tx = store.begin().await.unwrap();
        let runtimes = tx.list_runtimes("sub").await.unwrap();
        let labels = tx
            .scenario_labels_for_runtimes("source", &runtimes)
            .await
            .unwrap();

        assert_eq!(runtimes, vec!["rt-1", "rt-2"]);
        assert_eq!(labels, vec![vec!["DEFAULT".to_string(), "formation".to_string()]]);
    }

    #[tokio::test]
    async fn test_fail_on_begin() {
        let store = MockTenantStore::new();
        store.set_fail_on_begin(true).await;
        assert!(store.begin().await.is_err());
    }
}

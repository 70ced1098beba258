//! Recording write sink for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DirectorError, DirectorGraphQLClient};
use crate::model::GraphQLTenantInput;

/// Records every mutation it receives.
#[derive(Default)]
pub struct RecordingDirectorClient {
    written: RwLock<Vec<Vec<GraphQLTenantInput>>>,
    deleted: RwLock<Vec<Vec<GraphQLTenantInput>>>,
    updated: RwLock<Vec<(String, GraphQLTenantInput)>>,
    fail_on_write_call: RwLock<Option<usize>>,
    write_calls: RwLock<usize>,
    fail_on_delete: RwLock<bool>,
    fail_on_update: RwLock<bool>,
}

impl RecordingDirectorClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the write call with the given zero-based index.
    pub async fn set_fail_on_write_call(&self, call: Option<usize>) {
        *self.fail_on_write_call.write().await = call;
    }

    pub async fn set_fail_on_delete(&self, fail: bool) {
        *self.fail_on_delete.write().await = fail;
    }

    pub async fn set_fail_on_update(&self, fail: bool) {
        *self.fail_on_update.write().await = fail;
    }

    /// Successfully written batches, in call order.
    pub async fn written_batches(&self) -> Vec<Vec<GraphQLTenantInput>> {
        self.written.read().await.clone()
    }

    /// All written tenants flattened in call order.
    pub async fn written(&self) -> Vec<GraphQLTenantInput> {
        self.written.read().await.iter().flatten().cloned().collect()
    }

    pub async fn deleted(&self) -> Vec<GraphQLTenantInput> {
        self.deleted.read().await.iter().flatten().cloned().collect()
    }

    pub async fn deleted_batches(&self) -> Vec<Vec<GraphQLTenantInput>> {
        self.deleted.read().await.clone()
    }

    pub async fn updated(&self) -> Vec<(String, GraphQLTenantInput)> {
        self.updated.read().await.clone()
    }
}

#[async_trait]
impl DirectorGraphQLClient for RecordingDirectorClient {
    async fn write_tenants(&self, tenants: &[GraphQLTenantInput]) -> Result<(), DirectorError> {
        let call = {
            let mut calls = self.write_calls.write().await;
            let call = *calls;
            *calls += 1;
            call
        };
        if *self.fail_on_write_call.read().await == Some(call) {
            return Err(DirectorError::Unavailable("Mock write failure".to_string()));
        }
        self.written.write().await.push(tenants.to_vec());
        Ok(())
    }

    async fn delete_tenants(&self, tenants: &[GraphQLTenantInput]) -> Result<(), DirectorError> {
        if *self.fail_on_delete.read().await {
            return Err(DirectorError::Unavailable("Mock delete failure".to_string()));
        }
        self.deleted.write().await.push(tenants.to_vec());
        Ok(())
    }

    async fn update_tenant(
        &self,
        id: &str,
        tenant: &GraphQLTenantInput,
    ) -> Result<(), DirectorError> {
        if *self.fail_on_update.read().await {
            return Err(DirectorError::Unavailable("Mock update failure".to_string()));
        }
        self.updated.write().await.push((id.to_string(), tenant.clone()));
        Ok(())
    }
}

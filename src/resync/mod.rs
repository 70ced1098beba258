//! Tenant synchronization with an external tenants registry.
//!
//! A cycle reads the checkpoint, then for every supported region fetches
//! created, moved and deleted tenants and applies them to the local store
//! in that order. The checkpoint only advances when every region succeeds.

mod checkpoint;
mod error;
pub mod job;
mod manager;
mod mover;
pub mod pagination;
mod sources;
mod synchronizer;

pub use checkpoint::{convert_time_to_unix_millis, resync_timestamps, ResyncTimestamps};
pub use error::{ResyncError, WithContext};
pub use job::SynchronizationJob;
pub use manager::TenantsManager;
pub use mover::SubaccountMover;
pub use sources::EventSources;
pub use synchronizer::TenantsSynchronizer;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::model::{MovedSubaccountMappingInput, TenantMappingInput};

/// Retrieves tenants from the registry and stores them locally.
#[async_trait]
pub trait TenantCreator: Send + Sync {
    /// Look a single tenant up in every region. `None` when no region knows it.
    async fn fetch_tenant(
        &self,
        external_tenant_id: &str,
    ) -> Result<Option<TenantMappingInput>, ResyncError>;

    async fn tenants_to_create(
        &self,
        region: &str,
        from_timestamp: &str,
    ) -> Result<Vec<TenantMappingInput>, ResyncError>;

    async fn create_tenants(&self, tenants: &[TenantMappingInput]) -> Result<(), ResyncError>;
}

/// Retrieves tenants deleted in the registry and removes them locally.
#[async_trait]
pub trait TenantDeleter: Send + Sync {
    async fn tenants_to_delete(
        &self,
        region: &str,
        from_timestamp: &str,
    ) -> Result<Vec<TenantMappingInput>, ResyncError>;

    async fn delete_tenants(&self, tenants: &[TenantMappingInput]) -> Result<(), ResyncError>;
}

/// Moves subaccounts from one parent tenant to another.
#[async_trait]
pub trait TenantMover: Send + Sync {
    async fn tenants_to_move(
        &self,
        region: &str,
        from_timestamp: &str,
    ) -> Result<Vec<MovedSubaccountMappingInput>, ResyncError>;

    async fn move_tenants(&self, mappings: &[MovedSubaccountMappingInput])
        -> Result<(), ResyncError>;
}

/// Keep one entry per external tenant.
///
/// An entry keeps the position of the first occurrence and the value of the
/// last one. Self-referencing parents are cleared.
pub fn dedupe_tenants(tenants: Vec<TenantMappingInput>) -> Vec<TenantMappingInput> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut deduped: Vec<TenantMappingInput> = Vec::with_capacity(tenants.len());

    for tenant in tenants {
        match positions.get(&tenant.external_tenant) {
            Some(&idx) => deduped[idx] = tenant,
            None => {
                positions.insert(tenant.external_tenant.clone(), deduped.len());
                deduped.push(tenant);
            }
        }
    }

    for tenant in &mut deduped {
        if tenant.parent == tenant.external_tenant {
            tenant.parent.clear();
        }
    }
    deduped
}

/// Drop every tenant of `source` whose external ID appears in `target`.
pub fn exclude_tenants(
    source: Vec<TenantMappingInput>,
    target: &[TenantMappingInput],
) -> Vec<TenantMappingInput> {
    let excluded: HashSet<&str> = target.iter().map(|t| t.external_tenant.as_str()).collect();
    source
        .into_iter()
        .filter(|t| !excluded.contains(t.external_tenant.as_str()))
        .collect()
}

/// External IDs referenced by the given tenants, parents first, without duplicates.
pub fn tenant_ids<'a, I>(tenants: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a TenantMappingInput>,
{
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for tenant in tenants {
        for id in [&tenant.parent, &tenant.external_tenant] {
            if !id.is_empty() && seen.insert(id.as_str()) {
                ids.push(id.clone());
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(external: &str, parent: &str, name: &str) -> TenantMappingInput {
        TenantMappingInput {
            name: name.to_string(),
            external_tenant: external.to_string(),
            parent: parent.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_dedupe_keeps_last_value_at_first_position() {
        let tenants = vec![
            tenant("a", "", "first"),
            tenant("b", "", "b"),
            tenant("a", "", "second"),
        ];

        let deduped = dedupe_tenants(tenants);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].external_tenant, "a");
        assert_eq!(deduped[0].name, "second");
        assert_eq!(deduped[1].external_tenant, "b");
    }

    #[test]
    fn test_dedupe_clears_self_parent() {
        let deduped = dedupe_tenants(vec![tenant("a", "a", "a"), tenant("b", "a", "b")]);

        assert_eq!(deduped[0].parent, "");
        assert_eq!(deduped[1].parent, "a");
    }

    #[test]
    fn test_exclude_tenants() {
        let source = vec![tenant("t1", "", "t1"), tenant("t2", "", "t2")];
        let target = vec![tenant("t1", "", "other")];

        let result = exclude_tenants(source, &target);

        assert_eq!(result, vec![tenant("t2", "", "t2")]);
    }

    #[test]
    fn test_exclude_with_empty_target_keeps_everything() {
        let source = vec![tenant("t1", "", "t1")];
        assert_eq!(exclude_tenants(source.clone(), &[]), source);
    }

    #[test]
    fn test_tenant_ids_parents_first_without_duplicates() {
        let creates = vec![tenant("s1", "p1", "s1"), tenant("s2", "p1", "s2")];
        let deletes = vec![tenant("p1", "", "p1")];

        let ids = tenant_ids(creates.iter().chain(deletes.iter()));

        assert_eq!(ids, vec!["p1", "s1", "s2"]);
    }
}

//! Moves subaccounts between global accounts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::sources::EventSources;
use super::{ResyncError, TenantMover, WithContext};
use crate::director::DirectorGraphQLClient;
use crate::model::{
    BusinessTenantMapping, MovedSubaccountMappingInput, TenantConverter, TenantMappingInput,
    DEFAULT_SCENARIO,
};
use crate::storage::{TenantTransaction, Transactioner};

/// Applies moved-subaccount events to the local store.
///
/// Parent updates run while the classification transaction is open.
/// Subaccounts unknown locally are created under their new parent after the
/// transaction commits.
pub struct SubaccountMover {
    sources: EventSources,
    transact: Arc<dyn Transactioner>,
    director: Arc<dyn DirectorGraphQLClient>,
    converter: TenantConverter,
}

impl SubaccountMover {
    pub fn new(
        sources: EventSources,
        transact: Arc<dyn Transactioner>,
        director: Arc<dyn DirectorGraphQLClient>,
    ) -> Self {
        Self {
            sources,
            transact,
            director,
            converter: TenantConverter::new(),
        }
    }

    /// Fail if any runtime of `subaccount` is in a non-default scenario of
    /// the source parent.
    async fn ensure_movable(
        &self,
        tx: &mut dyn TenantTransaction,
        subaccount: &BusinessTenantMapping,
        source_tenant: &str,
    ) -> Result<(), ResyncError> {
        let runtimes = tx
            .list_runtimes(&subaccount.id)
            .await
            .with_context(|| format!("while listing runtimes of subaccount {}", subaccount.external_tenant))?;
        if runtimes.is_empty() {
            return Ok(());
        }

        let source = tx
            .get_by_external_id(source_tenant)
            .await
            .with_context(|| format!("while getting source tenant {}", source_tenant))?
            .ok_or_else(|| {
                ResyncError::ParentNotFound(format!(
                    "source tenant with external ID {} not found",
                    source_tenant
                ))
            })?;

        let labels = tx
            .scenario_labels_for_runtimes(&source.id, &runtimes)
            .await
            .with_context(|| format!("while getting scenario labels of runtimes in tenant {}", source.id))?;

        for scenarios in &labels {
            if let Some(scenario) = scenarios.iter().find(|s| s.as_str() != DEFAULT_SCENARIO) {
                return Err(ResyncError::ScenarioConflict(format!(
                    "could not move subaccount {}: runtime of the subaccount is in scenario {}",
                    subaccount.external_tenant, scenario
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TenantMover for SubaccountMover {
    async fn tenants_to_move(
        &self,
        region: &str,
        from_timestamp: &str,
    ) -> Result<Vec<MovedSubaccountMappingInput>, ResyncError> {
        self.sources
            .fetch_moved_subaccounts(region, from_timestamp)
            .await
            .context("while fetching moved tenants")
    }

    async fn move_tenants(
        &self,
        mappings: &[MovedSubaccountMappingInput],
    ) -> Result<(), ResyncError> {
        let mut tx = self.transact.begin().await?;

        let target_ids = unique(mappings.iter().map(|m| &m.target_tenant));
        let targets: HashMap<String, BusinessTenantMapping> = tx
            .list_by_external_ids(&target_ids)
            .await
            .context("while listing target parent tenants")?
            .into_iter()
            .map(|t| (t.external_tenant.clone(), t))
            .collect();

        let movable: Vec<&MovedSubaccountMappingInput> = mappings
            .iter()
            .filter(|m| {
                let known = targets.contains_key(&m.target_tenant);
                if !known {
                    warn!(
                        subaccount = %m.subaccount_id,
                        target = %m.target_tenant,
                        "Target parent tenant does not exist, skipping move"
                    );
                }
                known
            })
            .collect();

        let subaccount_ids = unique(movable.iter().map(|m| &m.subaccount_id));
        let subaccounts: HashMap<String, BusinessTenantMapping> = tx
            .list_by_external_ids(&subaccount_ids)
            .await
            .context("while listing subaccounts")?
            .into_iter()
            .map(|t| (t.external_tenant.clone(), t))
            .collect();

        let mut to_create: Vec<TenantMappingInput> = Vec::new();
        let mut to_update: Vec<(String, TenantMappingInput)> = Vec::new();

        for mapping in movable {
            let Some(target) = targets.get(&mapping.target_tenant) else {
                continue;
            };
            let mut tenant = mapping.tenant.clone();
            tenant.parent = mapping.target_tenant.clone();

            let Some(subaccount) = subaccounts.get(&mapping.subaccount_id) else {
                info!(subaccount = %mapping.subaccount_id, "Subaccount does not exist, creating it in the target parent");
                to_create.push(tenant);
                continue;
            };

            if subaccount.parent.as_deref() == Some(target.id.as_str()) {
                debug!(subaccount = %mapping.subaccount_id, "Subaccount already moved");
                continue;
            }

            self.ensure_movable(&mut *tx, subaccount, &mapping.source_tenant)
                .await?;
            to_update.push((subaccount.id.clone(), tenant));
        }

        for (id, tenant) in &to_update {
            let input = self.converter.to_graphql_input(tenant);
            self.director
                .update_tenant(id, &input)
                .await
                .with_context(|| format!("while updating parent of subaccount {}", tenant.external_tenant))?;
        }

        tx.commit().await.context("while committing transaction")?;

        if !to_create.is_empty() {
            let inputs = self.converter.multiple_to_graphql_input(&to_create);
            self.director
                .write_tenants(&inputs)
                .await
                .context("while creating missing subaccounts")?;
        }

        info!(
            updated = to_update.len(),
            created = to_create.len(),
            "Moved subaccounts"
        );
        Ok(())
    }
}

fn unique<'a, I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

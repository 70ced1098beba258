//! Wire representation of tenants sent to the Director GraphQL API.

use serde::{Deserialize, Serialize};

use super::{TenantMappingInput, TenantType};

/// `BusinessTenantMappingInput` as accepted by the Director mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLTenantInput {
    pub name: String,
    pub external_tenant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdomain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub tenant_type: TenantType,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

/// Converts tenant inputs into their wire form.
#[derive(Debug, Clone, Copy, Default)]
pub struct TenantConverter;

impl TenantConverter {
    pub fn new() -> Self {
        Self
    }

    pub fn to_graphql_input(&self, tenant: &TenantMappingInput) -> GraphQLTenantInput {
        GraphQLTenantInput {
            name: tenant.name.clone(),
            external_tenant: tenant.external_tenant.clone(),
            parent: non_empty(&tenant.parent),
            subdomain: non_empty(&tenant.subdomain),
            region: non_empty(&tenant.region),
            tenant_type: tenant.tenant_type,
            provider: tenant.provider.clone(),
            license_type: tenant.license_type.clone(),
            customer_id: tenant.customer_id.clone(),
        }
    }

    pub fn multiple_to_graphql_input(&self, tenants: &[TenantMappingInput]) -> Vec<GraphQLTenantInput> {
        tenants.iter().map(|t| self.to_graphql_input(t)).collect()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

//! Tenant domain types.
//!
//! Values are created fresh per synchronization cycle from registry pages;
//! the identity key for dedup and merge is `external_tenant`.

mod graphql;

pub use graphql::{GraphQLTenantInput, TenantConverter};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Provider name stamped on tenants stored on demand when the registry has no record.
pub const TENANT_ON_DEMAND_PROVIDER: &str = "lazily-tenant-fetcher";

/// Scenario value that does not count as formation membership.
pub const DEFAULT_SCENARIO: &str = "DEFAULT";

/// Position of a tenant in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantType {
    #[default]
    Account,
    Subaccount,
    Customer,
}

impl TenantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantType::Account => "account",
            TenantType::Subaccount => "subaccount",
            TenantType::Customer => "customer",
        }
    }

    /// Type of the synthetic parent created for a child of this type.
    ///
    /// Accounts live under customers, everything else lives under accounts.
    pub fn parent_type(&self) -> TenantType {
        match self {
            TenantType::Account => TenantType::Customer,
            _ => TenantType::Account,
        }
    }
}

impl fmt::Display for TenantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "account" => Ok(TenantType::Account),
            "subaccount" => Ok(TenantType::Subaccount),
            "customer" => Ok(TenantType::Customer),
            other => Err(format!("unknown tenant type: {}", other)),
        }
    }
}

/// A tenant as described by one registry event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TenantMappingInput {
    pub name: String,
    pub external_tenant: String,
    /// External ID of the parent, or the internal ID once resolved locally.
    pub parent: String,
    pub subdomain: String,
    pub region: String,
    pub tenant_type: TenantType,
    pub provider: String,
    pub license_type: Option<String>,
    pub customer_id: Option<String>,
}

/// A subaccount whose parent changes from `source_tenant` to `target_tenant`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MovedSubaccountMappingInput {
    pub tenant: TenantMappingInput,
    pub subaccount_id: String,
    /// External ID of the old parent.
    pub source_tenant: String,
    /// External ID of the new parent.
    pub target_tenant: String,
}

/// A tenant record as held by the local tenant store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessTenantMapping {
    /// Internal ID.
    pub id: String,
    pub name: String,
    pub external_tenant: String,
    /// Internal ID of the parent.
    pub parent: Option<String>,
    pub tenant_type: TenantType,
    pub provider: String,
}

/// Trim leading zeros of a numeric customer ID. Other IDs are kept as is.
pub fn trim_customer_id_leading_zeros(id: &str) -> String {
    if id.parse::<u64>().is_err() {
        return id.to_string();
    }
    let trimmed = id.trim_start_matches('0');
    if trimmed.is_empty() && !id.is_empty() {
        return "0".to_string();
    }
    trimmed.to_string()
}

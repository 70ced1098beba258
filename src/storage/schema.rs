//! Tenant store schema definitions using sea-query.

use sea_query::Iden;

/// Tenants table schema.
#[derive(Iden)]
pub enum BusinessTenantMappings {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "external_name"]
    ExternalName,
    #[iden = "external_tenant"]
    ExternalTenant,
    #[iden = "parent"]
    Parent,
    #[iden = "type"]
    Type,
    #[iden = "provider_name"]
    ProviderName,
    #[iden = "subdomain"]
    Subdomain,
    #[iden = "region"]
    Region,
    #[iden = "license_type"]
    LicenseType,
    #[iden = "customer_id"]
    CustomerId,
}

/// Runtimes table schema.
#[derive(Iden)]
pub enum Runtimes {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "tenant_id"]
    TenantId,
    #[iden = "name"]
    Name,
}

/// Labels table schema. `value` holds JSON.
#[derive(Iden)]
pub enum Labels {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "tenant_id"]
    TenantId,
    #[iden = "runtime_id"]
    RuntimeId,
    #[iden = "key"]
    Key,
    #[iden = "value"]
    Value,
}

/// Label key holding formation membership.
pub const SCENARIOS_LABEL_KEY: &str = "scenarios";

//! Registry payload builders and tenant fixtures for tests.
//!
//! Payloads follow the default field mapping of `TenantFieldMapping` and
//! `MovedSubaccountsFieldMapping`.

use serde_json::{json, Value};

use crate::model::{BusinessTenantMapping, TenantMappingInput, TenantType};

/// A global account event.
pub fn global_account_event(id: &str, customer_id: &str) -> Value {
    json!({
        "entityType": "GlobalAccount",
        "globalAccountGUID": id,
        "details": {
            "id": id,
            "name": id,
            "subdomain": format!("{}-sub", id),
            "customerId": customer_id,
        }
    })
}

/// A subaccount event under global account `parent`.
pub fn subaccount_event(id: &str, parent: &str, region: &str) -> Value {
    json!({
        "entityType": "Subaccount",
        "globalAccountGUID": parent,
        "details": {
            "subaccountId": id,
            "name": id,
            "subdomain": format!("{}-sub", id),
            "region": region,
        }
    })
}

/// A subaccount moved from `source` to `target`.
pub fn moved_subaccount_event(id: &str, source: &str, target: &str) -> Value {
    json!({
        "entityType": "Subaccount",
        "globalAccountGUID": target,
        "details": {
            "subaccountId": id,
            "name": id,
            "sourceGlobalAccountGUID": source,
            "targetGlobalAccountGUID": target,
        }
    })
}

/// A single page holding `events`.
pub fn events_page(events: Vec<Value>) -> Value {
    let count = events.len();
    json!({"events": events, "totalPages": 1, "totalResults": count})
}

/// A stored tenant.
pub fn stored_tenant(
    id: &str,
    external: &str,
    parent: Option<&str>,
    tenant_type: TenantType,
) -> BusinessTenantMapping {
    BusinessTenantMapping {
        id: id.to_string(),
        name: external.to_string(),
        external_tenant: external.to_string(),
        parent: parent.map(str::to_string),
        tenant_type,
        provider: "test-provider".to_string(),
    }
}

/// A tenant input as parsed from a registry event.
pub fn tenant_input(external: &str, parent: &str, tenant_type: TenantType) -> TenantMappingInput {
    TenantMappingInput {
        name: external.to_string(),
        external_tenant: external.to_string(),
        parent: parent.to_string(),
        tenant_type,
        provider: "test-provider".to_string(),
        ..Default::default()
    }
}

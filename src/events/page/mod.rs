//! Conversion of one raw events page into tenant inputs.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::json;
use super::{EventsType, ParseError};
use crate::config::{MovedSubaccountsFieldMapping, TenantFieldMapping};
use crate::model::{
    trim_customer_id_leading_zeros, MovedSubaccountMappingInput, TenantMappingInput, TenantType,
};

/// Entity types classified as global accounts.
pub const GLOBAL_ACCOUNT_REGEX: &str = "^GLOBALACCOUNT_.*|GlobalAccount";

static GLOBAL_ACCOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(GLOBAL_ACCOUNT_REGEX).expect("global account regex is valid"));

/// A page returned by an events API together with the mappings needed to
/// read it.
#[derive(Debug, Clone)]
pub struct EventsPage {
    pub field_mapping: TenantFieldMapping,
    pub moved_subaccounts_field_mapping: MovedSubaccountsFieldMapping,
    pub provider_name: String,
    pub payload: Value,
}

impl EventsPage {
    pub fn new(
        field_mapping: TenantFieldMapping,
        moved_subaccounts_field_mapping: MovedSubaccountsFieldMapping,
        provider_name: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            field_mapping,
            moved_subaccounts_field_mapping,
            provider_name: provider_name.into(),
            payload,
        }
    }

    /// Integer page-level field such as the total pages count. Zero when absent.
    pub fn int_field(&self, field: &str) -> i64 {
        json::int(&self.payload, field)
    }

    /// Tenants described by the page. Events that cannot be converted are
    /// logged and skipped.
    pub fn tenant_mappings(&self, events_type: EventsType) -> Vec<TenantMappingInput> {
        self.events_details()
            .into_iter()
            .filter_map(|detail| match self.event_data_to_tenant(events_type, &detail) {
                Ok(tenant) => tenant,
                Err(e) => {
                    warn!(error = %e, event = %detail, "Could not convert tenant");
                    None
                }
            })
            .collect()
    }

    /// Moved subaccounts described by the page.
    pub fn moved_subaccounts(&self) -> Vec<MovedSubaccountMappingInput> {
        self.events_details()
            .into_iter()
            .filter_map(|detail| match self.event_data_to_moved_subaccount(&detail) {
                Ok(mapping) => Some(mapping),
                Err(e) => {
                    warn!(error = %e, event = %detail, "Could not convert tenant");
                    None
                }
            })
            .collect()
    }

    /// Flatten every event into its details object, carrying the entity type
    /// and the global account GUID along.
    fn events_details(&self) -> Vec<Value> {
        let mapping = &self.field_mapping;
        let Some(events) = json::get(&self.payload, &mapping.events_field).and_then(Value::as_array)
        else {
            return Vec::new();
        };

        events
            .iter()
            .map(|event| {
                let mut details = match json::get(event, &mapping.details_field) {
                    Some(Value::Object(map)) => map.clone(),
                    Some(Value::String(raw)) => parse_object(raw),
                    _ => Map::new(),
                };
                if let Some(entity_type) = json::get(event, &mapping.entity_type_field) {
                    details.insert(mapping.entity_type_field.clone(), entity_type.clone());
                }
                if let Some(guid) = json::get(event, &mapping.global_account_guid_field) {
                    details.insert(mapping.global_account_key.clone(), guid.clone());
                }
                Value::Object(details)
            })
            .collect()
    }

    fn event_data_to_tenant(
        &self,
        events_type: EventsType,
        data: &Value,
    ) -> Result<Option<TenantMappingInput>, ParseError> {
        let mapping = &self.field_mapping;
        if !data.is_object() {
            return Err(ParseError::InvalidJson);
        }

        if events_type == EventsType::CreatedAccount && !mapping.discriminator_field.is_empty() {
            let discriminator = json::string(data, &mapping.discriminator_field)
                .ok_or_else(|| ParseError::InvalidFieldFormat(mapping.discriminator_field.clone()))?;
            if discriminator != mapping.discriminator_value {
                return Ok(None);
            }
        }

        let id = determine_tenant_id(data, mapping)?;

        let name = json::string(data, &mapping.name_field).unwrap_or_else(|| {
            warn!(field = %mapping.name_field, tenant_id = %id, "Missing or invalid format of name field");
            String::new()
        });
        let subdomain = self.subdomain(data, &id);

        let entity_type = json::string(data, &mapping.entity_type_field)
            .ok_or_else(|| ParseError::InvalidFieldFormat(mapping.entity_type_field.clone()))?;

        let license_type = self.license_type(data, &id);

        if GLOBAL_ACCOUNT.is_match(&entity_type) {
            return Ok(Some(self.global_account_tenant(data, name, subdomain, id, license_type)));
        }
        self.subaccount_tenant(data, name, subdomain, id, license_type)
            .map(Some)
    }

    fn event_data_to_moved_subaccount(
        &self,
        data: &Value,
    ) -> Result<MovedSubaccountMappingInput, ParseError> {
        let moved = &self.moved_subaccounts_field_mapping;
        if !data.is_object() {
            return Err(ParseError::InvalidJson);
        }

        let required = |field: &str| {
            json::strict_string(data, field)
                .ok_or_else(|| ParseError::InvalidFieldFormat(field.to_string()))
        };
        let id = required(&moved.subaccount_id)?;
        let source = required(&moved.source_tenant)?;
        let target = required(&moved.target_tenant)?;

        let name = json::string(data, &self.field_mapping.name_field)
            .ok_or_else(|| ParseError::InvalidFieldFormat(self.field_mapping.name_field.clone()))?;
        let subdomain = self.subdomain(data, &id);
        let license_type = self.license_type(data, &id);

        let tenant = self.subaccount_tenant(data, name, subdomain, id.clone(), license_type)?;

        Ok(MovedSubaccountMappingInput {
            tenant,
            subaccount_id: id,
            source_tenant: source,
            target_tenant: target,
        })
    }

    fn global_account_tenant(
        &self,
        data: &Value,
        name: String,
        subdomain: String,
        external_tenant: String,
        license_type: Option<String>,
    ) -> TenantMappingInput {
        let customer_field = &self.field_mapping.customer_id_field;
        let parent = json::string(data, customer_field).unwrap_or_else(|| {
            warn!(field = %customer_field, tenant_id = %external_tenant, "Missing or invalid format of customer id field");
            String::new()
        });

        TenantMappingInput {
            name,
            external_tenant,
            parent,
            subdomain,
            region: String::new(),
            tenant_type: TenantType::Account,
            provider: self.provider_name.clone(),
            license_type,
            customer_id: None,
        }
    }

    fn subaccount_tenant(
        &self,
        data: &Value,
        name: String,
        subdomain: String,
        external_tenant: String,
        license_type: Option<String>,
    ) -> Result<TenantMappingInput, ParseError> {
        let mapping = &self.field_mapping;

        let region = json::string(data, &mapping.region_field).unwrap_or_else(|| {
            debug!(field = %mapping.region_field, tenant_id = %external_tenant, "Missing or invalid format of region field");
            String::new()
        });

        let parent = json::string(data, &mapping.global_account_key)
            .ok_or_else(|| ParseError::InvalidFieldFormat(mapping.global_account_key.clone()))?;

        let customer_id = json::get(data, &mapping.labels_field)
            .and_then(|labels| json::get(labels, &mapping.customer_id_field))
            .and_then(Value::as_array)
            .and_then(|values| values.first())
            .map(|first| trim_customer_id_leading_zeros(&json::scalar_to_string(first)));

        Ok(TenantMappingInput {
            name,
            external_tenant,
            parent,
            subdomain,
            region,
            tenant_type: TenantType::Subaccount,
            provider: self.provider_name.clone(),
            license_type,
            customer_id,
        })
    }

    fn subdomain(&self, data: &Value, id: &str) -> String {
        let field = &self.field_mapping.subdomain_field;
        json::string(data, field).unwrap_or_else(|| {
            warn!(field = %field, tenant_id = %id, "Missing or invalid format of subdomain field");
            String::new()
        })
    }

    fn license_type(&self, data: &Value, id: &str) -> Option<String> {
        let field = &self.field_mapping.license_type_field;
        let license_type = json::strict_string(data, field);
        if license_type.is_none() {
            warn!(field = %field, tenant_id = %id, "Missing or invalid format of license type field");
        }
        license_type
    }
}

/// The ID field has several possible names depending on the entity.
fn determine_tenant_id(data: &Value, mapping: &TenantFieldMapping) -> Result<String, ParseError> {
    [
        &mapping.id_field,
        &mapping.global_account_guid_field,
        &mapping.subaccount_id_field,
    ]
    .into_iter()
    .filter_map(|field| json::string(data, field))
    .find(|id| !id.is_empty())
    .ok_or(ParseError::MissingId)
}

fn parse_object(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

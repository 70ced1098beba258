//! Director GraphQL client over reqwest.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{DirectorError, DirectorGraphQLClient};
use crate::model::GraphQLTenantInput;

const WRITE_TENANTS: &str =
    "mutation ($in: [BusinessTenantMappingInput!]) { writeTenants(in: $in) }";
const DELETE_TENANTS: &str =
    "mutation ($in: [BusinessTenantMappingInput!]) { deleteTenants(in: $in) }";
const UPDATE_TENANT: &str =
    "mutation ($id: ID!, $in: BusinessTenantMappingInput!) { updateTenant(id: $id, in: $in) { id } }";

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    errors: Vec<GraphQLErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorMessage {
    message: String,
}

/// Posts tenant mutations to a Director GraphQL endpoint.
pub struct GraphQLDirectorClient {
    client: Client,
    url: String,
    headers: HashMap<String, String>,
}

impl GraphQLDirectorClient {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        headers: HashMap<String, String>,
    ) -> Result<Self, DirectorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            headers,
        })
    }

    async fn execute(&self, operation: &str, query: &str, variables: Value) -> Result<(), DirectorError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query, "variables": variables }));
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(DirectorError::UnexpectedStatus {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: GraphQLResponse = serde_json::from_str(&body)
            .map_err(|e| DirectorError::GraphQL(format!("invalid response: {}", e)))?;
        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(DirectorError::GraphQL(messages.join("; ")));
        }

        debug!(operation, "Director mutation succeeded");
        Ok(())
    }
}

#[async_trait]
impl DirectorGraphQLClient for GraphQLDirectorClient {
    async fn write_tenants(&self, tenants: &[GraphQLTenantInput]) -> Result<(), DirectorError> {
        self.execute("writeTenants", WRITE_TENANTS, json!({ "in": tenants }))
            .await
    }

    async fn delete_tenants(&self, tenants: &[GraphQLTenantInput]) -> Result<(), DirectorError> {
        self.execute("deleteTenants", DELETE_TENANTS, json!({ "in": tenants }))
            .await
    }

    async fn update_tenant(
        &self,
        id: &str,
        tenant: &GraphQLTenantInput,
    ) -> Result<(), DirectorError> {
        self.execute("updateTenant", UPDATE_TENANT, json!({ "id": id, "in": tenant }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TenantType;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tenant(id: &str) -> GraphQLTenantInput {
        GraphQLTenantInput {
            name: id.to_string(),
            external_tenant: id.to_string(),
            parent: None,
            subdomain: None,
            region: None,
            tenant_type: TenantType::Account,
            provider: "registry".to_string(),
            license_type: None,
            customer_id: None,
        }
    }

    async fn client_for(server: &MockServer) -> GraphQLDirectorClient {
        GraphQLDirectorClient::new(
            format!("{}/graphql", server.uri()),
            Duration::from_secs(5),
            HashMap::from([("tenant".to_string(), "director".to_string())]),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_write_tenants_posts_variables() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("tenant", "director"))
            .and(body_partial_json(json!({
                "variables": {"in": [{"externalTenant": "t1", "type": "account"}]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"writeTenants": ["id-1"]}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.write_tenants(&[tenant("t1")]).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_tenant_sends_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"variables": {"id": "internal-1"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.update_tenant("internal-1", &tenant("t1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_graphql_errors_are_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{"message": "tenant already exists"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.delete_tenants(&[tenant("t1")]).await.unwrap_err();

        assert!(matches!(err, DirectorError::GraphQL(_)));
        assert!(err.to_string().contains("tenant already exists"));
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.write_tenants(&[tenant("t1")]).await.unwrap_err();

        assert!(matches!(err, DirectorError::UnexpectedStatus { status: 503, .. }));
    }
}

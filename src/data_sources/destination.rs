use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DataSource;
use crate::client::types::{Destination, ListDestinationsRequest, Pagination};
use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::decode;

/// `infra_destination`: one destination by name, with the details needed to
/// write a kubeconfig entry for it.
pub struct DestinationDataSource;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DestinationConfig {
    name: String,
}

#[derive(Debug, Serialize)]
struct DestinationState {
    id: String,
    name: String,
    kubernetes: Kubernetes,
}

#[derive(Debug, Serialize)]
struct Kubernetes {
    endpoint: String,
    certificate_authority_data: String,
    namespaces: Vec<String>,
    roles: Vec<String>,
}

impl From<Destination> for DestinationState {
    fn from(destination: Destination) -> Self {
        let kubernetes = Kubernetes {
            endpoint: format!("https://{}", destination.connection.url),
            certificate_authority_data: STANDARD.encode(destination.connection.ca.as_bytes()),
            namespaces: destination.resources,
            roles: destination.roles,
        };
        Self {
            id: destination.id.to_string(),
            name: destination.name,
            kubernetes,
        }
    }
}

#[async_trait::async_trait]
impl DataSource for DestinationDataSource {
    fn type_name(&self) -> &'static str {
        "infra_destination"
    }

    fn schema(&self) -> Schema {
        let strings = AttributeType::list(AttributeType::String);
        let kubernetes = AttributeType::object([
            ("endpoint", AttributeType::String),
            ("certificate_authority_data", AttributeType::String),
            ("namespaces", strings.clone()),
            ("roles", strings),
        ]);

        Schema::v0()
            .with_description("Get information about a registered Infra destination.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The destination's unique identifier."),
            )
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The destination's name."),
            )
            .with_attribute(
                "kubernetes",
                Attribute::new(kubernetes, AttributeFlags::computed()).with_description(
                    "Connection details of a Kubernetes destination: the API server `endpoint`, the base64-encoded `certificate_authority_data`, and the known `namespaces` and ClusterRole `roles`.",
                ),
            )
    }

    async fn read(&self, client: &Client, config: Value) -> Result<Value, ProviderError> {
        let config: DestinationConfig = decode(config)?;

        let destination = client
            .list_destinations(&ListDestinationsRequest {
                name: Some(config.name.clone()),
                pagination: Pagination::first(),
                ..Default::default()
            })
            .await?
            .into_first()
            .ok_or_else(|| ProviderError::NotFound(format!("{} not found", config.name)))?;

        Ok(serde_json::to_value(DestinationState::from(destination))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::types::DestinationConnection;
    use crate::id::Id;
    use serde_json::json;

    #[test]
    fn test_kubernetes_details() {
        let destination = Destination {
            id: Id::new(7),
            name: "production".into(),
            kind: "kubernetes".into(),
            connection: DestinationConnection {
                url: "10.0.0.1:6443".into(),
                ca: "PEM".into(),
            },
            resources: vec!["default".into(), "web".into()],
            roles: vec!["view".into()],
            ..Default::default()
        };

        let state = serde_json::to_value(DestinationState::from(destination)).unwrap();
        assert_eq!(
            state,
            json!({
                "id": "8",
                "name": "production",
                "kubernetes": {
                    "endpoint": "https://10.0.0.1:6443",
                    "certificate_authority_data": "UEVN",
                    "namespaces": ["default", "web"],
                    "roles": ["view"],
                },
            })
        );
    }
}

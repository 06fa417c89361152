use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, encode, state_id, Resource};
use crate::client::types::CreateGroupRequest;
use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::validators::Validator;

/// `infra_group`
pub struct GroupResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct GroupState {
    id: Option<String>,
    name: String,
}

#[async_trait::async_trait]
impl Resource for GroupResource {
    fn type_name(&self) -> &'static str {
        "infra_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Provides an Infra group. This resource can be used to create and manage groups.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The group's unique identifier."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The group's name. Group names may include letters (uppercase and lowercase), numbers, underscores `_`, hyphens `-`, and periods `.`.")
                    .with_force_new()
                    .with_validator(Validator::Name),
            )
    }

    fn importable(&self) -> bool {
        true
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let mut state: GroupState = decode(planned)?;
        let group = client
            .create_group(&CreateGroupRequest {
                name: state.name.trim().to_string(),
            })
            .await?;

        state.id = Some(group.id.to_string());
        state.name = group.name;
        encode(&state)
    }

    async fn read(&self, client: &Client, state: Value) -> Result<Value, ProviderError> {
        let mut state: GroupState = decode(state)?;
        let group = client.get_group(state_id(&state.id)?).await?;
        state.name = group.name;
        encode(&state)
    }

    async fn delete(&self, client: &Client, state: Value) -> Result<(), ProviderError> {
        let state: GroupState = decode(state)?;
        client.delete_group(state_id(&state.id)?).await?;
        Ok(())
    }
}

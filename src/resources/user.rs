use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode, encode, non_empty, state_id, Resource};
use crate::client::types::{CreateUserRequest, UpdateUserRequest};
use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::validators::Validator;

/// `infra_user`: a local user identified by email.
pub struct UserResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserState {
    id: Option<String>,
    name: String,
    password: Option<String>,
}

#[async_trait::async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &'static str {
        "infra_user"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Provides an Infra user. This resource can be used to create and manage users.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The user's unique identifier."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The user's name. Must be a valid email address.")
                    .with_force_new()
                    .with_validator(Validator::Email),
            )
            .with_attribute(
                "password",
                Attribute::optional_computed_string()
                    .with_description("The user's password. If omitted, a one time password is generated.")
                    .sensitive()
                    .with_validator(Validator::MinLength(8)),
            )
    }

    fn importable(&self) -> bool {
        true
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let mut state: UserState = decode(planned)?;

        let user = client
            .create_user(&CreateUserRequest {
                name: state.name.clone(),
            })
            .await?;
        debug!(id = %user.id, "created user");

        match non_empty(&state.password) {
            Some(password) => {
                client
                    .update_user(&UpdateUserRequest {
                        id: user.id,
                        old_password: String::new(),
                        password: password.to_string(),
                    })
                    .await?;
            }
            None => {
                state.password =
                    Some(user.one_time_password).filter(|otp| !otp.is_empty());
            }
        }

        state.id = Some(user.id.to_string());
        state.name = user.name;
        encode(&state)
    }

    async fn read(&self, client: &Client, state: Value) -> Result<Value, ProviderError> {
        let mut state: UserState = decode(state)?;
        let user = client.get_user(state_id(&state.id)?).await?;
        state.name = user.name;
        encode(&state)
    }

    async fn update(
        &self,
        client: &Client,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: UserState = decode(prior)?;
        let mut state: UserState = decode(planned)?;
        state.id = prior.id.clone();

        if state.password != prior.password {
            if let Some(password) = non_empty(&state.password) {
                client
                    .update_user(&UpdateUserRequest {
                        id: state_id(&state.id)?,
                        old_password: prior.password.clone().unwrap_or_default(),
                        password: password.to_string(),
                    })
                    .await?;
            }
        }
        encode(&state)
    }

    async fn delete(&self, client: &Client, state: Value) -> Result<(), ProviderError> {
        let state: UserState = decode(state)?;
        client.delete_user(state_id(&state.id)?).await?;
        Ok(())
    }
}

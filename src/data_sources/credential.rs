use chrono::Utc;
use serde_json::{json, Value};

use super::DataSource;
use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// `infra_credential`: a fresh token for the configured access key's user.
pub struct CredentialDataSource;

#[async_trait::async_trait]
impl DataSource for CredentialDataSource {
    fn type_name(&self) -> &'static str {
        "infra_credential"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Get an authentication token to communicate with a registered destination.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("Unix time the token was issued."),
            )
            .with_attribute(
                "token",
                Attribute::computed_string()
                    .with_description("A token that can be used to authenticate the user.")
                    .sensitive(),
            )
    }

    async fn read(&self, client: &Client, _config: Value) -> Result<Value, ProviderError> {
        let credential = client.create_token().await?;
        Ok(json!({
            "id": Utc::now().timestamp().to_string(),
            "token": credential.token,
        }))
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{decode, encode, single_block, Resource};
use crate::client::types::{PasswordRequirements as ApiPasswordRequirements, Settings};
use crate::client::Client;
use crate::error::ProviderError;
use crate::lookup;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validators::Validator;

/// Settings exist once per organization under this ID.
const SETTINGS_ID: &str = "self";

const MINIMUM_SERVER_VERSION: &str = "0.18.0";

/// `infra_settings`
///
/// Settings are created with the organization, so creating the resource
/// adopts them and deleting it leaves them untouched.
pub struct SettingsResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsState {
    id: Option<String>,
    #[serde(deserialize_with = "single_block::deserialize")]
    password_requirements: Option<PasswordRequirements>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct PasswordRequirements {
    minimum_length: i64,
    minimum_lowercase: i64,
    minimum_uppercase: i64,
    minimum_numbers: i64,
    minimum_symbols: i64,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            minimum_length: 8,
            minimum_lowercase: 0,
            minimum_uppercase: 0,
            minimum_numbers: 0,
            minimum_symbols: 0,
        }
    }
}

impl From<PasswordRequirements> for ApiPasswordRequirements {
    fn from(r: PasswordRequirements) -> Self {
        Self {
            length_min: r.minimum_length,
            lowercase_min: r.minimum_lowercase,
            uppercase_min: r.minimum_uppercase,
            number_min: r.minimum_numbers,
            symbol_min: r.minimum_symbols,
        }
    }
}

impl From<ApiPasswordRequirements> for PasswordRequirements {
    fn from(r: ApiPasswordRequirements) -> Self {
        Self {
            minimum_length: r.length_min,
            minimum_lowercase: r.lowercase_min,
            minimum_uppercase: r.uppercase_min,
            minimum_numbers: r.number_min,
            minimum_symbols: r.symbol_min,
        }
    }
}

impl SettingsResource {
    async fn apply(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        lookup::require_minimum_server_version(client, MINIMUM_SERVER_VERSION).await?;

        let state: SettingsState = decode(planned)?;
        let requirements = state.password_requirements.unwrap_or_default();
        client
            .update_settings(&Settings {
                password_requirements: requirements.into(),
            })
            .await?;

        self.read(client, encode(&state)?).await
    }
}

#[async_trait::async_trait]
impl Resource for SettingsResource {
    fn type_name(&self) -> &'static str {
        "infra_settings"
    }

    fn schema(&self) -> Schema {
        let count = |description: &str| {
            Attribute::optional_int64()
                .with_description(description)
                .with_default(json!(0))
        };

        let requirements = Block::new()
            .with_attribute(
                "minimum_length",
                Attribute::optional_int64()
                    .with_description("Minimum password length.")
                    .with_default(json!(8))
                    .with_validator(Validator::IntAtLeast(8)),
            )
            .with_attribute("minimum_lowercase", count("Minimum number of lowercase ASCII letters."))
            .with_attribute("minimum_uppercase", count("Minimum number of uppercase ASCII letters."))
            .with_attribute("minimum_numbers", count("Minimum number of numbers."))
            .with_attribute("minimum_symbols", count("Minimum number of symbols."));

        Schema::v0()
            .with_description("Provides Infra organization settings. Settings are created with the organization: creating this resource imports them and deleting it takes no action.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("Always `self`."),
            )
            .with_block(
                "password_requirements",
                NestedBlock::single(requirements).computed(),
            )
    }

    fn importable(&self) -> bool {
        true
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        self.apply(client, planned).await
    }

    async fn read(&self, client: &Client, state: Value) -> Result<Value, ProviderError> {
        let mut state: SettingsState = decode(state)?;
        let settings = client.get_settings().await?;

        state.id = Some(SETTINGS_ID.to_string());
        state.password_requirements = Some(settings.password_requirements.into());
        encode(&state)
    }

    async fn update(
        &self,
        client: &Client,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.apply(client, planned).await
    }

    async fn delete(&self, _client: &Client, _state: Value) -> Result<(), ProviderError> {
        Ok(())
    }

    fn import_state(&self, _id: &str) -> Value {
        json!({ "id": SETTINGS_ID })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan;
    use crate::validation;

    #[test]
    fn test_requirements_mapping() {
        let api: ApiPasswordRequirements = PasswordRequirements {
            minimum_length: 12,
            minimum_symbols: 1,
            ..Default::default()
        }
        .into();
        assert_eq!(api.length_min, 12);
        assert_eq!(api.symbol_min, 1);
        assert_eq!(api.lowercase_min, 0);
        assert_eq!(PasswordRequirements::from(api).minimum_length, 12);
    }

    #[test]
    fn test_minimum_length_floor() {
        let schema = SettingsResource.schema();
        let config = json!({"password_requirements": {"minimum_length": 6}});
        assert_eq!(validation::validate(&schema, &config).len(), 1);
    }

    #[test]
    fn test_plan_fills_defaults() {
        let schema = SettingsResource.schema();
        let result = plan(&schema, None, json!({"password_requirements": [{"minimum_symbols": 1}]}));
        assert_eq!(
            result.planned_state["password_requirements"],
            json!({
                "minimum_length": 8,
                "minimum_lowercase": 0,
                "minimum_uppercase": 0,
                "minimum_numbers": 0,
                "minimum_symbols": 1,
            })
        );
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{decode, encode, non_empty, single_block, state_id, Resource};
use crate::client::types::{ProviderApiCredentials, ProviderRequest};
use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validators::Validator;

const GOOGLE_ISSUER: &str = "https://accounts.google.com";

/// `infra_identity_provider`: an OIDC provider users log in with.
pub struct IdentityProviderResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct IdentityProviderState {
    id: Option<String>,
    name: Option<String>,
    issuer: Option<String>,
    client_id: String,
    client_secret: String,
    #[serde(deserialize_with = "single_block::deserialize")]
    azure: Option<Azure>,
    #[serde(deserialize_with = "single_block::deserialize")]
    google: Option<Google>,
    #[serde(deserialize_with = "single_block::deserialize")]
    okta: Option<Okta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Azure {
    tenant_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Google {
    admin_email: Option<String>,
    service_account_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct Okta {
    issuer: String,
}

/// The parts of a Google service account key file the server needs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceAccountKey {
    private_key: String,
    client_email: String,
}

impl IdentityProviderState {
    /// Build the create/update body from the configured kind.
    fn request(&self) -> Result<ProviderRequest, ProviderError> {
        let mut request = ProviderRequest {
            name: self.name.clone().unwrap_or_default(),
            url: self.issuer.clone().unwrap_or_default(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            ..Default::default()
        };

        if let Some(azure) = &self.azure {
            request.kind = "azure".to_string();
            request.url = format!(
                "https://login.microsoftonline.com/{}/v2.0",
                azure.tenant_id
            );
        } else if let Some(google) = &self.google {
            let mut api = ProviderApiCredentials {
                domain_admin_email: google.admin_email.clone().unwrap_or_default(),
                ..Default::default()
            };
            if let Some(raw) = non_empty(&google.service_account_key) {
                let key: ServiceAccountKey = serde_json::from_str(raw)?;
                api.private_key = key.private_key;
                api.client_email = key.client_email;
            }
            request.api = Some(api);
            request.kind = "google".to_string();
            request.url = GOOGLE_ISSUER.to_string();
        } else if let Some(okta) = &self.okta {
            request.kind = "okta".to_string();
            request.url = okta.issuer.clone();
        }

        Ok(request)
    }
}

/// Provider URLs may be stored without a scheme.
fn normalize_issuer(url: &str) -> String {
    if url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

#[async_trait::async_trait]
impl Resource for IdentityProviderResource {
    fn type_name(&self) -> &'static str {
        "infra_identity_provider"
    }

    fn schema(&self) -> Schema {
        let azure = Block::new()
            .with_description("Azure AD identity provider configurations.")
            .with_attribute(
                "tenant_id",
                Attribute::required_string().with_description("The Azure AD tenant ID."),
            );

        let google = Block::new()
            .with_description("Google identity provider configurations.")
            .with_attribute(
                "admin_email",
                Attribute::optional_string()
                    .with_description("A Google workspace admin user email. Infra will impersonate this user when making API calls to retrieve Google groups.")
                    .with_validator(Validator::Email),
            )
            .with_attribute(
                "service_account_key",
                Attribute::optional_string()
                    .with_description("A Google service account private key file. Must be a JSON-formatted string.")
                    .sensitive()
                    .with_validator(Validator::Json),
            )
            .with_required_together(["admin_email", "service_account_key"]);

        let okta = Block::new()
            .with_description("Okta identity provider configurations.")
            .with_attribute(
                "issuer",
                Attribute::required_string()
                    .with_description("The full Okta authorization server URL. Must start with `https://`.")
                    .with_validator(Validator::HttpsUrl),
            );

        Schema::v0()
            .with_description("Provides an Infra identity provider. This resource can be used to create and manage identity providers.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The identity provider's unique identifier."),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed_string()
                    .with_description("The identity provider's name. If omitted, a name will be automatically generated.")
                    .with_validator(Validator::Name),
            )
            .with_attribute(
                "issuer",
                Attribute::optional_computed_string()
                    .with_description("The identity provider's full authorization server URL. Must start with `https://`.")
                    .with_validator(Validator::HttpsUrl),
            )
            .with_attribute(
                "client_id",
                Attribute::required_string().with_description("The identity provider's OIDC client ID."),
            )
            .with_attribute(
                "client_secret",
                Attribute::required_string()
                    .with_description("The identity provider's OIDC client secret.")
                    .sensitive(),
            )
            .with_block("azure", NestedBlock::single(azure))
            .with_block("google", NestedBlock::single(google))
            .with_block("okta", NestedBlock::single(okta))
            .with_exactly_one_of(["issuer", "google", "azure", "okta"])
    }

    fn importable(&self) -> bool {
        true
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let mut state: IdentityProviderState = decode(planned)?;
        let provider = client.create_provider(&state.request()?).await?;

        state.id = Some(provider.id.to_string());
        state.name = Some(provider.name);
        state.issuer = Some(normalize_issuer(&provider.url));
        encode(&state)
    }

    async fn read(&self, client: &Client, state: Value) -> Result<Value, ProviderError> {
        let mut state: IdentityProviderState = decode(state)?;
        let provider = client.get_provider(state_id(&state.id)?).await?;

        state.name = Some(provider.name);
        state.issuer = Some(normalize_issuer(&provider.url));
        encode(&state)
    }

    async fn update(
        &self,
        client: &Client,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: IdentityProviderState = decode(prior)?;
        let mut state: IdentityProviderState = decode(planned)?;
        state.id = prior.id;

        let id = state_id(&state.id)?;
        let provider = client.update_provider(id, &state.request()?).await?;

        state.name = Some(provider.name);
        state.issuer = Some(normalize_issuer(&provider.url));
        encode(&state)
    }

    async fn delete(&self, client: &Client, state: Value) -> Result<(), ProviderError> {
        let state: IdentityProviderState = decode(state)?;
        client.delete_provider(state_id(&state.id)?).await?;
        Ok(())
    }
}

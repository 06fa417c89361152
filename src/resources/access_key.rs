//! `infra_access_key`
//!
//! Keys expire after `expires_in` (or at `expires_at`) and lapse early when
//! unused for `inactivity_timeout`. Both default to 30 days; connector keys
//! default to 10 years with a 30 day inactivity timeout. The inactivity
//! timeout never exceeds the expiry.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode, encode, non_empty, state_id, Resource};
use crate::client::types::{CreateAccessKeyRequest, ListAccessKeysRequest, Pagination};
use crate::client::Client;
use crate::duration::GoDuration;
use crate::error::ProviderError;
use crate::lookup;
use crate::schema::{Attribute, Equivalence, Schema};
use crate::validators::Validator;

const DEFAULT_EXPIRY: GoDuration = GoDuration::from_hours(30 * 24);
const DEFAULT_INACTIVITY: GoDuration = GoDuration::from_hours(30 * 24);
/// Ten years of 365.25 days.
const CONNECTOR_EXPIRY: GoDuration = GoDuration::from_hours(87_660);
const CONNECTOR_USER: &str = "connector";

/// `infra_access_key`: an access key issued to a user or to the connector.
pub struct AccessKeyResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct AccessKeyState {
    id: Option<String>,
    name: Option<String>,
    secret: Option<String>,
    user_id: Option<String>,
    user_email: Option<String>,
    connector_access_key: Option<bool>,
    expires_in: Option<String>,
    expires_at: Option<String>,
    inactivity_timeout: Option<String>,
}

impl AccessKeyState {
    fn is_connector(&self) -> bool {
        self.connector_access_key.unwrap_or(false)
    }

    /// Lifetime from `expires_in`, else until `expires_at`, else `default`.
    fn expiry(&self, default: GoDuration, now: DateTime<Utc>) -> Result<GoDuration, ProviderError> {
        if let Some(raw) = non_empty(&self.expires_in) {
            return Ok(GoDuration::parse(raw)?);
        }
        if let Some(raw) = non_empty(&self.expires_at) {
            let at = DateTime::parse_from_rfc3339(raw).map_err(|e| {
                ProviderError::Validation(format!("\"expires_at\": invalid RFC3339 value {:?}: {}", raw, e))
            })?;
            return Ok(GoDuration::from_chrono(at.with_timezone(&Utc) - now));
        }
        Ok(default)
    }

    fn inactivity(&self, default: GoDuration) -> Result<GoDuration, ProviderError> {
        match non_empty(&self.inactivity_timeout) {
            Some(raw) => Ok(GoDuration::parse(raw)?),
            None => Ok(default),
        }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Keep the configured timestamp text when it names the same instant.
fn same_instant(configured: &str, actual: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(configured)
        .map(|ts| ts.timestamp() == actual.timestamp())
        .unwrap_or(false)
}

#[async_trait::async_trait]
impl Resource for AccessKeyResource {
    fn type_name(&self) -> &'static str {
        "infra_access_key"
    }

    fn schema(&self) -> Schema {
        let duration = |description: &str| {
            Attribute::optional_computed_string()
                .with_description(description)
                .with_force_new()
                .with_validator(Validator::Duration)
                .with_equivalence(Equivalence::Duration)
        };

        Schema::v0()
            .with_description("Provides an Infra access key. This resource can be used to create and manage access keys.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The access key's unique identifier."),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed_string()
                    .with_description("The access key's name. If omitted, a name will be automatically generated.")
                    .with_force_new()
                    .with_validator(Validator::Name),
            )
            .with_attribute(
                "secret",
                Attribute::computed_string()
                    .with_description("The access key secret.")
                    .sensitive(),
            )
            .with_attribute(
                "user_id",
                Attribute::optional_computed_string()
                    .with_description("The ID of the user for whom this access key is issued.")
                    .with_force_new()
                    .with_validator(Validator::Id),
            )
            .with_attribute(
                "user_email",
                Attribute::optional_computed_string()
                    .with_description("The email of the user for whom this access key is issued.")
                    .with_force_new()
                    .with_validator(Validator::Email),
            )
            .with_attribute(
                "connector_access_key",
                Attribute::optional_bool()
                    .with_description("Issue a `connector` access key. This also changes the default expiration duration to 10 years and inactivity timeout to 30 days.")
                    .with_force_new(),
            )
            .with_attribute(
                "expires_in",
                duration("The total amount of time before the access key expires. Format is a duration string such as \"300s\" or \"2h45m\". Valid time units are \"s\", \"m\", \"h\". Default is 720h0m0s."),
            )
            .with_attribute(
                "expires_at",
                Attribute::optional_computed_string()
                    .with_description("The date-time when the access key will expire. Format is a RFC3339 timestamp, e.g. \"2006-01-02T15:04:05Z07:00\".")
                    .with_force_new()
                    .with_validator(Validator::Rfc3339),
            )
            .with_attribute(
                "inactivity_timeout",
                duration("The amount of time before the access key expires if left unused. If the access key is used before it expires, it will be renewed for the same duration."),
            )
            .with_conflicts(["user_id", "user_email", "connector_access_key"])
            .with_conflicts(["expires_in", "expires_at"])
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let mut state: AccessKeyState = decode(planned)?;

        let (user, default_expiry, default_inactivity) = if state.is_connector() {
            (
                lookup::user_from_email(client, CONNECTOR_USER).await,
                CONNECTOR_EXPIRY,
                DEFAULT_INACTIVITY,
            )
        } else {
            (
                lookup::user_from_id_or_email(
                    client,
                    state.user_id.as_deref(),
                    state.user_email.as_deref(),
                    ["user_id", "user_email"],
                )
                .await,
                DEFAULT_EXPIRY,
                DEFAULT_INACTIVITY,
            )
        };

        let expiry = state.expiry(default_expiry, Utc::now());
        let inactivity = state.inactivity(default_inactivity);

        let (user, expiry, inactivity) = match (user, expiry, inactivity) {
            (Ok(user), Ok(expiry), Ok(inactivity)) => (user, expiry, inactivity.min(expiry)),
            (user, expiry, inactivity) => {
                let diagnostics = [user.err(), expiry.err(), inactivity.err()]
                    .into_iter()
                    .flatten()
                    .flat_map(ProviderError::into_diagnostics)
                    .collect();
                return Err(ProviderError::Diagnostics(diagnostics));
            }
        };

        let key = client
            .create_access_key(&CreateAccessKeyRequest {
                user_id: user.id,
                name: state.name.clone().unwrap_or_default(),
                ttl: expiry,
                extension_deadline: inactivity,
            })
            .await?;
        debug!(id = %key.id, user = %user.id, "created access key");

        state.id = Some(key.id.to_string());
        state.name = Some(key.name);
        state.secret = Some(key.access_key);
        state.expires_in = Some(expiry.truncate_to_seconds().to_string());

        self.read(client, encode(&state)?).await
    }

    async fn read(&self, client: &Client, state: Value) -> Result<Value, ProviderError> {
        let mut state: AccessKeyState = decode(state)?;

        let key = client
            .list_access_keys(&ListAccessKeysRequest {
                name: state.name.clone(),
                show_expired: true,
                pagination: Pagination::first(),
                ..Default::default()
            })
            .await?
            .into_first()
            .ok_or_else(|| ProviderError::NotFound("access key not found".to_string()))?;

        state.user_id = Some(key.issued_for.to_string());
        state.user_email = Some(key.issued_for_name);
        if let Some(expires) = key.expires {
            let keep = non_empty(&state.expires_at).is_some_and(|prior| same_instant(prior, expires));
            if !keep {
                state.expires_at = Some(format_timestamp(expires));
            }
        }
        encode(&state)
    }

    async fn delete(&self, client: &Client, state: Value) -> Result<(), ProviderError> {
        let state: AccessKeyState = decode(state)?;
        client.delete_access_key(state_id(&state.id)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation;
    use chrono::TimeZone;
    use serde_json::json;

    fn state(value: Value) -> AccessKeyState {
        decode(value).unwrap()
    }

    #[test]
    fn test_expiry_sources() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let s = state(json!({}));
        assert_eq!(s.expiry(DEFAULT_EXPIRY, now).unwrap(), GoDuration::from_hours(720));

        let s = state(json!({"expires_in": "1h30m"}));
        assert_eq!(s.expiry(DEFAULT_EXPIRY, now).unwrap(), GoDuration::from_secs(5400));

        let s = state(json!({"expires_at": "2026-01-02T00:00:00Z"}));
        assert_eq!(s.expiry(DEFAULT_EXPIRY, now).unwrap(), GoDuration::from_hours(24));

        let s = state(json!({"expires_in": "2h", "expires_at": "2026-01-02T00:00:00Z"}));
        assert_eq!(s.expiry(DEFAULT_EXPIRY, now).unwrap(), GoDuration::from_hours(2));

        let s = state(json!({"expires_in": "soon"}));
        assert!(s.expiry(DEFAULT_EXPIRY, now).is_err());
    }

    #[test]
    fn test_connector_expiry_is_ten_years() {
        assert_eq!(CONNECTOR_EXPIRY.to_string(), "87660h0m0s");
        assert_eq!(DEFAULT_EXPIRY.to_string(), "720h0m0s");
    }

    #[test]
    fn test_same_instant() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).unwrap();
        assert!(same_instant("2026-01-02T01:00:00+01:00", ts));
        assert!(!same_instant("2026-01-02T00:00:01Z", ts));
        assert_eq!(format_timestamp(ts), "2026-01-02T00:00:00Z");
    }

    #[test]
    fn test_schema_conflicts() {
        let schema = AccessKeyResource.schema();
        assert!(validation::validate(&schema, &json!({"user_email": "a@example.com"})).is_empty());

        let diagnostics = validation::validate(
            &schema,
            &json!({"user_email": "a@example.com", "connector_access_key": true}),
        );
        assert_eq!(diagnostics.len(), 2);

        let diagnostics = validation::validate(
            &schema,
            &json!({"expires_in": "1h", "expires_at": "2026-01-02T00:00:00Z"}),
        );
        assert_eq!(diagnostics.len(), 2);
    }
}

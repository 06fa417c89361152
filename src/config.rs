//! Provider configuration.
//!
//! Every setting can come from the provider block or from an `INFRA_*`
//! environment variable; the provider block wins.

use serde::Deserialize;
use serde_json::Value;

use crate::client::ClientOptions;
use crate::error::ProviderError;
use crate::pem;
use crate::schema::{Attribute, Schema};
use crate::validators::Validator;

/// Host used when neither the provider block nor `INFRA_HOST` names one.
pub const DEFAULT_HOST: &str = "https://api.infrahq.com";

/// Environment variable names.
pub mod env {
    /// Server URL.
    pub const HOST: &str = "INFRA_HOST";
    /// Access key.
    pub const ACCESS_KEY: &str = "INFRA_ACCESS_KEY";
    /// Skip server certificate verification.
    pub const SKIP_TLS_VERIFY: &str = "INFRA_SKIP_TLS_VERIFY";
    /// PEM-encoded server certificate.
    pub const SERVER_CERTIFICATE: &str = "INFRA_SERVER_CERTIFICATE";
    /// Path to a PEM-encoded server certificate.
    pub const SERVER_CERTIFICATE_FILE: &str = "INFRA_SERVER_CERTIFICATE_FILE";
}

/// The provider block as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Infra server URL.
    pub host: Option<String>,
    /// Access key used as the bearer token.
    pub access_key: Option<String>,
    /// Accept any server certificate.
    pub skip_tls_verify: Option<bool>,
    /// PEM-encoded certificate to trust.
    pub server_certificate: Option<String>,
    /// File holding a PEM-encoded certificate to trust.
    pub server_certificate_file: Option<String>,
}

impl ProviderConfig {
    /// Decode the provider block; `null` means an empty block.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Fill unset fields from `lookup` and build client options.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn resolve<F>(self, lookup: F) -> Result<ClientOptions, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_env = |value: Option<String>, key: &str| {
            value
                .filter(|v| !v.is_empty())
                .or_else(|| lookup(key).filter(|v| !v.is_empty()))
        };

        let host = from_env(self.host, env::HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let access_key = from_env(self.access_key, env::ACCESS_KEY).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "\"access_key\": required field is not set; set it in the provider block or {}",
                env::ACCESS_KEY
            ))
        })?;
        // trust settings resolve as a group: any of them in the block hides the environment
        let block_sets_trust = self.skip_tls_verify.is_some()
            || non_empty(&self.server_certificate)
            || non_empty(&self.server_certificate_file);
        let (skip_tls_verify, certificate, certificate_file) = if block_sets_trust {
            (
                self.skip_tls_verify.unwrap_or(false),
                self.server_certificate.filter(|v| !v.is_empty()),
                self.server_certificate_file.filter(|v| !v.is_empty()),
            )
        } else {
            let skip = match lookup(env::SKIP_TLS_VERIFY).filter(|v| !v.is_empty()) {
                Some(raw) => parse_bool(&raw).ok_or_else(|| {
                    ProviderError::Configuration(format!(
                        "{}: invalid boolean {:?}",
                        env::SKIP_TLS_VERIFY,
                        raw
                    ))
                })?,
                None => false,
            };
            (
                skip,
                from_env(None, env::SERVER_CERTIFICATE),
                from_env(None, env::SERVER_CERTIFICATE_FILE),
            )
        };

        let trust_settings = [skip_tls_verify, certificate.is_some(), certificate_file.is_some()];
        if trust_settings.iter().filter(|set| **set).count() > 1 {
            return Err(ProviderError::Configuration(
                "only one of `skip_tls_verify,server_certificate,server_certificate_file` can be specified"
                    .to_string(),
            ));
        }

        let server_certificate = match (certificate, certificate_file) {
            (Some(data), _) => Some(pem::decode(&data, pem::CERTIFICATE)?),
            (None, Some(path)) => Some(pem::decode_file(path, pem::CERTIFICATE)?),
            (None, None) => None,
        };

        Ok(ClientOptions {
            host,
            access_key,
            skip_tls_verify,
            server_certificate,
        })
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "host",
                Attribute::optional_string()
                    .with_description("The Infra server instance Terraform will communicate with. Can also be sourced from `INFRA_HOST`.")
                    .with_default(Value::String(DEFAULT_HOST.to_string()))
                    .with_validator(Validator::HttpsUrl),
            )
            .with_attribute(
                "access_key",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("The access key used to authenticate with the Infra server. Can also be sourced from `INFRA_ACCESS_KEY`."),
            )
            .with_attribute(
                "skip_tls_verify",
                Attribute::optional_bool().with_description(
                    "Controls client verification of the server certificate. This should only be `true` for testing or development. Can also be sourced from `INFRA_SKIP_TLS_VERIFY`.",
                ),
            )
            .with_attribute(
                "server_certificate",
                Attribute::optional_string()
                    .with_description("The server's PEM-encoded public certificate for client verification. Can also be sourced from `INFRA_SERVER_CERTIFICATE`.")
                    .with_validator(Validator::PemCertificate),
            )
            .with_attribute(
                "server_certificate_file",
                Attribute::optional_string()
                    .with_description("The server's PEM-encoded public certificate file for client verification. Can also be sourced from `INFRA_SERVER_CERTIFICATE_FILE`.")
                    .with_validator(Validator::PemCertificateFile),
            )
            .with_conflicts(["skip_tls_verify", "server_certificate", "server_certificate_file"])
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Booleans as accepted by Go's `strconv.ParseBool`.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;

    const CERT: &str = "-----BEGIN CERTIFICATE-----\naGVsbG8gd29ybGQ=\n-----END CERTIFICATE-----\n";

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_and_env_fallback() {
        let options = ProviderConfig::default()
            .resolve(vars(&[(env::ACCESS_KEY, "key.secret")]))
            .unwrap();
        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.access_key, "key.secret");
        assert!(!options.skip_tls_verify);
        assert!(options.server_certificate.is_none());
    }

    #[test]
    fn test_block_wins_over_env() {
        let config = ProviderConfig::from_value(&json!({
            "host": "https://infra.example.com",
            "access_key": "from.block",
        }))
        .unwrap();
        let options = config
            .resolve(vars(&[
                (env::HOST, "https://other.example.com"),
                (env::ACCESS_KEY, "from.env"),
            ]))
            .unwrap();
        assert_eq!(options.host, "https://infra.example.com");
        assert_eq!(options.access_key, "from.block");
    }

    #[test]
    fn test_missing_access_key() {
        let err = ProviderConfig::default().resolve(vars(&[])).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_skip_tls_verify_from_env() {
        let options = ProviderConfig::default()
            .resolve(vars(&[(env::ACCESS_KEY, "k"), (env::SKIP_TLS_VERIFY, "1")]))
            .unwrap();
        assert!(options.skip_tls_verify);

        let err = ProviderConfig::default()
            .resolve(vars(&[(env::ACCESS_KEY, "k"), (env::SKIP_TLS_VERIFY, "yes")]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid boolean"));
    }

    #[test]
    fn test_certificate_sources() {
        let options = ProviderConfig::default()
            .resolve(vars(&[(env::ACCESS_KEY, "k"), (env::SERVER_CERTIFICATE, CERT)]))
            .unwrap();
        assert_eq!(options.server_certificate.unwrap().contents, b"hello world");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CERT.as_bytes()).unwrap();
        let config = ProviderConfig {
            server_certificate_file: Some(file.path().display().to_string()),
            ..Default::default()
        };
        let options = config.resolve(vars(&[(env::ACCESS_KEY, "k")])).unwrap();
        assert!(options.server_certificate.is_some());
    }

    #[test]
    fn test_conflicting_trust_settings() {
        let config = ProviderConfig {
            skip_tls_verify: Some(true),
            server_certificate: Some(CERT.to_string()),
            ..Default::default()
        };
        assert!(config.resolve(vars(&[(env::ACCESS_KEY, "k")])).is_err());
    }

    #[test]
    fn test_block_certificate_hides_env_skip_tls_verify() {
        let config = ProviderConfig {
            server_certificate: Some(CERT.to_string()),
            ..Default::default()
        };
        let options = config
            .resolve(vars(&[(env::ACCESS_KEY, "k"), (env::SKIP_TLS_VERIFY, "true")]))
            .unwrap();
        assert!(!options.skip_tls_verify);
        assert!(options.server_certificate.is_some());

        let config = ProviderConfig {
            skip_tls_verify: Some(false),
            ..Default::default()
        };
        let options = config
            .resolve(vars(&[(env::ACCESS_KEY, "k"), (env::SERVER_CERTIFICATE, CERT)]))
            .unwrap();
        assert!(options.server_certificate.is_none());
    }

    #[test]
    fn test_conflicting_trust_settings_in_env() {
        let err = ProviderConfig::default()
            .resolve(vars(&[
                (env::ACCESS_KEY, "k"),
                (env::SKIP_TLS_VERIFY, "true"),
                (env::SERVER_CERTIFICATE, CERT),
            ]))
            .unwrap_err();
        assert!(err.to_string().contains("only one of"));
    }

    #[test]
    fn test_schema_validation() {
        let schema = ProviderConfig::schema();
        assert!(crate::validation::validate(&schema, &json!({"host": "https://infra.example.com"})).is_empty());
        assert_eq!(
            crate::validation::validate(&schema, &json!({"host": "http://infra.example.com"})).len(),
            1
        );
    }
}

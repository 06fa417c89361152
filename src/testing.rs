//! Drive a [`ProviderService`] through host-like call sequences without a
//! gRPC server.
//!
//! ```ignore
//! // `host` only accepts https, so a plain-http mock server comes in
//! // through the environment lookup.
//! let uri = server.uri();
//! let provider = InfraProvider::new()
//!     .with_environment(move |key| (key == env::HOST).then(|| uri.clone()));
//! let tester = ProviderTester::new(provider);
//! tester.configure(json!({"access_key": KEY})).await?;
//! let state = tester.apply("infra_group", json!({"name": "developers"})).await?;
//! assert_eq!(state["name"], "developers");
//! ```

use std::fmt;

use serde_json::Value;

use crate::error::ProviderError;
use crate::plan::PlanResult;
use crate::schema::Diagnostic;
use crate::server::{ImportedResource, ProviderService};

/// A host stand-in for one provider instance.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Validate and apply the provider configuration.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        check(self.provider.validate_provider_config(config.clone()).await?)?;
        check(self.provider.configure(config).await?)
    }

    /// Validate a resource configuration.
    pub async fn validate(&self, resource_type: &str, config: Value) -> Result<(), TestError> {
        check(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Plan `config` against `prior` (None on create).
    pub async fn plan(
        &self,
        resource_type: &str,
        prior: Option<Value>,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, prior, config.clone(), config)
            .await
    }

    /// Validate, plan, create, then read back.
    pub async fn apply(&self, resource_type: &str, config: Value) -> Result<Value, TestError> {
        self.validate(resource_type, config.clone()).await?;
        let plan = self.plan(resource_type, None, config).await?;
        let created = self
            .provider
            .create(resource_type, plan.planned_state)
            .await?;
        Ok(self.provider.read(resource_type, created).await?)
    }

    /// Move `prior` to `config` the way a host would: a replacement when the
    /// plan requires one, an in-place update otherwise.
    pub async fn reapply(
        &self,
        resource_type: &str,
        prior: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate(resource_type, config.clone()).await?;
        let plan = self
            .plan(resource_type, Some(prior.clone()), config)
            .await?;

        let state = if plan.requires_replace {
            self.provider.delete(resource_type, prior).await?;
            self.provider
                .create(resource_type, plan.planned_state)
                .await?
        } else if plan.has_changes() {
            self.provider
                .update(resource_type, prior, plan.planned_state)
                .await?
        } else {
            prior
        };
        Ok(self.provider.read(resource_type, state).await?)
    }

    /// Refresh a resource; `Value::Null` when it is gone.
    pub async fn read(&self, resource_type: &str, state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, state).await
    }

    /// Delete a resource.
    pub async fn destroy(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, state).await
    }

    /// Import an entity by ID.
    pub async fn import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Validate a data source configuration and read it.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, TestError> {
        check(
            self.provider
                .validate_data_source_config(data_source_type, config.clone())
                .await?,
        )?;
        Ok(self
            .provider
            .read_data_source(data_source_type, config)
            .await?)
    }
}

/// A failed tester step.
#[derive(Debug)]
pub enum TestError {
    /// Validation or configuration produced error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The provider returned an error.
    Provider(ProviderError),
}

impl TestError {
    /// The error diagnostics, whichever way they were reported.
    pub fn diagnostics(self) -> Vec<Diagnostic> {
        match self {
            Self::Diagnostics(diagnostics) => diagnostics,
            Self::Provider(err) => err.into_diagnostics(),
        }
    }
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Diagnostics(diagnostics) => {
                write!(f, "{} error diagnostic(s)", diagnostics.len())?;
                for d in diagnostics {
                    write!(f, "\n  {}", d.summary)?;
                    if let Some(attribute) = &d.attribute {
                        write!(f, " (at {})", attribute)?;
                    }
                }
                Ok(())
            }
            Self::Provider(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

fn check(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InfraProvider;
    use serde_json::json;

    fn tester() -> ProviderTester<InfraProvider> {
        ProviderTester::new(InfraProvider::new().with_environment(|_| None))
    }

    #[tokio::test]
    async fn test_validation_stops_apply() {
        let err = tester()
            .apply("infra_group", json!({"name": "na@me"}))
            .await
            .unwrap_err();
        let diagnostics = err.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
    }

    #[tokio::test]
    async fn test_plan_create() {
        let plan = tester()
            .plan("infra_group", None, json!({"name": "developers", "id": null}))
            .await
            .unwrap();
        assert!(plan.has_changes());
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_display_lists_attributes() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("bad name").with_attribute("name")
        ]);
        assert_eq!(err.to_string(), "1 error diagnostic(s)\n  bad name (at name)");
    }
}

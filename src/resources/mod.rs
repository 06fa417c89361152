//! Managed resources.
//!
//! Each resource works on JSON state at the trait boundary and on a typed
//! serde model inside.

mod access_key;
mod grant;
mod group;
mod group_membership;
mod identity_provider;
mod settings;
mod user;

pub use access_key::AccessKeyResource;
pub use grant::GrantResource;
pub use group::GroupResource;
pub use group_membership::GroupMembershipResource;
pub use identity_provider::IdentityProviderResource;
pub use settings::SettingsResource;
pub use user::UserResource;

use serde_json::{json, Value};

use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::Schema;

pub(crate) use crate::state::{decode, encode, non_empty, single_block, state_id};

/// CRUD handlers for one resource type.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Type name as used in configuration, e.g. `infra_user`.
    fn type_name(&self) -> &'static str;

    /// Schema of the resource's configuration and state.
    fn schema(&self) -> Schema;

    /// Whether `terraform import` can adopt an existing entity by ID.
    fn importable(&self) -> bool {
        false
    }

    /// Create the remote entity and return its state.
    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh `state` from the remote entity.
    ///
    /// Returns [`ProviderError::NotFound`] when the entity is gone.
    async fn read(&self, client: &Client, state: Value) -> Result<Value, ProviderError>;

    /// Apply in-place changes.
    ///
    /// Only reached for resources with mutable attributes; every attribute of
    /// the others is force-new.
    async fn update(
        &self,
        client: &Client,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (client, prior, planned);
        Err(ProviderError::Unimplemented(format!(
            "{} does not support in-place updates",
            self.type_name()
        )))
    }

    /// Delete the remote entity.
    async fn delete(&self, client: &Client, state: Value) -> Result<(), ProviderError>;

    /// Build the state `read` needs to adopt the entity with `id`.
    fn import_state(&self, id: &str) -> Value {
        json!({ "id": id })
    }
}

/// Every resource this provider manages.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(UserResource),
        Box::new(GroupResource),
        Box::new(GroupMembershipResource),
        Box::new(GrantResource),
        Box::new(IdentityProviderResource),
        Box::new(AccessKeyResource),
        Box::new(SettingsResource),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_are_unique() {
        let resources = all();
        let names: HashSet<_> = resources.iter().map(|r| r.type_name()).collect();
        assert_eq!(names.len(), resources.len());
        assert!(names.contains("infra_user"));
        assert!(names.contains("infra_settings"));
    }

    #[test]
    fn test_every_schema_declares_id() {
        for resource in all() {
            let schema = resource.schema();
            assert!(
                schema.block.attributes.get("id").is_some_and(|a| a.flags.computed),
                "{} has no computed id",
                resource.type_name()
            );
        }
    }
}

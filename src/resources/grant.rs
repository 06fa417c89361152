use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode, encode, non_empty, single_block, state_id, Resource};
use crate::client::types::{CreateGrantRequest, Grant};
use crate::client::Client;
use crate::error::ProviderError;
use crate::lookup;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::validators::Validator;

/// Resource name of grants on Infra itself.
const INFRA_RESOURCE: &str = "infra";

/// `infra_grant`: a privilege on Infra or on a Kubernetes cluster, held by a
/// user or a group.
pub struct GrantResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct GrantState {
    id: Option<String>,
    user_id: Option<String>,
    user_name: Option<String>,
    group_id: Option<String>,
    group_name: Option<String>,
    #[serde(deserialize_with = "single_block::deserialize")]
    infra: Option<InfraGrant>,
    #[serde(deserialize_with = "single_block::deserialize")]
    kubernetes: Option<KubernetesGrant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct InfraGrant {
    role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct KubernetesGrant {
    role: String,
    cluster: String,
    namespace: Option<String>,
}

impl KubernetesGrant {
    /// `cluster` or `cluster.namespace`.
    fn resource(&self) -> String {
        match non_empty(&self.namespace) {
            Some(namespace) => format!("{}.{}", self.cluster, namespace),
            None => self.cluster.clone(),
        }
    }

    /// Split a grant resource at its first `.`.
    fn from_grant(grant: &Grant) -> Self {
        let (cluster, namespace) = match grant.resource.split_once('.') {
            Some((cluster, namespace)) => (cluster, Some(namespace.to_string())),
            None => (grant.resource.as_str(), None),
        };
        Self {
            role: grant.privilege.clone(),
            cluster: cluster.to_string(),
            namespace,
        }
    }
}

impl GrantState {
    fn privilege_and_resource(&self) -> Result<(String, String), ProviderError> {
        match (&self.infra, &self.kubernetes) {
            (Some(infra), None) => Ok((infra.role.clone(), INFRA_RESOURCE.to_string())),
            (None, Some(kubernetes)) => Ok((kubernetes.role.clone(), kubernetes.resource())),
            _ => Err(ProviderError::Validation(
                "exactly one of `infra,kubernetes` must be specified".to_string(),
            )),
        }
    }

    fn has_user(&self) -> bool {
        non_empty(&self.user_id).is_some() || non_empty(&self.user_name).is_some()
    }
}

#[async_trait::async_trait]
impl Resource for GrantResource {
    fn type_name(&self) -> &'static str {
        "infra_grant"
    }

    fn schema(&self) -> Schema {
        let subject = |description: &str, validator: Validator| {
            Attribute::optional_computed_string()
                .with_description(description)
                .with_force_new()
                .with_validator(validator)
        };

        let infra = Block::new()
            .with_description("Infra grant configurations.")
            .with_attribute(
                "role",
                Attribute::required_string()
                    .with_description("The name of the Infra role to assign to the user. Valid roles are `admin` or `view`.")
                    .with_force_new()
                    .with_validator(Validator::OneOf {
                        values: vec!["admin", "view"],
                        ignore_case: true,
                    }),
            );

        let kubernetes = Block::new()
            .with_description("Kubernetes grant configurations.")
            .with_attribute(
                "role",
                Attribute::required_string()
                    .with_description("The name of the Kubernetes ClusterRole to assign to the user.")
                    .with_force_new(),
            )
            .with_attribute(
                "cluster",
                Attribute::required_string()
                    .with_description("The name of the Kubernetes cluster to assign to the user.")
                    .with_force_new(),
            )
            .with_attribute(
                "namespace",
                Attribute::optional_string()
                    .with_description("The namespace of the Kubernetes cluster to assign to the user.")
                    .with_force_new(),
            );

        Schema::v0()
            .with_description("Provides an Infra grant. This resource can be used to assign grants to users or groups.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The grant's unique identifier."),
            )
            .with_attribute("user_id", subject("The ID of the user to assign this grant.", Validator::Id))
            .with_attribute(
                "user_name",
                subject("The email of the user to assign this grant.", Validator::Email),
            )
            .with_attribute("group_id", subject("The ID of the group to assign this grant.", Validator::Id))
            .with_attribute(
                "group_name",
                subject("The name of the group to assign this grant.", Validator::Name),
            )
            .with_block("infra", NestedBlock::single(infra))
            .with_block("kubernetes", NestedBlock::single(kubernetes))
            .with_exactly_one_of(["user_id", "user_name", "group_id", "group_name"])
            .with_exactly_one_of(["infra", "kubernetes"])
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let mut state: GrantState = decode(planned)?;
        let (privilege, resource) = state.privilege_and_resource()?;
        let mut request = CreateGrantRequest {
            privilege,
            resource,
            ..Default::default()
        };

        if state.has_user() {
            let user = lookup::user_from_id_or_email(
                client,
                state.user_id.as_deref(),
                state.user_name.as_deref(),
                ["user_id", "user_name"],
            )
            .await?;
            request.user = user.id;
            state.user_id = Some(user.id.to_string());
            state.user_name = Some(user.name);
        } else {
            let group = lookup::group_from_id_or_name(
                client,
                state.group_id.as_deref(),
                state.group_name.as_deref(),
                ["group_id", "group_name"],
            )
            .await?;
            request.group = group.id;
            state.group_id = Some(group.id.to_string());
            state.group_name = Some(group.name);
        }

        let grant = client.create_grant(&request).await?;
        debug!(id = %grant.id, resource = %grant.resource, "created grant");

        state.id = Some(grant.id.to_string());
        encode(&state)
    }

    async fn read(&self, client: &Client, state: Value) -> Result<Value, ProviderError> {
        let mut state: GrantState = decode(state)?;
        let grant = client.get_grant(state_id(&state.id)?).await?;

        if !grant.user.is_zero() {
            let user = client.get_user(grant.user).await?;
            state.user_id = Some(user.id.to_string());
            state.user_name = Some(user.name);
        }
        if !grant.group.is_zero() {
            let group = client.get_group(grant.group).await?;
            state.group_id = Some(group.id.to_string());
            state.group_name = Some(group.name);
        }

        if grant.resource == INFRA_RESOURCE {
            // roles are case-insensitive; keep the configured spelling
            let role = match &state.infra {
                Some(prior) if prior.role.eq_ignore_ascii_case(&grant.privilege) => {
                    prior.role.clone()
                }
                _ => grant.privilege.clone(),
            };
            state.infra = Some(InfraGrant { role });
            state.kubernetes = None;
        } else {
            state.kubernetes = Some(KubernetesGrant::from_grant(&grant));
            state.infra = None;
        }

        encode(&state)
    }

    async fn delete(&self, client: &Client, state: Value) -> Result<(), ProviderError> {
        let state: GrantState = decode(state)?;
        client.delete_grant(state_id(&state.id)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;
    use crate::validation;
    use serde_json::json;

    #[test]
    fn test_kubernetes_resource_round_trip() {
        let grant = Grant {
            id: Id::new(1),
            privilege: "edit".into(),
            resource: "production.web.v2".into(),
            ..Default::default()
        };
        let kubernetes = KubernetesGrant::from_grant(&grant);
        assert_eq!(kubernetes.cluster, "production");
        assert_eq!(kubernetes.namespace.as_deref(), Some("web.v2"));
        assert_eq!(kubernetes.resource(), "production.web.v2");

        let cluster_only = KubernetesGrant {
            role: "view".into(),
            cluster: "production".into(),
            namespace: Some(String::new()),
        };
        assert_eq!(cluster_only.resource(), "production");
    }

    #[test]
    fn test_privilege_and_resource() {
        let state: GrantState =
            decode(json!({"user_name": "a@b.co", "infra": [{"role": "Admin"}]})).unwrap();
        assert_eq!(
            state.privilege_and_resource().unwrap(),
            ("Admin".to_string(), "infra".to_string())
        );
        assert!(state.has_user());

        let state: GrantState = decode(json!({"group_name": "devs"})).unwrap();
        assert!(state.privilege_and_resource().is_err());
    }

    #[test]
    fn test_schema_constraints() {
        let schema = GrantResource.schema();
        let ok = json!({"group_name": "devs", "infra": {"role": "VIEW"}});
        assert!(validation::validate(&schema, &ok).is_empty());

        let bad_role = json!({"group_name": "devs", "infra": {"role": "owner"}});
        assert_eq!(validation::validate(&schema, &bad_role).len(), 1);

        let both = json!({
            "group_name": "devs",
            "infra": {"role": "view"},
            "kubernetes": {"role": "edit", "cluster": "prod"},
        });
        assert_eq!(validation::validate(&schema, &both).len(), 1);
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{decode, encode, state_id, Resource};
use crate::client::types::UpdateUsersInGroupRequest;
use crate::client::Client;
use crate::error::ProviderError;
use crate::lookup;
use crate::schema::{Attribute, Schema};
use crate::validators::Validator;

/// `infra_group_membership`: one user's membership in one group.
///
/// The API has no membership entity, so the ID is `<user name>/<group name>`.
pub struct GroupMembershipResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct MembershipState {
    id: Option<String>,
    user_id: Option<String>,
    user_name: Option<String>,
    group_id: Option<String>,
    group_name: Option<String>,
}

#[async_trait::async_trait]
impl Resource for GroupMembershipResource {
    fn type_name(&self) -> &'static str {
        "infra_group_membership"
    }

    fn schema(&self) -> Schema {
        let member = |description: &str, validator: Validator| {
            Attribute::optional_computed_string()
                .with_description(description)
                .with_force_new()
                .with_validator(validator)
        };

        Schema::v0()
            .with_description("Provides an Infra group membership. This resource can be used to assign users to groups.")
            .with_attribute(
                "id",
                Attribute::computed_string().with_description("The membership's identifier."),
            )
            .with_attribute("user_id", member("The user ID to add to the group.", Validator::Id))
            .with_attribute(
                "user_name",
                member("The user name to add to the group.", Validator::Email),
            )
            .with_attribute("group_id", member("The group ID to add the user to.", Validator::Id))
            .with_attribute(
                "group_name",
                member("The group name to add the user to.", Validator::Name),
            )
            .with_exactly_one_of(["user_id", "user_name"])
            .with_exactly_one_of(["group_id", "group_name"])
    }

    async fn create(&self, client: &Client, planned: Value) -> Result<Value, ProviderError> {
        let mut state: MembershipState = decode(planned)?;

        let user = lookup::user_from_id_or_email(
            client,
            state.user_id.as_deref(),
            state.user_name.as_deref(),
            ["user_id", "user_name"],
        )
        .await;
        let group = lookup::group_from_id_or_name(
            client,
            state.group_id.as_deref(),
            state.group_name.as_deref(),
            ["group_id", "group_name"],
        )
        .await;

        let (user, group) = match (user, group) {
            (Ok(user), Ok(group)) => (user, group),
            (user, group) => {
                let diagnostics = [user.err(), group.err()]
                    .into_iter()
                    .flatten()
                    .flat_map(ProviderError::into_diagnostics)
                    .collect();
                return Err(ProviderError::Diagnostics(diagnostics));
            }
        };

        client
            .update_users_in_group(&UpdateUsersInGroupRequest {
                group_id: group.id,
                user_ids_to_add: vec![user.id],
                ..Default::default()
            })
            .await?;
        debug!(user = %user.id, group = %group.id, "added user to group");

        state.id = Some(format!("{}/{}", user.name, group.name));
        state.user_id = Some(user.id.to_string());
        state.user_name = Some(user.name);
        state.group_id = Some(group.id.to_string());
        state.group_name = Some(group.name);
        encode(&state)
    }

    async fn read(&self, client: &Client, state: Value) -> Result<Value, ProviderError> {
        let mut state: MembershipState = decode(state)?;

        let user = client.get_user(state_id(&state.user_id)?).await?;
        let group = client.get_group(state_id(&state.group_id)?).await?;

        state.user_name = Some(user.name);
        state.group_name = Some(group.name);
        encode(&state)
    }

    async fn delete(&self, client: &Client, state: Value) -> Result<(), ProviderError> {
        let state: MembershipState = decode(state)?;

        client
            .update_users_in_group(&UpdateUsersInGroupRequest {
                group_id: state_id(&state.group_id)?,
                user_ids_to_remove: vec![state_id(&state.user_id)?],
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation;
    use serde_json::json;

    #[test]
    fn test_exactly_one_user_and_one_group() {
        let schema = GroupMembershipResource.schema();
        assert!(validation::validate(
            &schema,
            &json!({"user_name": "alice@example.com", "group_name": "developers"})
        )
        .is_empty());

        let diagnostics = validation::validate(
            &schema,
            &json!({"user_id": "2", "user_name": "alice@example.com", "group_name": "developers"}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].detail.as_deref().unwrap_or_default().contains("user_id,user_name"));

        let diagnostics = validation::validate(&schema, &json!({"user_id": "2"}));
        assert_eq!(diagnostics.len(), 1);
    }
}

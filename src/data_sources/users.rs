use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{digest_ids, DataSource};
use crate::client::types::{ListGroupsRequest, ListUsersRequest, Pagination};
use crate::client::Client;
use crate::error::ProviderError;
use crate::lookup;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::state::{decode, encode, non_empty, single_block};
use crate::validators::Validator;

/// `infra_users`
pub struct UsersDataSource;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct UsersState {
    id: Option<String>,
    #[serde(deserialize_with = "single_block::deserialize")]
    filter: Option<Filter>,
    include_groups: Option<bool>,
    users: Option<Vec<UserItem>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Filter {
    name: Option<String>,
    group_id: Option<String>,
    group_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserItem {
    id: String,
    name: String,
    groups: Option<Vec<String>>,
}

#[async_trait::async_trait]
impl DataSource for UsersDataSource {
    fn type_name(&self) -> &'static str {
        "infra_users"
    }

    fn schema(&self) -> Schema {
        let filter = Block::new()
            .with_attribute(
                "name",
                Attribute::optional_string().with_description("The name of the user."),
            )
            .with_attribute(
                "group_id",
                Attribute::optional_string()
                    .with_description("The ID of the group where user is a member.")
                    .with_validator(Validator::Id),
            )
            .with_attribute(
                "group_name",
                Attribute::optional_string()
                    .with_description("The name of the group where user is a member."),
            )
            .with_conflicts(["group_id", "group_name"]);

        let item = AttributeType::object([
            ("id", AttributeType::String),
            ("name", AttributeType::String),
            ("groups", AttributeType::list(AttributeType::String)),
        ]);

        Schema::v0()
            .with_description("Get a list of Infra users.")
            .with_attribute("id", Attribute::computed_string())
            .with_block("filter", NestedBlock::single(filter))
            .with_attribute(
                "include_groups",
                Attribute::optional_bool()
                    .with_description("Include each user's group membership.")
                    .with_default(Value::Bool(false)),
            )
            .with_attribute(
                "users",
                Attribute::new(AttributeType::list(item), AttributeFlags::computed())
                    .with_description("The matching users."),
            )
    }

    async fn read(&self, client: &Client, config: Value) -> Result<Value, ProviderError> {
        let mut state: UsersState = decode(config)?;

        let mut request = ListUsersRequest {
            pagination: Pagination::all(),
            ..Default::default()
        };
        if let Some(filter) = &state.filter {
            request.name = filter.name.clone();
            if non_empty(&filter.group_id).is_some() || non_empty(&filter.group_name).is_some() {
                let group = lookup::group_from_id_or_name(
                    client,
                    filter.group_id.as_deref(),
                    filter.group_name.as_deref(),
                    ["filter.group_id", "filter.group_name"],
                )
                .await?;
                request.group = Some(group.id);
            }
        }

        let response = client.list_users(&request).await?;
        let include_groups = state.include_groups.unwrap_or(false);

        let mut users = Vec::with_capacity(response.items.len());
        for user in &response.items {
            let groups = if include_groups {
                let memberships = client
                    .list_groups(&ListGroupsRequest {
                        user_id: Some(user.id),
                        pagination: Pagination::all(),
                        ..Default::default()
                    })
                    .await?;
                Some(memberships.items.into_iter().map(|g| g.name).collect())
            } else {
                None
            };
            users.push(UserItem {
                id: user.id.to_string(),
                name: user.name.clone(),
                groups,
            });
        }

        state.id = Some(digest_ids(response.items.iter().map(|u| u.id)));
        state.users = Some(users);
        encode(&state)
    }
}

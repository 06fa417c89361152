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

/// `infra_groups`
pub struct GroupsDataSource;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct GroupsState {
    id: Option<String>,
    #[serde(deserialize_with = "single_block::deserialize")]
    filter: Option<Filter>,
    include_users: Option<bool>,
    groups: Option<Vec<GroupItem>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Filter {
    name: Option<String>,
    user_id: Option<String>,
    user_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroupItem {
    id: String,
    name: String,
    users: Option<Vec<String>>,
}

#[async_trait::async_trait]
impl DataSource for GroupsDataSource {
    fn type_name(&self) -> &'static str {
        "infra_groups"
    }

    fn schema(&self) -> Schema {
        let filter = Block::new()
            .with_attribute(
                "name",
                Attribute::optional_string().with_description("The name of the group."),
            )
            .with_attribute(
                "user_id",
                Attribute::optional_string()
                    .with_description("The ID of the user who belongs to this group.")
                    .with_validator(Validator::Id),
            )
            .with_attribute(
                "user_name",
                Attribute::optional_string()
                    .with_description("The name of the user who belongs to this group.")
                    .with_validator(Validator::Email),
            )
            .with_conflicts(["user_id", "user_name"]);

        let item = AttributeType::object([
            ("id", AttributeType::String),
            ("name", AttributeType::String),
            ("users", AttributeType::list(AttributeType::String)),
        ]);

        Schema::v0()
            .with_description("Get a list of Infra groups.")
            .with_attribute("id", Attribute::computed_string())
            .with_block("filter", NestedBlock::single(filter))
            .with_attribute(
                "include_users",
                Attribute::optional_bool()
                    .with_description("Include each group's members.")
                    .with_default(Value::Bool(false)),
            )
            .with_attribute(
                "groups",
                Attribute::new(AttributeType::list(item), AttributeFlags::computed())
                    .with_description("The matching groups."),
            )
    }

    async fn read(&self, client: &Client, config: Value) -> Result<Value, ProviderError> {
        let mut state: GroupsState = decode(config)?;

        let mut request = ListGroupsRequest {
            pagination: Pagination::all(),
            ..Default::default()
        };
        if let Some(filter) = &state.filter {
            request.name = filter.name.clone();
            if non_empty(&filter.user_id).is_some() || non_empty(&filter.user_name).is_some() {
                let user = lookup::user_from_id_or_email(
                    client,
                    filter.user_id.as_deref(),
                    filter.user_name.as_deref(),
                    ["filter.user_id", "filter.user_name"],
                )
                .await?;
                request.user_id = Some(user.id);
            }
        }

        let response = client.list_groups(&request).await?;
        let include_users = state.include_users.unwrap_or(false);

        let mut groups = Vec::with_capacity(response.items.len());
        for group in &response.items {
            let users = if include_users {
                let members = client
                    .list_users(&ListUsersRequest {
                        group: Some(group.id),
                        pagination: Pagination::all(),
                        ..Default::default()
                    })
                    .await?;
                Some(members.items.into_iter().map(|u| u.name).collect())
            } else {
                None
            };
            groups.push(GroupItem {
                id: group.id.to_string(),
                name: group.name.clone(),
                users,
            });
        }

        state.id = Some(digest_ids(response.items.iter().map(|g| g.id)));
        state.groups = Some(groups);
        encode(&state)
    }
}

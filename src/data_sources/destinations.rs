use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{digest_ids, DataSource};
use crate::client::types::{ListDestinationsRequest, Pagination};
use crate::client::Client;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::state::{decode, encode, single_block};

/// `infra_destinations`
pub struct DestinationsDataSource;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DestinationsState {
    id: Option<String>,
    #[serde(deserialize_with = "single_block::deserialize")]
    filter: Option<Filter>,
    destinations: Option<Vec<DestinationItem>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Filter {
    name: Option<String>,
    kind: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DestinationItem {
    id: String,
    name: String,
    kind: String,
}

#[async_trait::async_trait]
impl DataSource for DestinationsDataSource {
    fn type_name(&self) -> &'static str {
        "infra_destinations"
    }

    fn schema(&self) -> Schema {
        let item = AttributeType::object([
            ("id", AttributeType::String),
            ("name", AttributeType::String),
            ("kind", AttributeType::String),
        ]);

        Schema::v0()
            .with_description("Get a list of destinations registered with Infra.")
            .with_attribute("id", Attribute::computed_string())
            .with_block(
                "filter",
                NestedBlock::single(
                    Block::new()
                        .with_attribute(
                            "name",
                            Attribute::optional_string().with_description("The name of the destination."),
                        )
                        .with_attribute(
                            "kind",
                            Attribute::optional_string().with_description("The kind of the destination, e.g. `kubernetes`."),
                        ),
                ),
            )
            .with_attribute(
                "destinations",
                Attribute::new(AttributeType::list(item), AttributeFlags::computed())
                    .with_description("The matching destinations."),
            )
    }

    async fn read(&self, client: &Client, config: Value) -> Result<Value, ProviderError> {
        let mut state: DestinationsState = decode(config)?;
        let filter = state.filter.as_ref();

        let response = client
            .list_destinations(&ListDestinationsRequest {
                name: filter.and_then(|f| f.name.clone()),
                kind: filter.and_then(|f| f.kind.clone()),
                pagination: Pagination::all(),
            })
            .await?;

        state.id = Some(digest_ids(response.items.iter().map(|d| d.id)));
        state.destinations = Some(
            response
                .items
                .into_iter()
                .map(|d| DestinationItem {
                    id: d.id.to_string(),
                    name: d.name,
                    kind: d.kind,
                })
                .collect(),
        );
        encode(&state)
    }
}

//! Read-only queries against the Infra API.

mod credential;
mod destination;
mod destinations;
mod groups;
mod users;

pub use credential::CredentialDataSource;
pub use destination::DestinationDataSource;
pub use destinations::DestinationsDataSource;
pub use groups::GroupsDataSource;
pub use users::UsersDataSource;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::client::Client;
use crate::error::ProviderError;
use crate::id::Id;
use crate::schema::Schema;

/// A data source type.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Type name as used in configuration, e.g. `infra_groups`.
    fn type_name(&self) -> &'static str;

    /// Schema of the data source's arguments and results.
    fn schema(&self) -> Schema;

    /// Run the query described by `config` and return the full state.
    async fn read(&self, client: &Client, config: Value) -> Result<Value, ProviderError>;
}

/// Every data source this provider serves.
pub fn all() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(DestinationsDataSource),
        Box::new(DestinationDataSource),
        Box::new(GroupsDataSource),
        Box::new(UsersDataSource),
        Box::new(CredentialDataSource),
    ]
}

/// Stable ID for a list result: hex SHA-256 over the concatenated item IDs.
pub(crate) fn digest_ids<I>(ids: I) -> String
where
    I: IntoIterator<Item = Id>,
{
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

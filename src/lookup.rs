//! Resolving users and groups from IDs or human-readable names, and gating
//! features on the server version.

use std::cmp::Ordering;
use std::fmt;

use crate::client::types::{Group, ListGroupsRequest, ListUsersRequest, Pagination, User};
use crate::client::Client;
use crate::error::ProviderError;
use crate::id::Id;

/// Look up a user by `id` if given, otherwise by `email`.
///
/// `fields` names the two configuration fields, for the error when neither is set.
pub async fn user_from_id_or_email(
    client: &Client,
    id: Option<&str>,
    email: Option<&str>,
    fields: [&str; 2],
) -> Result<User, ProviderError> {
    if let Some(id) = non_empty(id) {
        return Ok(client.get_user(Id::parse(id)?).await?);
    }
    if let Some(email) = non_empty(email) {
        return user_from_email(client, email).await;
    }
    Err(neither_set(fields))
}

/// Find the user whose name is `email`, including system users.
pub async fn user_from_email(client: &Client, email: &str) -> Result<User, ProviderError> {
    let request = ListUsersRequest {
        name: Some(email.to_string()),
        show_system: true,
        pagination: Pagination::first(),
        ..Default::default()
    };

    client
        .list_users(&request)
        .await?
        .into_first()
        .ok_or_else(|| ProviderError::NotFound(format!("user not found: {}", email)))
}

/// Look up a group by `id` if given, otherwise by `name`.
pub async fn group_from_id_or_name(
    client: &Client,
    id: Option<&str>,
    name: Option<&str>,
    fields: [&str; 2],
) -> Result<Group, ProviderError> {
    if let Some(id) = non_empty(id) {
        return Ok(client.get_group(Id::parse(id)?).await?);
    }
    if let Some(name) = non_empty(name) {
        return group_from_name(client, name).await;
    }
    Err(neither_set(fields))
}

/// Find the group called `name`.
pub async fn group_from_name(client: &Client, name: &str) -> Result<Group, ProviderError> {
    let request = ListGroupsRequest {
        name: Some(name.to_string()),
        pagination: Pagination::first(),
        ..Default::default()
    };

    client
        .list_groups(&request)
        .await?
        .into_first()
        .ok_or_else(|| ProviderError::NotFound(format!("group not found: {}", name)))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn neither_set(fields: [&str; 2]) -> ProviderError {
    ProviderError::Validation(format!(
        "one of `{},{}` must be specified",
        fields[0], fields[1]
    ))
}

/// Fail unless the server reports at least version `minimum`.
pub async fn require_minimum_server_version(
    client: &Client,
    minimum: &str,
) -> Result<(), ProviderError> {
    let wanted = ServerVersion::parse(minimum)?;
    let reported = client.get_server_version().await?.version;
    let current = ServerVersion::parse(&reported)?;

    if current < wanted {
        return Err(ProviderError::Unimplemented(format!(
            "server must be at least version {} or higher. currently {}",
            minimum, reported
        )));
    }
    Ok(())
}

/// A semantic version as reported by `GET /api/version`.
///
/// A version with a pre-release tag sorts before the same version without one.
/// Build metadata is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    major: u64,
    minor: u64,
    patch: u64,
    pre: String,
}

impl ServerVersion {
    /// Parse `[v]MAJOR[.MINOR[.PATCH]][-PRE][+BUILD]`.
    pub fn parse(input: &str) -> Result<Self, ProviderError> {
        let invalid = || ProviderError::Validation(format!("Invalid Semantic Version: {:?}", input));

        let s = input.trim().strip_prefix('v').unwrap_or(input.trim());
        let s = s.split_once('+').map_or(s, |(core, _)| core);
        let (core, pre) = s.split_once('-').unwrap_or((s, ""));

        let mut parts = core.split('.');
        let mut next = |required: bool| -> Result<u64, ProviderError> {
            match parts.next() {
                Some(p) => p.parse().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let version = Self {
            major: next(true)?,
            minor: next(false)?,
            patch: next(false)?,
            pre: pre.to_string(),
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

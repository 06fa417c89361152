//! Request and response bodies of the Infra REST API.
//!
//! Field names follow the API's camelCase JSON; identifier fields use the
//! API's `ID` spelling (`userID`, `clientID`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::GoDuration;
use crate::id::Id;

/// Page size used when a caller wants "everything".
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// HTTP status repeated by the server.
    #[serde(default)]
    pub code: i32,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

/// Paging parameters shared by every list endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// One-based page index, omitted when zero.
    pub page: u32,
    /// Page size, omitted when zero.
    pub limit: u32,
}

impl Pagination {
    /// Only the first match is wanted.
    pub const fn first() -> Self {
        Self { page: 0, limit: 1 }
    }

    /// As many items as one page allows.
    pub const fn all() -> Self {
        Self {
            page: 0,
            limit: MAX_PAGE_SIZE,
        }
    }

    fn append(&self, query: &mut Vec<(&'static str, String)>) {
        if self.page > 0 {
            query.push(("page", self.page.to_string()));
        }
        if self.limit > 0 {
            query.push(("limit", self.limit.to_string()));
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Number of items on this page.
    #[serde(default)]
    pub count: usize,
    /// Number of matching items across all pages.
    #[serde(default)]
    pub total_count: usize,
    /// Number of pages.
    #[serde(default)]
    pub total_pages: usize,
    /// This page's index.
    #[serde(default)]
    pub page: usize,
    /// Page size.
    #[serde(default)]
    pub limit: usize,
}

impl<T> ListResponse<T> {
    /// The first item, if the page is not empty.
    pub fn into_first(self) -> Option<T> {
        self.items.into_iter().next()
    }
}

fn push_opt(query: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        query.push((key, v.to_string()));
    }
}

fn push_id(query: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<Id>) {
    if let Some(id) = value.filter(|id| !id.is_zero()) {
        query.push((key, id.to_string()));
    }
}

// Users

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    pub id: Id,
    pub name: String,
    /// Present only when the server generated the password.
    #[serde(default)]
    pub one_time_password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip)]
    pub id: Id,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub old_password: String,
    pub password: String,
}

/// Filters for `GET /api/users`.
#[derive(Debug, Clone, Default)]
pub struct ListUsersRequest {
    pub name: Option<String>,
    pub group: Option<Id>,
    pub show_system: bool,
    pub pagination: Pagination,
}

impl ListUsersRequest {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "name", &self.name);
        push_id(&mut query, "group", self.group);
        if self.show_system {
            query.push(("showSystem", "true".to_string()));
        }
        self.pagination.append(&mut query);
        query
    }
}

// Groups

/// A named collection of users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub total_users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

/// Filters for `GET /api/groups`.
#[derive(Debug, Clone, Default)]
pub struct ListGroupsRequest {
    pub name: Option<String>,
    pub user_id: Option<Id>,
    pub pagination: Pagination,
}

impl ListGroupsRequest {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "name", &self.name);
        push_id(&mut query, "userID", self.user_id);
        self.pagination.append(&mut query);
        query
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsersInGroupRequest {
    #[serde(skip)]
    pub group_id: Id,
    #[serde(rename = "usersToAdd", skip_serializing_if = "Vec::is_empty")]
    pub user_ids_to_add: Vec<Id>,
    #[serde(rename = "usersToRemove", skip_serializing_if = "Vec::is_empty")]
    pub user_ids_to_remove: Vec<Id>,
}

// Grants

/// A privilege on a resource held by a user or a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub id: Id,
    /// Zero when the grant belongs to a group.
    #[serde(default)]
    pub user: Id,
    /// Zero when the grant belongs to a user.
    #[serde(default)]
    pub group: Id,
    pub privilege: String,
    pub resource: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateGrantRequest {
    #[serde(skip_serializing_if = "Id::is_zero")]
    pub user: Id,
    #[serde(skip_serializing_if = "Id::is_zero")]
    pub group: Id,
    pub privilege: String,
    pub resource: String,
}

// Identity providers

/// An OIDC identity provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "clientID", default)]
    pub client_id: String,
    #[serde(default)]
    pub kind: String,
}

/// Directory API credentials, used by Google providers to sync groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderApiCredentials {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub domain_admin_email: String,
}

/// Body of both create and update provider calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub url: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ProviderApiCredentials>,
}

// Access keys

/// An access key as listed by the API. The secret is never returned here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub issued_for: Id,
    #[serde(default)]
    pub issued_for_name: String,
    #[serde(rename = "providerID", default)]
    pub provider_id: Id,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extension_deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccessKeyRequest {
    #[serde(rename = "userID")]
    pub user_id: Id,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub ttl: GoDuration,
    pub extension_deadline: GoDuration,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccessKeyResponse {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub issued_for: Id,
    #[serde(rename = "providerID", default)]
    pub provider_id: Id,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    /// The secret; only returned at creation.
    pub access_key: String,
}

/// Filters for `GET /api/access-keys`.
#[derive(Debug, Clone, Default)]
pub struct ListAccessKeysRequest {
    pub name: Option<String>,
    pub user_id: Option<Id>,
    pub show_expired: bool,
    pub pagination: Pagination,
}

impl ListAccessKeysRequest {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "name", &self.name);
        push_id(&mut query, "userID", self.user_id);
        if self.show_expired {
            query.push(("showExpired", "true".to_string()));
        }
        self.pagination.append(&mut query);
        query
    }
}

// Destinations

/// How to reach a destination's API server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DestinationConnection {
    /// Host and port, without scheme.
    #[serde(default)]
    pub url: String,
    /// PEM-encoded certificate authority.
    #[serde(default)]
    pub ca: String,
}

/// A connected infrastructure destination such as a Kubernetes cluster.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: Id,
    #[serde(rename = "uniqueID", default)]
    pub unique_id: String,
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub connection: DestinationConnection,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Filters for `GET /api/destinations`.
#[derive(Debug, Clone, Default)]
pub struct ListDestinationsRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub pagination: Pagination,
}

impl ListDestinationsRequest {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push_opt(&mut query, "name", &self.name);
        push_opt(&mut query, "kind", &self.kind);
        self.pagination.append(&mut query);
        query
    }
}

// Settings

/// Password complexity rules for local users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequirements {
    #[serde(default)]
    pub length_min: i64,
    #[serde(default)]
    pub lowercase_min: i64,
    #[serde(default)]
    pub uppercase_min: i64,
    #[serde(default)]
    pub number_min: i64,
    #[serde(default)]
    pub symbol_min: i64,
}

/// Organization-wide settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub password_requirements: PasswordRequirements,
}

// Tokens and version

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTokenResponse {
    pub token: String,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Version {
    pub version: String,
}

//! HTTP client for the Infra REST API.
//!
//! One [`Client`] is built at configure time and shared by every resource and
//! data source. Requests carry the access key as a bearer token and pin the
//! API version through the `Infra-Version` header.

#[allow(missing_docs)]
pub mod types;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::id::Id;
use crate::pem::PemBlock;

use types::*;

/// API version this client speaks.
pub const API_VERSION: &str = "0.17.1";

const VERSION_HEADER: &str = "infra-version";

/// Errors returned by [`Client`] calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the status reason.
        message: String,
    },

    /// The request never completed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body was not what the endpoint promises.
    #[error("invalid response from {path}: {message}")]
    Decode {
        /// Request path.
        path: String,
        /// Parse failure.
        message: String,
    },

    /// The client could not be built from the given options.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of a server-side error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The entity addressed by the request does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }
}

/// Connection settings for [`Client::new`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Base URL of the Infra server.
    pub host: String,
    /// Access key sent as a bearer token.
    pub access_key: String,
    /// Accept any server certificate.
    pub skip_tls_verify: bool,
    /// Additional trusted root certificate.
    pub server_certificate: Option<PemBlock>,
}

/// Infra API client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client from connection settings.
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        let base_url = Url::parse(&options.host)
            .map_err(|e| ApiError::Config(format!("host {:?}: {}", options.host, e)))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", options.access_key))
            .map_err(|_| ApiError::Config("access key contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("terraform-provider-infra/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .danger_accept_invalid_certs(options.skip_tls_verify);

        if let Some(block) = &options.server_certificate {
            let cert = reqwest::Certificate::from_pem(block.to_pem().as_bytes())
                .map_err(|e| ApiError::Config(format!("server certificate: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let http = builder.build()?;
        Ok(Self { http, base_url })
    }

    /// The server this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Config(format!("path {:?}: {}", path, e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        debug!(%method, path, "infra api request");
        Ok(self.http.request(method, self.url(path)?))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let bytes = self.execute(path, request).await?;
        // empty bodies decode as JSON null
        let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(body).map_err(|e| ApiError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            debug!(path, status = status.as_u16(), "infra api response");
            return Ok(bytes.to_vec());
        }

        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
        let message = if body.message.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        } else {
            body.message
        };
        warn!(path, status = status.as_u16(), %message, "infra api error");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?.query(query);
        self.send(path, request).await
    }

    async fn with_body<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(method, path)?.json(body);
        self.send(path, request).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, path)?;
        self.execute(path, request).await.map(|_| ())
    }

    // Users

    /// `POST /api/users`
    pub async fn create_user(
        &self,
        request: &CreateUserRequest,
    ) -> Result<CreateUserResponse, ApiError> {
        self.with_body(Method::POST, "/api/users", request).await
    }

    /// `GET /api/users/{id}`
    pub async fn get_user(&self, id: Id) -> Result<User, ApiError> {
        self.get(&format!("/api/users/{}", id), &[]).await
    }

    /// `PUT /api/users/{id}`
    pub async fn update_user(&self, request: &UpdateUserRequest) -> Result<User, ApiError> {
        self.with_body(Method::PUT, &format!("/api/users/{}", request.id), request)
            .await
    }

    /// `DELETE /api/users/{id}`
    pub async fn delete_user(&self, id: Id) -> Result<(), ApiError> {
        self.delete(&format!("/api/users/{}", id)).await
    }

    /// `GET /api/users`
    pub async fn list_users(
        &self,
        request: &ListUsersRequest,
    ) -> Result<ListResponse<User>, ApiError> {
        self.get("/api/users", &request.query()).await
    }

    // Groups

    /// `POST /api/groups`
    pub async fn create_group(&self, request: &CreateGroupRequest) -> Result<Group, ApiError> {
        self.with_body(Method::POST, "/api/groups", request).await
    }

    /// `GET /api/groups/{id}`
    pub async fn get_group(&self, id: Id) -> Result<Group, ApiError> {
        self.get(&format!("/api/groups/{}", id), &[]).await
    }

    /// `DELETE /api/groups/{id}`
    pub async fn delete_group(&self, id: Id) -> Result<(), ApiError> {
        self.delete(&format!("/api/groups/{}", id)).await
    }

    /// `GET /api/groups`
    pub async fn list_groups(
        &self,
        request: &ListGroupsRequest,
    ) -> Result<ListResponse<Group>, ApiError> {
        self.get("/api/groups", &request.query()).await
    }

    /// `PATCH /api/groups/{id}/users`
    pub async fn update_users_in_group(
        &self,
        request: &UpdateUsersInGroupRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/api/groups/{}/users", request.group_id);
        let http = self.request(Method::PATCH, &path)?.json(request);
        self.execute(&path, http).await.map(|_| ())
    }

    // Grants

    /// `POST /api/grants`
    pub async fn create_grant(&self, request: &CreateGrantRequest) -> Result<Grant, ApiError> {
        self.with_body(Method::POST, "/api/grants", request).await
    }

    /// `GET /api/grants/{id}`
    pub async fn get_grant(&self, id: Id) -> Result<Grant, ApiError> {
        self.get(&format!("/api/grants/{}", id), &[]).await
    }

    /// `DELETE /api/grants/{id}`
    pub async fn delete_grant(&self, id: Id) -> Result<(), ApiError> {
        self.delete(&format!("/api/grants/{}", id)).await
    }

    // Identity providers

    /// `POST /api/providers`
    pub async fn create_provider(&self, request: &ProviderRequest) -> Result<Provider, ApiError> {
        self.with_body(Method::POST, "/api/providers", request).await
    }

    /// `GET /api/providers/{id}`
    pub async fn get_provider(&self, id: Id) -> Result<Provider, ApiError> {
        self.get(&format!("/api/providers/{}", id), &[]).await
    }

    /// `PUT /api/providers/{id}`
    pub async fn update_provider(
        &self,
        id: Id,
        request: &ProviderRequest,
    ) -> Result<Provider, ApiError> {
        self.with_body(Method::PUT, &format!("/api/providers/{}", id), request)
            .await
    }

    /// `DELETE /api/providers/{id}`
    pub async fn delete_provider(&self, id: Id) -> Result<(), ApiError> {
        self.delete(&format!("/api/providers/{}", id)).await
    }

    // Access keys

    /// `POST /api/access-keys`
    pub async fn create_access_key(
        &self,
        request: &CreateAccessKeyRequest,
    ) -> Result<CreateAccessKeyResponse, ApiError> {
        self.with_body(Method::POST, "/api/access-keys", request)
            .await
    }

    /// `GET /api/access-keys`
    pub async fn list_access_keys(
        &self,
        request: &ListAccessKeysRequest,
    ) -> Result<ListResponse<AccessKey>, ApiError> {
        self.get("/api/access-keys", &request.query()).await
    }

    /// `DELETE /api/access-keys/{id}`
    pub async fn delete_access_key(&self, id: Id) -> Result<(), ApiError> {
        self.delete(&format!("/api/access-keys/{}", id)).await
    }

    // Destinations

    /// `GET /api/destinations`
    pub async fn list_destinations(
        &self,
        request: &ListDestinationsRequest,
    ) -> Result<ListResponse<Destination>, ApiError> {
        self.get("/api/destinations", &request.query()).await
    }

    // Settings

    /// `GET /api/settings`
    pub async fn get_settings(&self) -> Result<Settings, ApiError> {
        self.get("/api/settings", &[]).await
    }

    /// `PUT /api/settings`
    pub async fn update_settings(&self, settings: &Settings) -> Result<Settings, ApiError> {
        self.with_body(Method::PUT, "/api/settings", settings).await
    }

    // Tokens and version

    /// `POST /api/tokens`
    pub async fn create_token(&self) -> Result<CreateTokenResponse, ApiError> {
        self.with_body(Method::POST, "/api/tokens", &serde_json::json!({}))
            .await
    }

    /// `GET /api/version`
    pub async fn get_server_version(&self) -> Result<Version, ApiError> {
        self.get("/api/version", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(host: &str) -> ClientOptions {
        ClientOptions {
            host: host.to_string(),
            access_key: "aaaaaaaaaa.bbbbbbbbbbbbbbbbbbbbbbbb".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_invalid_host() {
        let err = Client::new(options("not a url")).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_rejects_header_unsafe_access_key() {
        let mut opts = options("https://api.infrahq.com");
        opts.access_key = "line\nbreak".to_string();
        assert!(matches!(Client::new(opts), Err(ApiError::Config(_))));
    }

    #[test]
    fn test_paths_resolve_against_host() {
        let client = Client::new(options("https://infra.example.com")).unwrap();
        assert_eq!(
            client.url("/api/users/2").unwrap().as_str(),
            "https://infra.example.com/api/users/2"
        );
    }

    #[test]
    fn test_debug_hides_credentials() {
        let client = Client::new(options("https://infra.example.com")).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("bbbbbbbb"));
    }

    #[test]
    fn test_status_error_helpers() {
        let err = ApiError::Status {
            status: 404,
            message: "record not found".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "record not found");
    }
}

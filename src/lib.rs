//! Provider plugin for the [Infra](https://infrahq.com) identity and access
//! service.
//!
//! The host launches the binary, reads the handshake line from stdout and
//! drives the provider over gRPC:
//!
//! ```text
//! INFRA_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Managed resources: `infra_user`, `infra_group`, `infra_group_membership`,
//! `infra_grant`, `infra_identity_provider`, `infra_access_key` and
//! `infra_settings`. Data sources: `infra_destinations`, `infra_destination`,
//! `infra_groups`, `infra_users` and `infra_credential`.
//!
//! # Layout
//!
//! - [`server`]: the protocol adapter, handshake and shutdown handling
//! - [`provider`]: configuration and dispatch to resources and data sources
//! - [`schema`], [`validation`], [`validators`] and [`plan`]: the schema model
//!   and what the provider computes from it
//! - [`client`]: the Infra REST API
//! - [`testing`]: a host stand-in for tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod duration;
pub mod error;
pub mod id;
pub mod logging;
pub mod lookup;
pub mod pem;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
mod state;
pub mod testing;
pub mod validation;
pub mod validators;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default};
pub use plan::{AttributeChange, PlanResult};
pub use provider::InfraProvider;
pub use schema::ProviderSchema;
pub use server::{
    handshake_line, serve, serve_listener, serve_with_options, ImportedResource, ProviderMetadata,
    ProviderService, ServeOptions, ServerCapabilities, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};

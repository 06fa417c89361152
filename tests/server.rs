use std::time::Duration;

use terraform_provider_infra::generated::provider_server::Provider;
use terraform_provider_infra::generated::{
    nested_block::NestingMode, GetMetadataRequest, GetSchemaRequest, ReadRequest,
    ValidateResourceConfigRequest,
};
use terraform_provider_infra::server::ProviderGrpcService;
use terraform_provider_infra::{serve_listener, InfraProvider, ServeOptions};
use tokio::net::TcpListener;
use tonic::Request;

fn service() -> ProviderGrpcService<InfraProvider> {
    ProviderGrpcService::new(InfraProvider::new().with_environment(|_| None))
}

#[tokio::test]
async fn test_metadata() {
    let metadata = service()
        .get_metadata(Request::new(GetMetadataRequest {}))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(metadata.resources.len(), 7);
    assert_eq!(metadata.data_sources.len(), 5);
    assert!(metadata.diagnostics.is_empty());
}

#[tokio::test]
async fn test_schema_describes_grant_blocks() {
    let schema = service()
        .get_schema(Request::new(GetSchemaRequest {}))
        .await
        .unwrap()
        .into_inner();

    let provider = schema.provider.unwrap().block.unwrap();
    let access_key = provider
        .attributes
        .iter()
        .find(|a| a.name == "access_key")
        .unwrap();
    assert!(access_key.sensitive);

    let grant = schema.resources["infra_grant"].block.clone().unwrap();
    let blocks: Vec<_> = grant.block_types.iter().map(|b| b.type_name.as_str()).collect();
    assert_eq!(blocks, ["infra", "kubernetes"]);
    assert!(grant
        .block_types
        .iter()
        .all(|b| b.nesting_mode == NestingMode::Single as i32));
    let user_id = grant.attributes.iter().find(|a| a.name == "user_id").unwrap();
    assert!(user_id.force_new);
    assert!(user_id.description.contains("One of `user_id`, `user_name`, `group_id`, `group_name` must be set."));
}

#[tokio::test]
async fn test_validation_diagnostics_carry_attribute() {
    let response = service()
        .validate_resource_config(Request::new(ValidateResourceConfigRequest {
            resource_type: "infra_group".into(),
            config: br#"{"name": "na@me"}"#.to_vec(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].attribute, "name");
}

#[tokio::test]
async fn test_errors_become_diagnostics() {
    let response = service()
        .read(Request::new(ReadRequest {
            resource_type: "infra_group".into(),
            current_state: br#"{"id": "5"}"#.to_vec(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert!(response.state.is_empty());
    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0]
        .summary
        .contains("provider has not been configured"));
}

#[tokio::test]
async fn test_malformed_state_is_reported() {
    let response = service()
        .read(Request::new(ReadRequest {
            resource_type: "infra_group".into(),
            current_state: b"{".to_vec(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].summary.starts_with("Serialization error"));
}

#[tokio::test]
async fn test_serve_returns_after_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let options = ServeOptions::new().with_shutdown_timeout(Duration::from_secs(1));

    tokio::time::timeout(
        Duration::from_secs(5),
        serve_listener(InfraProvider::new(), listener, options, async {}),
    )
    .await
    .expect("server did not stop")
    .unwrap();
}

#![allow(dead_code)]

use serde_json::json;
use terraform_provider_infra::config::env;
use terraform_provider_infra::testing::ProviderTester;
use terraform_provider_infra::InfraProvider;
use wiremock::MockServer;

pub const ACCESS_KEY: &str = "aaaaaaaaaa.bbbbbbbbbbbbbbbbbbbbbbbb";

/// A provider configured against `server`.
///
/// The mock server speaks plain HTTP, which the `host` attribute rejects, so
/// the address comes in through `INFRA_HOST` instead.
pub async fn tester(server: &MockServer) -> ProviderTester<InfraProvider> {
    let host = server.uri();
    let provider =
        InfraProvider::new().with_environment(move |key| (key == env::HOST).then(|| host.clone()));
    let tester = ProviderTester::new(provider);
    tester
        .configure(json!({ "access_key": ACCESS_KEY }))
        .await
        .expect("configure provider");
    tester
}

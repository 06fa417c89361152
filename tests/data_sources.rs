mod common;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

#[tokio::test]
async fn test_destinations_filtered_by_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/destinations"))
        .and(query_param("kind", "kubernetes"))
        .respond_with(ok(json!({"items": [
            {"id": "2", "name": "production", "kind": "kubernetes"},
            {"id": "3", "name": "staging", "kind": "kubernetes"},
        ]})))
        .expect(1)
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .read_data_source("infra_destinations", json!({"filter": {"kind": "kubernetes"}}))
        .await
        .unwrap();
    assert_eq!(
        state["destinations"],
        json!([
            {"id": "2", "name": "production", "kind": "kubernetes"},
            {"id": "3", "name": "staging", "kind": "kubernetes"},
        ])
    );
    // sha256("23")
    assert_eq!(
        state["id"],
        "535fa30d7e25dd8a49f1536779734ec8286108d115da5045d77f3b4185d8f790"
    );
}

#[tokio::test]
async fn test_destination_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/destinations"))
        .and(query_param("name", "nowhere"))
        .respond_with(ok(json!({"items": []})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let err = tester
        .read_data_source("infra_destination", json!({"name": "nowhere"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("nowhere not found"), "{}", err);
}

#[tokio::test]
async fn test_groups_with_members() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/groups"))
        .respond_with(ok(json!({"items": [{"id": "5", "name": "developers"}]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("group", "5"))
        .respond_with(ok(json!({"items": [
            {"id": "7", "name": "alice@example.com"},
            {"id": "8", "name": "bob@example.com"},
        ]})))
        .expect(1)
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .read_data_source("infra_groups", json!({"include_users": true}))
        .await
        .unwrap();
    assert_eq!(
        state["groups"],
        json!([{
            "id": "5",
            "name": "developers",
            "users": ["alice@example.com", "bob@example.com"],
        }])
    );
}

#[tokio::test]
async fn test_users_filter_by_unknown_group() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/groups"))
        .and(query_param("name", "ghosts"))
        .respond_with(ok(json!({"items": []})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let err = tester
        .read_data_source("infra_users", json!({"filter": {"group_name": "ghosts"}}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("group not found: ghosts"), "{}", err);
}

#[tokio::test]
async fn test_conflicting_filters_are_rejected() {
    let server = MockServer::start().await;
    let tester = common::tester(&server).await;

    let diagnostics = tester
        .read_data_source(
            "infra_groups",
            json!({"filter": {"user_id": "7", "user_name": "alice@example.com"}}),
        )
        .await
        .unwrap_err()
        .diagnostics();
    assert!(!diagnostics.is_empty());
}

#[tokio::test]
async fn test_credential_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tokens"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "token": "session-token",
            "expires": "2030-01-01T00:00:00Z",
        })))
        .expect(1)
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .read_data_source("infra_credential", json!({}))
        .await
        .unwrap();
    assert_eq!(state["token"], "session-token");
    assert!(state["id"].as_str().is_some_and(|id| id.parse::<i64>().is_ok()));
}

mod common;

use serde_json::{json, Value};
use terraform_provider_infra::ProviderError;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({"code": 404, "message": "record not found"}))
}

async fn mount_group(server: &MockServer, id: &str, name: &str) {
    Mock::given(method("POST"))
        .and(path("/api/groups"))
        .and(body_json(json!({ "name": name })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": id, "name": name})))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/api/groups/{}", id)))
        .respond_with(ok(json!({"id": id, "name": name, "totalUsers": 0})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_group_create_then_read() {
    let server = MockServer::start().await;
    mount_group(&server, "5", "developers").await;
    let tester = common::tester(&server).await;

    let state = tester
        .apply("infra_group", json!({"name": "developers"}))
        .await
        .unwrap();
    assert_eq!(state, json!({"id": "5", "name": "developers"}));
}

#[tokio::test]
async fn test_requests_carry_credentials_and_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/groups/5"))
        .and(header("authorization", format!("Bearer {}", common::ACCESS_KEY).as_str()))
        .and(header("infra-version", "0.17.1"))
        .respond_with(ok(json!({"id": "5", "name": "developers"})))
        .expect(1)
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .read("infra_group", json!({"id": "5", "name": "developers"}))
        .await
        .unwrap();
    assert_eq!(state["name"], "developers");
}

#[tokio::test]
async fn test_group_rename_replaces_it() {
    let server = MockServer::start().await;
    mount_group(&server, "5", "developers").await;
    mount_group(&server, "6", "admins").await;
    Mock::given(method("DELETE"))
        .and(path("/api/groups/5"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let created = tester
        .apply("infra_group", json!({"name": "developers"}))
        .await
        .unwrap();
    let renamed = tester
        .reapply("infra_group", created.clone(), json!({"name": "admins"}))
        .await
        .unwrap();

    assert_ne!(renamed["id"], created["id"]);
    assert_eq!(renamed, json!({"id": "6", "name": "admins"}));
}

#[tokio::test]
async fn test_invalid_group_name_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/groups"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let diagnostics = tester
        .apply("infra_group", json!({"name": "na@me"}))
        .await
        .unwrap_err()
        .diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].attribute.as_deref(), Some("name"));
}

#[tokio::test]
async fn test_user_password_change_keeps_id() {
    let server = MockServer::start().await;
    let user = json!({"id": "7", "name": "alice@example.com"});
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(body_json(json!({"name": "alice@example.com"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(user.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/users/7"))
        .and(body_json(json!({"password": "password1"})))
        .respond_with(ok(user.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/users/7"))
        .and(body_json(json!({"oldPassword": "password1", "password": "password2"})))
        .respond_with(ok(user.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/7"))
        .respond_with(ok(user))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let created = tester
        .apply(
            "infra_user",
            json!({"name": "alice@example.com", "password": "password1"}),
        )
        .await
        .unwrap();
    assert_eq!(
        created,
        json!({"id": "7", "name": "alice@example.com", "password": "password1"})
    );

    let updated = tester
        .reapply(
            "infra_user",
            created,
            json!({"name": "alice@example.com", "password": "password2"}),
        )
        .await
        .unwrap();
    assert_eq!(updated["id"], "7");
    assert_eq!(updated["password"], "password2");
}

#[tokio::test]
async fn test_user_without_password_keeps_one_time_password() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "7",
            "name": "bob@example.com",
            "oneTimePassword": "Xk2-temporary",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/7"))
        .respond_with(ok(json!({"id": "7", "name": "bob@example.com"})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .apply("infra_user", json!({"name": "bob@example.com"}))
        .await
        .unwrap();
    assert_eq!(state["password"], "Xk2-temporary");
}

#[tokio::test]
async fn test_vanished_resource_reads_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/groups/5"))
        .respond_with(not_found())
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .read("infra_group", json!({"id": "5", "name": "developers"}))
        .await
        .unwrap();
    assert!(state.is_null());
}

#[tokio::test]
async fn test_delete_of_missing_resource_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/groups/5"))
        .respond_with(not_found())
        .expect(1)
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    assert_ok!(
        tester
            .destroy("infra_group", json!({"id": "5", "name": "developers"}))
            .await
    );
}

#[tokio::test]
async fn test_server_errors_are_not_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/groups/5"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"code": 403, "message": "forbidden"})),
        )
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let err = assert_err!(tester.destroy("infra_group", json!({"id": "5"})).await);
    assert!(matches!(err, ProviderError::PermissionDenied(message) if message == "forbidden"));
}

#[tokio::test]
async fn test_import_group() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/groups/5"))
        .respond_with(ok(json!({"id": "5", "name": "developers"})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let imported = tester.import("infra_group", "5").await.unwrap();
    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].resource_type, "infra_group");
    assert_eq!(imported[0].state, json!({"id": "5", "name": "developers"}));
}

#[tokio::test]
async fn test_grant_is_not_importable() {
    let server = MockServer::start().await;
    let tester = common::tester(&server).await;

    let err = tester.import("infra_grant", "9").await.unwrap_err();
    assert!(matches!(err, ProviderError::Unimplemented(_)));
}

#[tokio::test]
async fn test_membership_reports_every_missing_side() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("name", "missing@example.com"))
        .respond_with(ok(json!({"items": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/groups"))
        .and(query_param("name", "ghosts"))
        .respond_with(ok(json!({"items": []})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let diagnostics = tester
        .apply(
            "infra_group_membership",
            json!({"user_name": "missing@example.com", "group_name": "ghosts"}),
        )
        .await
        .unwrap_err()
        .diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].summary.contains("user not found: missing@example.com"));
    assert!(diagnostics[1].summary.contains("group not found: ghosts"));
}

#[tokio::test]
async fn test_membership_by_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("name", "alice@example.com"))
        .and(query_param("showSystem", "true"))
        .respond_with(ok(json!({"items": [{"id": "7", "name": "alice@example.com"}]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/groups"))
        .and(query_param("name", "developers"))
        .respond_with(ok(json!({"items": [{"id": "5", "name": "developers"}]})))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/groups/5/users"))
        .and(body_json(json!({"usersToAdd": ["7"]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/7"))
        .respond_with(ok(json!({"id": "7", "name": "alice@example.com"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/groups/5"))
        .respond_with(ok(json!({"id": "5", "name": "developers"})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .apply(
            "infra_group_membership",
            json!({"user_name": "alice@example.com", "group_name": "developers"}),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "alice@example.com/developers");
    assert_eq!(state["user_id"], "7");
    assert_eq!(state["group_id"], "5");
}

#[tokio::test]
async fn test_grant_keeps_configured_role_spelling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/groups"))
        .and(query_param("name", "developers"))
        .respond_with(ok(json!({"items": [{"id": "5", "name": "developers"}]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/grants"))
        .and(body_json(json!({"group": "5", "privilege": "Admin", "resource": "infra"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "9", "group": "5", "privilege": "admin", "resource": "infra",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/grants/9"))
        .respond_with(ok(json!({
            "id": "9", "group": "5", "privilege": "admin", "resource": "infra",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/groups/5"))
        .respond_with(ok(json!({"id": "5", "name": "developers"})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .apply(
            "infra_grant",
            json!({"group_name": "developers", "infra": {"role": "Admin"}}),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "9");
    assert_eq!(state["group_id"], "5");
    assert_eq!(state["infra"], json!({"role": "Admin"}));
    assert!(state["kubernetes"].is_null());
}

#[tokio::test]
async fn test_access_key_normalizes_durations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("name", "alice@example.com"))
        .respond_with(ok(json!({"items": [{"id": "7", "name": "alice@example.com"}]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/access-keys"))
        .and(body_json(json!({
            "userID": "7",
            "name": "ci",
            "ttl": "24h0m0s",
            "extensionDeadline": "1h0m0s",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "8",
            "name": "ci",
            "issuedFor": "7",
            "accessKey": "cccccccccc.dddddddddddddddddddddddd",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/access-keys"))
        .and(query_param("name", "ci"))
        .and(query_param("showExpired", "true"))
        .respond_with(ok(json!({"items": [{
            "id": "8",
            "name": "ci",
            "issuedFor": "7",
            "issuedForName": "alice@example.com",
            "expires": "2030-01-01T00:00:00Z",
        }]})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .apply(
            "infra_access_key",
            json!({
                "name": "ci",
                "user_email": "alice@example.com",
                "expires_in": "24h",
                "inactivity_timeout": "1h",
            }),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "8");
    assert_eq!(state["secret"], "cccccccccc.dddddddddddddddddddddddd");
    assert_eq!(state["expires_in"], "24h0m0s");
    assert_eq!(state["expires_at"], "2030-01-01T00:00:00Z");
    assert_eq!(state["user_id"], "7");

    let plan = tester
        .plan(
            "infra_access_key",
            Some(state.clone()),
            json!({
                "name": "ci",
                "user_email": "alice@example.com",
                "expires_in": "24h",
                "inactivity_timeout": "1h",
            }),
        )
        .await
        .unwrap();
    assert!(!plan.requires_replace);
    assert!(
        !plan.changes.iter().any(|c| c.path == "expires_in"),
        "equal durations must not diff"
    );
}

#[tokio::test]
async fn test_settings_require_recent_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ok(json!({"version": "0.17.2"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/settings"))
        .respond_with(ok(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let err = tester
        .apply("infra_settings", json!({"password_requirements": {"minimum_length": 10}}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("0.18.0"), "{}", err);
}

#[tokio::test]
async fn test_settings_fill_defaults() {
    let server = MockServer::start().await;
    let settings = json!({"passwordRequirements": {
        "lengthMin": 10,
        "lowercaseMin": 0,
        "uppercaseMin": 0,
        "numberMin": 0,
        "symbolMin": 0,
    }});
    Mock::given(method("GET"))
        .and(path("/api/version"))
        .respond_with(ok(json!({"version": "0.18.1"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/settings"))
        .and(body_json(settings.clone()))
        .respond_with(ok(settings.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/settings"))
        .respond_with(ok(settings))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .apply("infra_settings", json!({"password_requirements": {"minimum_length": 10}}))
        .await
        .unwrap();
    assert_eq!(
        state,
        json!({
            "id": "self",
            "password_requirements": {
                "minimum_length": 10,
                "minimum_lowercase": 0,
                "minimum_uppercase": 0,
                "minimum_numbers": 0,
                "minimum_symbols": 0,
            },
        })
    );
}

#[tokio::test]
async fn test_identity_provider_secret_rotation_keeps_id() {
    let server = MockServer::start().await;
    let provider = json!({
        "id": "9",
        "name": "okta",
        "url": "example.okta.com",
        "clientID": "client",
        "kind": "okta",
    });
    Mock::given(method("POST"))
        .and(path("/api/providers"))
        .and(body_json(json!({
            "url": "https://example.okta.com",
            "clientID": "client",
            "clientSecret": "secret",
            "kind": "okta",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(provider.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/providers/9"))
        .and(body_json(json!({
            "name": "okta",
            "url": "https://example.okta.com",
            "clientID": "client",
            "clientSecret": "rotated",
            "kind": "okta",
        })))
        .respond_with(ok(provider.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/providers/9"))
        .respond_with(ok(provider))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let config = |secret: &str| {
        json!({
            "client_id": "client",
            "client_secret": secret,
            "okta": {"issuer": "https://example.okta.com"},
        })
    };

    let created = tester
        .apply("infra_identity_provider", config("secret"))
        .await
        .unwrap();
    assert_eq!(created["id"], "9");
    assert_eq!(created["name"], "okta");
    assert_eq!(created["issuer"], "https://example.okta.com");
    assert_eq!(created["client_id"], "client");
    assert_eq!(created["okta"], json!({"issuer": "https://example.okta.com"}));

    let updated = tester
        .reapply("infra_identity_provider", created, config("rotated"))
        .await
        .unwrap();
    assert_eq!(updated["id"], "9");
    assert_eq!(updated["client_secret"], "rotated");
}

#[tokio::test]
async fn test_connector_access_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("name", "connector"))
        .and(query_param("showSystem", "true"))
        .respond_with(ok(json!({"items": [{"id": "2", "name": "connector"}]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/access-keys"))
        .and(body_json(json!({
            "userID": "2",
            "name": "cluster",
            "ttl": "87660h0m0s",
            "extensionDeadline": "720h0m0s",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "8",
            "name": "cluster",
            "issuedFor": "2",
            "accessKey": "eeeeeeeeee.ffffffffffffffffffffffff",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/access-keys"))
        .and(query_param("name", "cluster"))
        .respond_with(ok(json!({"items": [{
            "id": "8",
            "name": "cluster",
            "issuedFor": "2",
            "issuedForName": "connector",
            "expires": "2036-01-01T00:00:00Z",
        }]})))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let state = tester
        .apply(
            "infra_access_key",
            json!({"name": "cluster", "connector_access_key": true}),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "8");
    assert_eq!(state["user_id"], "2");
    assert_eq!(state["user_email"], "connector");
    assert_eq!(state["expires_in"], "87660h0m0s");
}

#[tokio::test]
async fn test_kubernetes_grant_round_trip() {
    let server = MockServer::start().await;
    let user = json!({"id": "7", "name": "alice@example.com"});
    let grant = json!({
        "id": "4", "user": "7", "privilege": "edit", "resource": "production.web",
    });
    Mock::given(method("GET"))
        .and(path("/api/users/7"))
        .respond_with(ok(user))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/grants"))
        .and(body_json(json!({"user": "7", "privilege": "edit", "resource": "production.web"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(grant.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/grants/4"))
        .respond_with(ok(grant))
        .mount(&server)
        .await;
    let tester = common::tester(&server).await;

    let kubernetes = json!({"role": "edit", "cluster": "production", "namespace": "web"});
    let state = tester
        .apply(
            "infra_grant",
            json!({"user_id": "7", "kubernetes": kubernetes.clone()}),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "4");
    assert_eq!(state["user_name"], "alice@example.com");
    assert_eq!(state["kubernetes"], kubernetes);
    assert!(state["infra"].is_null());
}

#![allow(clippy::unwrap_used)]
// Integration tests for `NexusClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nexus3_api::{Error, NexusClient, TlsMode, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NexusClient) {
    let server = MockServer::start().await;
    let client = NexusClient::with_client(
        &server.uri(),
        "admin",
        SecretString::from("admin123".to_string()),
        reqwest::Client::new(),
    )
    .unwrap();
    (server, client)
}

fn rest_path(suffix: &str) -> String {
    format!("/service/rest/v1/{suffix}")
}

// ── Repositories ────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_repositories_sends_basic_auth() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest_path("repositories")))
        .and(basic_auth("admin", "admin123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "maven-releases",
                "format": "maven2",
                "type": "hosted",
                "url": "http://nexus/repository/maven-releases",
                "attributes": {}
            },
            { "name": "npm-proxy", "format": "npm", "type": "proxy" }
        ])))
        .mount(&server)
        .await;

    let repos = client.list_repositories().await.unwrap();

    assert_eq!(repos.len(), 2);
    assert_eq!(repos[0].name, "maven-releases");
    assert_eq!(repos[0].format, "maven2");
    assert_eq!(repos[0].repo_type, "hosted");
    assert_eq!(repos[1].url, None);
}

#[tokio::test]
async fn test_get_repository_remaps_maven_format() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest_path("repositories/maven/hosted/maven-releases")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "maven-releases",
            "format": "maven2",
            "type": "hosted",
            "online": true
        })))
        .mount(&server)
        .await;

    let repo = client
        .get_repository("maven2", "hosted", "maven-releases")
        .await
        .unwrap();

    assert_eq!(repo["online"], json!(true));
}

#[tokio::test]
async fn test_create_repository_posts_payload() {
    let (server, client) = setup().await;
    let body = json!({ "name": "raw-hosted", "online": true });

    Mock::given(method("POST"))
        .and(path(rest_path("repositories/raw/hosted")))
        .and(body_json(&body))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client
        .create_repository("raw", "hosted", &body)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_validation_error_is_reported() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path(rest_path("repositories/raw/hosted/raw-hosted")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([
            { "id": "PARAMETER storage", "message": "may not be null" }
        ])))
        .mount(&server)
        .await;

    let result = client
        .update_repository("raw", "hosted", "raw-hosted", &json!({}))
        .await;

    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "PARAMETER storage: may not be null");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

// ── Security ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest_path("security/roles")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.list_roles().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_update_role_escapes_id() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path(rest_path("security/roles/team%20a")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .update_role("team a", &json!({ "id": "team a" }))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_realms_round_trip() {
    let (server, client) = setup().await;
    let realms = vec![
        "NexusAuthenticatingRealm".to_string(),
        "LdapRealm".to_string(),
    ];

    Mock::given(method("GET"))
        .and(path(rest_path("security/realms/active")))
        .respond_with(ResponseTemplate::new(200).set_body_json(&realms))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(rest_path("security/realms/active")))
        .and(body_json(&realms))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let active = client.active_realms().await.unwrap();
    assert_eq!(active, realms);
    client.set_active_realms(&active).await.unwrap();
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest_path("security/ldap")))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.list_ldap_servers().await.unwrap_err();
    assert!(err.is_unavailable(), "expected unavailable, got: {err:?}");
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(rest_path("security/ldap")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let result = client.list_ldap_servers().await;
    assert!(matches!(result, Err(Error::Deserialization { .. })));
}

#[tokio::test]
async fn test_non_ascii_page_preview_does_not_split_characters() {
    let (server, client) = setup().await;
    let page = format!("{}é… sign in", "x".repeat(199));

    Mock::given(method("GET"))
        .and(path(rest_path("security/roles")))
        .respond_with(ResponseTemplate::new(200).set_body_string(page.clone()))
        .mount(&server)
        .await;

    match client.list_roles().await {
        Err(Error::Deserialization { message, body }) => {
            assert_eq!(body, page);
            assert!(message.contains('é'), "{message}");
            assert!(!message.contains("sign in"), "{message}");
        }
        other => panic!("expected deserialization error, got: {other:?}"),
    }
}

// ── Transport ───────────────────────────────────────────────────────

#[test]
fn test_missing_ca_file_is_tls_error() {
    let dir = tempfile::tempdir().unwrap();
    let transport = TransportConfig {
        tls: TlsMode::CustomCa(dir.path().join("missing.pem")),
        ..TransportConfig::default()
    };

    let result = transport.build_client();
    assert!(matches!(result, Err(Error::Tls(_))));
}

mod auth_support;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};
use esi_auth::auth::{
    AuthError, AuthService, JwksProvider, KeySet, OAuthExchanger, TokenStore, TokenVerifier,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_support::{
    claims, config, hits, mount_issuer, published_key_set, rotated_key_set, sign, sign_rogue,
    sign_rogue_without_kid, sign_without_kid, token_body, InMemoryTokenStore, CHARACTER_ID,
    CLIENT_ID, CLIENT_SECRET, JWKS_PATH, OWNER_HASH, TOKEN_PATH,
};

const DISCOVERY_PATH: &str = "/.well-known/oauth-authorization-server";

fn exchanger(server: &MockServer) -> OAuthExchanger {
    let config = config(server);
    OAuthExchanger::new(&config, reqwest::Client::new())
}

async fn mount_token_response(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn exchange_code_posts_basic_auth_and_verifies_identity() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    let basic = format!("Basic {}", STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}")));
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", basic.as_str()))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=code-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(
            &sign(&claims(Utc::now() + Duration::minutes(20))),
            "refresh-1",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let grant = exchanger(&server)
        .exchange_code("code-123")
        .await
        .expect("exchange succeeds");

    assert_eq!(grant.claims.subject.id, CHARACTER_ID);
    assert_eq!(grant.claims.subject.kind, "CHARACTER");
    assert_eq!(grant.claims.name, "Pilot One");
    assert_eq!(grant.claims.owner_hash, OWNER_HASH);
    assert_eq!(
        grant.claims.scopes,
        "esi-wallet.read_character_wallet.v1 esi-contracts.read_character_contracts.v1"
    );
    assert_eq!(grant.credentials.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn exchange_code_rejects_wrong_audience_without_further_calls() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    let mut bad = claims(Utc::now() + Duration::minutes(20));
    bad["aud"] = json!(["wrong-client", "EVE Online"]);
    mount_token_response(&server, token_body(&sign(&bad), "refresh-1")).await;

    let err = exchanger(&server).exchange_code("code-123").await.unwrap_err();

    assert!(matches!(err, AuthError::TokenValidation(_)), "got {err:?}");
    assert_eq!(hits(&server, TOKEN_PATH).await, 1);
    assert_eq!(hits(&server, DISCOVERY_PATH).await, 1);
    assert_eq!(hits(&server, JWKS_PATH).await, 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn exchange_code_rejects_missing_audience() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    let mut bad = claims(Utc::now() + Duration::minutes(20));
    bad.as_object_mut().unwrap().remove("aud");
    mount_token_response(&server, token_body(&sign(&bad), "refresh-1")).await;

    let err = exchanger(&server).exchange_code("code-123").await.unwrap_err();
    assert!(matches!(err, AuthError::TokenValidation(_)), "got {err:?}");
}

#[tokio::test]
async fn signature_mismatch_is_validation_error_and_drops_cached_keys() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    mount_token_response(
        &server,
        token_body(&sign_rogue(&claims(Utc::now() + Duration::minutes(20))), "r"),
    )
    .await;

    let exchanger = exchanger(&server);
    let first = exchanger.exchange_code("code-1").await.unwrap_err();
    let second = exchanger.exchange_code("code-2").await.unwrap_err();

    assert!(matches!(first, AuthError::TokenValidation(_)));
    assert!(matches!(second, AuthError::TokenValidation(_)));
    assert_eq!(hits(&server, DISCOVERY_PATH).await, 2);
}

#[tokio::test]
async fn signing_keys_are_cached_between_successful_exchanges() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    mount_token_response(
        &server,
        token_body(&sign(&claims(Utc::now() + Duration::minutes(20))), "r"),
    )
    .await;

    let exchanger = exchanger(&server);
    exchanger.exchange_code("code-1").await.expect("first");
    exchanger.exchange_code("code-2").await.expect("second");

    assert_eq!(hits(&server, DISCOVERY_PATH).await, 1);
    assert_eq!(hits(&server, JWKS_PATH).await, 1);
}

#[tokio::test]
async fn cached_signing_keys_are_refetched_after_ttl() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    let provider = JwksProvider::new(
        reqwest::Client::new(),
        format!("{}{DISCOVERY_PATH}", server.uri()),
        std::time::Duration::from_millis(50),
    );

    provider.get_signing_keys().await.expect("first fetch");
    provider.get_signing_keys().await.expect("cached");
    assert_eq!(hits(&server, DISCOVERY_PATH).await, 1);

    tokio::time::sleep(std::time::Duration::from_millis(120)).await;
    provider.get_signing_keys().await.expect("refetch");

    assert_eq!(hits(&server, DISCOVERY_PATH).await, 2);
    assert_eq!(hits(&server, JWKS_PATH).await, 2);
}

#[test]
fn token_without_kid_is_checked_against_every_key() {
    let keys = KeySet::from_json(&rotated_key_set()).unwrap();
    assert_eq!(keys.len(), 2);
    let verifier = TokenVerifier::new(CLIENT_ID, vec!["https://login.eveonline.com".to_string()]);
    let claims = claims(Utc::now() + Duration::minutes(20));

    let verified = verifier
        .verify(&sign_without_kid(&claims), &keys)
        .expect("matches the second key");
    assert_eq!(verified.subject.id, CHARACTER_ID);

    let published = KeySet::from_json(&published_key_set()).unwrap();
    let err = verifier
        .verify(&sign_rogue_without_kid(&claims), &published)
        .unwrap_err();
    assert!(matches!(err, AuthError::TokenValidation(_)));
}

#[tokio::test]
async fn token_endpoint_error_is_token_request_error() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Authorization code not found"
        })))
        .mount(&server)
        .await;

    let err = exchanger(&server).exchange_code("stale").await.unwrap_err();

    match err {
        AuthError::TokenRequest { status, message } => {
            assert_eq!(status, Some(400));
            assert!(message.contains("invalid_grant"));
        }
        other => panic!("expected TokenRequest, got {other:?}"),
    }
    assert_eq!(hits(&server, DISCOVERY_PATH).await, 0);
}

#[tokio::test]
async fn discovery_without_key_set_uri_is_metadata_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": "https://login.eveonline.com"
        })))
        .mount(&server)
        .await;
    mount_token_response(
        &server,
        token_body(&sign(&claims(Utc::now() + Duration::minutes(20))), "r"),
    )
    .await;

    let err = exchanger(&server).exchange_code("code").await.unwrap_err();
    assert!(matches!(err, AuthError::Metadata(_)), "got {err:?}");
}

#[tokio::test]
async fn expired_identity_token_is_rejected() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    mount_token_response(
        &server,
        token_body(&sign(&claims(Utc::now() - Duration::minutes(5))), "r"),
    )
    .await;

    let err = exchanger(&server).exchange_code("code").await.unwrap_err();
    assert!(matches!(err, AuthError::TokenValidation(_)), "got {err:?}");
}

#[tokio::test]
async fn repeat_login_updates_record_but_owner_transfer_creates_new_one() {
    let server = MockServer::start().await;
    mount_issuer(&server).await;
    let first = claims(Utc::now() + Duration::minutes(20));
    let mut transferred = first.clone();
    transferred["owner"] = json!("owner-hash-b");

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("code=first"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&sign(&first), "r1")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("code=again"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&sign(&first), "r2")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("code=transferred"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body(&sign(&transferred), "r3")),
        )
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryTokenStore::new());
    let service = AuthService::new(Arc::new(exchanger(&server)), store.clone());

    let original = service.complete_login("first").await.unwrap();
    let again = service.complete_login("again").await.unwrap();
    assert!(Arc::ptr_eq(&original, &again));
    assert_eq!(store.list().unwrap().len(), 1);
    assert_eq!(
        original.snapshot().await.refresh_token.as_deref(),
        Some("r2")
    );

    let other = service.complete_login("transferred").await.unwrap();
    assert!(!Arc::ptr_eq(&original, &other));
    assert_eq!(store.list().unwrap().len(), 2);
    assert_eq!(other.snapshot().await.owner_hash, "owner-hash-b");
}

#[tokio::test]
async fn load_character_without_stored_token_is_not_logged_in() {
    let server = MockServer::start().await;
    let service = AuthService::new(
        Arc::new(exchanger(&server)),
        Arc::new(InMemoryTokenStore::new()),
    );

    let err = service.load_character(CHARACTER_ID).await.unwrap_err();
    assert!(matches!(err, AuthError::NotLoggedIn));
}

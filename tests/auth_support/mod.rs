#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use esi_auth::auth::{AuthError, Token, TokenIdentity, TokenStore};
use esi_auth::config::EsiConfig;
use esi_auth::util::retry::RetryPolicy;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "client-1";
pub const CLIENT_SECRET: &str = "secret-1";
pub const CHARACTER_ID: i64 = 90000001;
pub const OWNER_HASH: &str = "owner-hash-a";
pub const KID: &str = "JWT-Signature-Key";
pub const TOKEN_PATH: &str = "/v2/oauth/token";
pub const JWKS_PATH: &str = "/oauth/jwks";

const SIGNING_KEY: &[u8] = include_bytes!("../fixtures/signing_key.pem");
const ROGUE_KEY: &[u8] = include_bytes!("../fixtures/rogue_key.pem");
const SIGNING_JWK: &str = include_str!("../fixtures/signing_jwk.json");
const ROGUE_JWK: &str = include_str!("../fixtures/rogue_jwk.json");

#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<TokenIdentity, Token>>,
    saves: Mutex<usize>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, token: Token) {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(token.identity(), token);
    }

    pub fn get(&self, identity: &TokenIdentity) -> Option<Token> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .get(identity)
            .cloned()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().expect("store lock poisoned")
    }
}

impl TokenStore for InMemoryTokenStore {
    fn find(&self, identity: &TokenIdentity) -> Result<Option<Token>, AuthError> {
        Ok(self.get(identity))
    }

    fn save(&self, token: &Token) -> Result<(), AuthError> {
        *self.saves.lock().expect("store lock poisoned") += 1;
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(token.identity(), token.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Token>, AuthError> {
        Ok(self
            .tokens
            .lock()
            .expect("store lock poisoned")
            .values()
            .cloned()
            .collect())
    }
}

/// Config pointing both the SSO and ESI at `server`, with fast retries.
pub fn config(server: &MockServer) -> EsiConfig {
    EsiConfig::builder()
        .client_id(CLIENT_ID)
        .client_secret(CLIENT_SECRET)
        .callback_url("https://app.example/callback")
        .login_base_url(server.uri())
        .esi_base_url(server.uri())
        .retry(RetryPolicy::constant(6, Duration::from_millis(1)))
        .build()
}

/// Claims as the SSO issues them, for the default test character.
pub fn claims(expires_at: DateTime<Utc>) -> Value {
    json!({
        "scp": ["esi-wallet.read_character_wallet.v1", "esi-contracts.read_character_contracts.v1"],
        "jti": "998e12c7-3241-43c5-8355-2c48822e0a1b",
        "kid": KID,
        "sub": format!("CHARACTER:EVE:{CHARACTER_ID}"),
        "azp": CLIENT_ID,
        "tenant": "tranquility",
        "tier": "live",
        "region": "world",
        "aud": [CLIENT_ID, "EVE Online"],
        "name": "Pilot One",
        "owner": OWNER_HASH,
        "exp": expires_at.timestamp(),
        "iat": Utc::now().timestamp(),
        "iss": "https://login.eveonline.com"
    })
}

pub fn sign(claims: &Value) -> String {
    sign_with(claims, SIGNING_KEY)
}

/// Signed with a key the issuer never published, under the published kid.
pub fn sign_rogue(claims: &Value) -> String {
    sign_with(claims, ROGUE_KEY)
}

/// Signed with the published key but with no kid in the header.
pub fn sign_without_kid(claims: &Value) -> String {
    encode_with(Header::new(Algorithm::RS256), claims, SIGNING_KEY)
}

/// Signed with the unpublished key and no kid in the header.
pub fn sign_rogue_without_kid(claims: &Value) -> String {
    encode_with(Header::new(Algorithm::RS256), claims, ROGUE_KEY)
}

fn sign_with(claims: &Value, pem: &[u8]) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(KID.to_string());
    encode_with(header, claims, pem)
}

fn encode_with(header: Header, claims: &Value, pem: &[u8]) -> String {
    let key = EncodingKey::from_rsa_pem(pem).expect("fixture key parses");
    encode(&header, claims, &key).expect("sign test token")
}

/// Key-set JSON holding only the published key.
pub fn published_key_set() -> String {
    let jwk: Value = serde_json::from_str(SIGNING_JWK).expect("fixture jwk parses");
    json!({ "keys": [jwk] }).to_string()
}

/// Key-set JSON holding an unrelated key ahead of the published one, under distinct kids.
pub fn rotated_key_set() -> String {
    let mut other: Value = serde_json::from_str(ROGUE_JWK).expect("fixture jwk parses");
    other["kid"] = json!("previous-key");
    let mut current: Value = serde_json::from_str(SIGNING_JWK).expect("fixture jwk parses");
    current["kid"] = json!("current-key");
    json!({ "keys": [other, current] }).to_string()
}

pub fn token_body(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "expires_in": 1199,
        "token_type": "Bearer",
        "refresh_token": refresh_token
    })
}

/// Mount discovery and key-set endpoints for the fixture signing key.
pub async fn mount_issuer(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": "https://login.eveonline.com",
            "token_endpoint": format!("{}{TOKEN_PATH}", server.uri()),
            "jwks_uri": format!("{}{JWKS_PATH}", server.uri()),
        })))
        .mount(server)
        .await;

    let jwk: Value = serde_json::from_str(SIGNING_JWK).expect("fixture jwk parses");
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [jwk] })))
        .mount(server)
        .await;
}

pub fn token(access_token: &str, expires_at: DateTime<Utc>) -> Token {
    Token {
        access_token: access_token.to_string(),
        refresh_token: Some("refresh-0".to_string()),
        expires_at,
        scopes: "esi-wallet.read_character_wallet.v1 esi-contracts.read_character_contracts.v1"
            .to_string(),
        character_id: CHARACTER_ID,
        character_name: "Pilot One".to_string(),
        owner_hash: OWNER_HASH.to_string(),
        last_refresh: None,
    }
}

/// Count of requests `server` received for `request_path`.
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.path() == request_path)
        .count()
}

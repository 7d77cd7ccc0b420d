//! Authorization-code and refresh-token grants against the SSO token endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::Deserialize;

use super::claims::ClaimSet;
use super::error::AuthError;
use super::jwks::JwksProvider;
use super::verify::TokenVerifier;
use crate::config::EsiConfig;
use crate::error::EsiError;

/// Opaque credentials returned by the token endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"..")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| ".."))
            .finish()
    }
}

/// A successful grant: credentials plus the verified identity they belong to.
#[derive(Debug, Clone)]
pub struct Grant {
    pub credentials: Credentials,
    pub claims: ClaimSet,
}

/// The refresh half of the exchanger, as seen by a token that needs renewing.
#[async_trait]
pub trait RefreshGrant: Send + Sync {
    async fn exchange_refresh(&self, refresh_token: &str) -> Result<Grant, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Some issuers send a separate identity token; the SSO signs the access token itself.
    #[serde(default)]
    id_token: Option<String>,
}

/// Performs token grants and verifies every identity they return.
///
/// # Example
/// ```no_run
/// use esi_auth::auth::OAuthExchanger;
/// use esi_auth::config::EsiConfig;
///
/// # async fn example() -> esi_auth::error::Result<()> {
/// let config = EsiConfig::from_env()?;
/// let exchanger = OAuthExchanger::new(&config, config.http_client()?);
/// let grant = exchanger.exchange_code("authorization-code").await?;
/// println!("{} ({})", grant.claims.name, grant.claims.subject.id);
/// # Ok(())
/// # }
/// ```
pub struct OAuthExchanger {
    client: reqwest::Client,
    client_id: String,
    client_secret: Option<String>,
    callback_url: Option<String>,
    token_url: String,
    authorize_url: String,
    jwks: Arc<JwksProvider>,
    verifier: TokenVerifier,
}

impl OAuthExchanger {
    pub fn new(config: &EsiConfig, client: reqwest::Client) -> Self {
        let jwks = Arc::new(JwksProvider::new(
            client.clone(),
            config.discovery_url(),
            config.jwks_ttl,
        ));
        Self::with_jwks(config, client, jwks)
    }

    /// Share a key-set cache between exchangers for the same issuer.
    pub fn with_jwks(config: &EsiConfig, client: reqwest::Client, jwks: Arc<JwksProvider>) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            callback_url: config.callback_url.clone(),
            token_url: config.token_url(),
            authorize_url: config.authorize_url(),
            jwks,
            verifier: TokenVerifier::new(
                config.client_id.clone(),
                config.accepted_issuers.clone(),
            ),
        }
    }

    pub fn jwks(&self) -> &Arc<JwksProvider> {
        &self.jwks
    }

    /// Build the SSO login URL for `scopes` (space- or comma-separated) and caller-supplied `state`.
    pub fn authorize_url(&self, scopes: &str, state: &str) -> Result<String, EsiError> {
        let redirect_uri = self.callback_url.as_deref().ok_or_else(|| {
            EsiError::Configuration("callback_url is required to build a login URL".to_string())
        })?;
        let mut url = Url::parse(&self.authorize_url)
            .map_err(|e| EsiError::Configuration(format!("invalid login base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("redirect_uri", redirect_uri);
            pairs.append_pair("client_id", &self.client_id);
            let scopes = normalize_scope_list(scopes);
            if !scopes.is_empty() {
                pairs.append_pair("scope", &scopes);
            }
            pairs.append_pair("state", state);
        }

        Ok(url.to_string())
    }

    /// Exchange an authorization code for credentials and a verified identity.
    pub async fn exchange_code(&self, code: &str) -> Result<Grant, AuthError> {
        self.grant("authorization_code", &[("grant_type", "authorization_code"), ("code", code)])
            .await
    }

    async fn grant(&self, grant_type: &str, form: &[(&str, &str)]) -> Result<Grant, AuthError> {
        let basic = self.basic_auth_header()?;
        let resp = self
            .client
            .post(&self.token_url)
            .header(AUTHORIZATION, basic)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(AuthError::token_request)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenRequest {
                status: Some(status.as_u16()),
                message: format!("{grant_type} grant returned HTTP {status}: {body}"),
            });
        }

        let payload: TokenResponse = resp.json().await.map_err(|e| AuthError::TokenRequest {
            status: Some(status.as_u16()),
            message: format!("invalid token response: {e}"),
        })?;

        let signed = payload.id_token.as_deref().unwrap_or(&payload.access_token);
        let keys = self.jwks.get_signing_keys().await?;
        let claims = match self.verifier.verify(signed, &keys) {
            Ok(claims) => claims,
            Err(e) => {
                self.jwks.invalidate().await;
                return Err(e);
            }
        };

        tracing::debug!(
            grant_type,
            character_id = claims.subject.id,
            expires_at = %claims.expires_at,
            "Token grant verified"
        );

        Ok(Grant {
            credentials: Credentials {
                access_token: payload.access_token,
                refresh_token: payload.refresh_token,
            },
            claims,
        })
    }

    fn basic_auth_header(&self) -> Result<HeaderValue, AuthError> {
        let secret = self
            .client_secret
            .as_deref()
            .ok_or_else(|| AuthError::TokenRequest {
                status: None,
                message: "client secret is not configured".to_string(),
            })?;
        let encoded = STANDARD.encode(format!("{}:{secret}", self.client_id));
        HeaderValue::from_str(&format!("Basic {encoded}")).map_err(|e| AuthError::TokenRequest {
            status: None,
            message: format!("invalid client credentials: {e}"),
        })
    }
}

#[async_trait]
impl RefreshGrant for OAuthExchanger {
    /// Renew credentials; a refresh whose identity fails verification is an error.
    async fn exchange_refresh(&self, refresh_token: &str) -> Result<Grant, AuthError> {
        self.grant(
            "refresh_token",
            &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
        )
        .await
    }
}

/// `"a b"`, `"a,b"` and `"a, b"` all become `"a b"`.
fn normalize_scope_list(scopes: &str) -> String {
    scopes
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

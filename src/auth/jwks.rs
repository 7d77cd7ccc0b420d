//! Signing-key discovery and caching.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::error::AuthError;

/// Issuer discovery document; only the key-set location is used.
#[derive(Debug, Clone, Deserialize)]
struct DiscoveryDocument {
    #[serde(default)]
    jwks_uri: Option<String>,
}

/// Parsed signing keys, ready for signature checks.
#[derive(Clone)]
pub struct KeySet {
    keys: Arc<Vec<SigningKey>>,
}

#[derive(Clone)]
struct SigningKey {
    kid: Option<String>,
    key: DecodingKey,
}

impl KeySet {
    /// Convert a JSON Web Key Set; any key that fails to parse is a metadata error.
    pub fn from_jwk_set(set: &JwkSet) -> Result<Self, AuthError> {
        let keys = set
            .keys
            .iter()
            .map(|jwk| {
                let key = DecodingKey::from_jwk(jwk).map_err(|e| {
                    AuthError::Metadata(format!(
                        "invalid key {:?} in key set: {e}",
                        jwk.common.key_id
                    ))
                })?;
                Ok(SigningKey {
                    kid: jwk.common.key_id.clone(),
                    key,
                })
            })
            .collect::<Result<Vec<_>, AuthError>>()?;
        Ok(Self {
            keys: Arc::new(keys),
        })
    }

    /// Parse a raw JWKS document.
    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let set: JwkSet = serde_json::from_str(raw)
            .map_err(|e| AuthError::Metadata(format!("failed to parse key set: {e}")))?;
        Self::from_jwk_set(&set)
    }

    /// Keys a token may be signed with: the one matching `kid`, or every
    /// key when the header names none.
    pub fn candidates<'a>(
        &'a self,
        kid: Option<&'a str>,
    ) -> impl Iterator<Item = &'a DecodingKey> + 'a {
        self.keys
            .iter()
            .filter(move |k| kid.is_none() || k.kid.as_deref() == kid)
            .map(|k| &k.key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kids: Vec<_> = self.keys.iter().map(|k| k.kid.as_deref()).collect();
        f.debug_struct("KeySet").field("kids", &kids).finish()
    }
}

struct CachedKeys {
    keys: KeySet,
    fetched_at: Instant,
}

/// Fetches the issuer's signing keys via its discovery document.
///
/// Key sets are cached per discovery URL for `ttl`; call
/// [`invalidate`](Self::invalidate) after a verification failure so the next
/// lookup goes back to the network.
pub struct JwksProvider {
    client: reqwest::Client,
    discovery_url: String,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedKeys>>,
}

impl JwksProvider {
    pub fn new(client: reqwest::Client, discovery_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            discovery_url: discovery_url.into(),
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Current signing keys, from cache when still within TTL.
    pub async fn get_signing_keys(&self) -> Result<KeySet, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(&self.discovery_url) {
                if cached.fetched_at.elapsed() < self.ttl {
                    return Ok(cached.keys.clone());
                }
            }
        }

        let keys = self.fetch().await?;
        self.cache.write().await.insert(
            self.discovery_url.clone(),
            CachedKeys {
                keys: keys.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(keys)
    }

    /// Drop the cached key set for this issuer.
    pub async fn invalidate(&self) {
        if self.cache.write().await.remove(&self.discovery_url).is_some() {
            tracing::debug!(issuer = %self.discovery_url, "Invalidated cached signing keys");
        }
    }

    async fn fetch(&self) -> Result<KeySet, AuthError> {
        let discovery: DiscoveryDocument = self.get_json(&self.discovery_url, "discovery").await?;
        let jwks_uri = discovery
            .jwks_uri
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| AuthError::Metadata("discovery document has no jwks_uri".to_string()))?;

        let set: JwkSet = self.get_json(&jwks_uri, "key set").await?;
        let keys = KeySet::from_jwk_set(&set)?;
        tracing::debug!(jwks_uri = %jwks_uri, keys = keys.len(), "Fetched signing keys");
        Ok(keys)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
    ) -> Result<T, AuthError> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AuthError::Metadata(format!("{what} request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AuthError::Metadata(format!(
                "{what} request returned HTTP {}",
                resp.status()
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| AuthError::Metadata(format!("failed to parse {what}: {e}")))
    }
}

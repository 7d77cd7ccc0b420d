use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::claims::ClaimSet;
use super::exchange::Grant;

/// One authorized relationship to one character.
///
/// # Example
/// ```
/// use esi_auth::auth::Token;
/// use chrono::{Duration, Utc};
///
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     expires_at: Utc::now() + Duration::minutes(20),
///     scopes: "esi-wallet.read_character_wallet.v1".to_string(),
///     character_id: 2112625428,
///     character_name: "Some Pilot".to_string(),
///     owner_hash: "owner-hash".to_string(),
///     last_refresh: None,
/// };
/// assert!(!token.is_stale(Utc::now()));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// `None` once the issuer has revoked the grant.
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Space-delimited granted scopes.
    pub scopes: String,
    pub character_id: i64,
    pub character_name: String,
    /// Changes when the character is transferred to another account.
    pub owner_hash: String,
    pub last_refresh: Option<DateTime<Utc>>,
}

/// What makes two tokens the same token: scopes, character, owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenIdentity {
    pub scopes: String,
    pub character_id: i64,
    pub owner_hash: String,
}

impl TokenIdentity {
    /// Hex SHA-256 over the identity triple; stable storage key.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.scopes.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.character_id.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.owner_hash.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

impl From<&ClaimSet> for TokenIdentity {
    fn from(claims: &ClaimSet) -> Self {
        Self {
            scopes: claims.scopes.clone(),
            character_id: claims.subject.id,
            owner_hash: claims.owner_hash.clone(),
        }
    }
}

impl Token {
    /// New record from a first code exchange.
    pub fn from_grant(grant: Grant) -> Self {
        let Grant {
            credentials,
            claims,
        } = grant;
        Self {
            access_token: credentials.access_token,
            refresh_token: credentials.refresh_token,
            expires_at: claims.expires_at,
            scopes: claims.scopes,
            character_id: claims.subject.id,
            character_name: claims.name,
            owner_hash: claims.owner_hash,
            last_refresh: Some(Utc::now()),
        }
    }

    pub fn identity(&self) -> TokenIdentity {
        TokenIdentity {
            scopes: self.scopes.clone(),
            character_id: self.character_id,
            owner_hash: self.owner_hash.clone(),
        }
    }

    /// `true` once `now` has reached the expiry instant.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Take new credentials and expiry from a grant for the same identity.
    ///
    /// The refresh credential is only replaced when the issuer sent one.
    pub fn apply_grant(&mut self, grant: Grant) {
        let Grant {
            credentials,
            claims,
        } = grant;
        self.access_token = credentials.access_token;
        if let Some(refresh) = credentials.refresh_token {
            self.refresh_token = Some(refresh);
        }
        self.expires_at = claims.expires_at;
        self.character_name = claims.name;
        self.last_refresh = Some(Utc::now());
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("character_id", &self.character_id)
            .field("character_name", &self.character_name)
            .field("scopes", &self.scopes)
            .field("expires_at", &self.expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

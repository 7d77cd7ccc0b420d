//! Identity claims carried by SSO-signed tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// Audience tag the SSO adds next to the client id.
pub const SSO_AUDIENCE: &str = "EVE Online";

/// `sub` claim split into its entity kind and numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: String,
    pub id: i64,
}

impl Subject {
    /// Parse `CHARACTER:EVE:2112625428` (or `<type>:<id>`); the id is the last segment.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let mut parts = raw.split(':');
        let kind = parts.next().unwrap_or_default();
        let id = parts
            .next_back()
            .and_then(|segment| segment.parse::<i64>().ok())
            .ok_or_else(|| AuthError::TokenValidation(format!("malformed sub claim: {raw}")))?;
        if kind.is_empty() {
            return Err(AuthError::TokenValidation(format!(
                "malformed sub claim: {raw}"
            )));
        }
        Ok(Self {
            kind: kind.to_string(),
            id,
        })
    }
}

/// Validated content of a signed identity token.
///
/// Built once by [`TokenVerifier`](super::verify::TokenVerifier); fields are
/// never looked up by key afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    pub subject: Subject,
    pub name: String,
    pub owner_hash: String,
    pub audience: Vec<String>,
    pub issuer: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Granted scopes, space-delimited, in issuer order.
    pub scopes: String,
}

/// `scp` arrives as a single string when one scope was granted, a list otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub(crate) fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => value
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            Self::Many(values) => values,
        }
    }
}

/// Wire shape of the JWT payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawClaims {
    pub sub: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: String,
    pub exp: i64,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<StringOrList>,
    #[serde(default)]
    pub scp: Option<StringOrList>,
}

impl RawClaims {
    pub(crate) fn into_claim_set(self) -> Result<ClaimSet, AuthError> {
        let subject = Subject::parse(&self.sub)?;
        let expires_at = DateTime::<Utc>::from_timestamp(self.exp, 0)
            .ok_or_else(|| AuthError::TokenValidation(format!("exp out of range: {}", self.exp)))?;
        let audience = self
            .aud
            .map(StringOrList::into_vec)
            .ok_or_else(|| AuthError::TokenValidation("missing aud claim".to_string()))?;
        let scopes = normalize_scopes(self.scp);
        Ok(ClaimSet {
            subject,
            name: self.name,
            owner_hash: self.owner,
            audience,
            issuer: self.iss,
            expires_at,
            scopes,
        })
    }
}

fn normalize_scopes(scp: Option<StringOrList>) -> String {
    scp.map(StringOrList::into_vec)
        .unwrap_or_default()
        .join(" ")
}

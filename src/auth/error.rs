use thiserror::Error;

/// Errors raised while talking to the SSO issuer or the token store.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Discovery document or key set unreachable, incomplete, or unparseable.
    #[error("Issuer metadata error: {0}")]
    Metadata(String),
    /// Token endpoint unreachable or returned a non-success status.
    #[error("Token request failed: {message}")]
    TokenRequest { status: Option<u16>, message: String },
    /// Signature, audience, issuer, expiry or identity mismatch.
    #[error("Token validation failed: {0}")]
    TokenValidation(String),
    #[error("Token has no refresh credential")]
    MissingRefreshToken,
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    pub(crate) fn token_request(error: reqwest::Error) -> Self {
        Self::TokenRequest {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

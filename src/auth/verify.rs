//! JWT signature and claim verification.

use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::{ClaimSet, RawClaims, SSO_AUDIENCE};
use super::error::AuthError;
use super::jwks::KeySet;

const ACCEPTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// Validates SSO-signed tokens against a key set. Performs no I/O.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    client_id: String,
    issuers: Vec<String>,
    leeway_secs: u64,
}

impl TokenVerifier {
    pub fn new(client_id: impl Into<String>, issuers: Vec<String>) -> Self {
        Self {
            client_id: client_id.into(),
            issuers,
            leeway_secs: 0,
        }
    }

    /// Clock skew tolerated on `exp`.
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Verify signature, expiry, issuer and audience, then build the claim set.
    ///
    /// The audience must list both the client id and [`SSO_AUDIENCE`].
    pub fn verify(&self, signed_token: &str, keys: &KeySet) -> Result<ClaimSet, AuthError> {
        let header = decode_header(signed_token)
            .map_err(|e| AuthError::TokenValidation(format!("invalid JWT header: {e}")))?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::TokenValidation(format!(
                "unsupported signing algorithm {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;
        // Audience needs both values present; checked below.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if !self.issuers.is_empty() {
            validation.set_issuer(&self.issuers);
        }

        let mut last_error = None;
        for key in keys.candidates(header.kid.as_deref()) {
            match decode::<RawClaims>(signed_token, key, &validation) {
                Ok(data) => {
                    let claims = data.claims.into_claim_set()?;
                    self.check_audience(&claims.audience)?;
                    return Ok(claims);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(AuthError::TokenValidation(match last_error {
            Some(e) => format!("JWT validation failed: {e}"),
            None => format!("no signing key for kid {:?}", header.kid),
        }))
    }

    fn check_audience(&self, audience: &[String]) -> Result<(), AuthError> {
        let has = |value: &str| audience.iter().any(|a| a == value);
        if !has(&self.client_id) || !has(SSO_AUDIENCE) {
            return Err(AuthError::TokenValidation(format!(
                "audience {audience:?} must contain {:?} and {SSO_AUDIENCE:?}",
                self.client_id
            )));
        }
        Ok(())
    }
}

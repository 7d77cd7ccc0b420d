//! Self-refreshing access to one stored token.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use super::error::AuthError;
use super::exchange::RefreshGrant;
use super::store::TokenStore;
use super::token::{Token, TokenIdentity};

/// A [`Token`] plus what it needs to keep itself usable.
///
/// [`access`](Self::access) holds a per-token lock across the whole
/// stale-check and refresh, so concurrent callers on a stale token queue
/// behind one refresh and then see its result.
pub struct ManagedToken {
    state: Mutex<Token>,
    refresher: Arc<dyn RefreshGrant>,
    store: Arc<dyn TokenStore>,
}

impl ManagedToken {
    pub fn new(token: Token, refresher: Arc<dyn RefreshGrant>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            state: Mutex::new(token),
            refresher,
            store,
        }
    }

    /// A bearer credential that is not expired at the instant of return.
    ///
    /// A fresh token is returned without any network call. A stale one is
    /// refreshed, persisted, then returned. If the refresh fails the stored
    /// token is left exactly as it was.
    pub async fn access(&self) -> Result<String, AuthError> {
        let mut current = self.state.lock().await;
        if !current.is_stale(Utc::now()) {
            return Ok(current.access_token.clone());
        }

        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or(AuthError::MissingRefreshToken)?;

        tracing::debug!(
            character_id = current.character_id,
            expired_at = %current.expires_at,
            "Refreshing stale token"
        );

        let grant = self.refresher.exchange_refresh(&refresh_token).await?;

        if grant.claims.subject.id != current.character_id
            || grant.claims.owner_hash != current.owner_hash
        {
            return Err(AuthError::TokenValidation(format!(
                "refresh for character {} returned identity of character {}",
                current.character_id, grant.claims.subject.id
            )));
        }

        let mut refreshed = current.clone();
        refreshed.apply_grant(grant);
        *current = refreshed;

        // Committed before persisting: the issuer may already have rotated the refresh credential.
        self.store.save(&current)?;

        tracing::debug!(
            character_id = current.character_id,
            expires_at = %current.expires_at,
            "Token refreshed"
        );
        Ok(current.access_token.clone())
    }

    /// Copy of the current record.
    pub async fn snapshot(&self) -> Token {
        self.state.lock().await.clone()
    }

    pub async fn identity(&self) -> TokenIdentity {
        self.state.lock().await.identity()
    }

    /// Replace credentials from a fresh code exchange for the same identity.
    pub(crate) async fn replace(&self, token: Token) {
        *self.state.lock().await = token;
    }
}

impl std::fmt::Debug for ManagedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedToken").finish_non_exhaustive()
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::error::AuthError;
use super::exchange::{OAuthExchanger, RefreshGrant};
use super::managed::ManagedToken;
use super::store::TokenStore;
use super::token::{Token, TokenIdentity};
use crate::error::EsiError;

/// Service facade for the SSO login flow and the tokens it produces.
///
/// Hands out one [`ManagedToken`] per identity, so every caller sharing a
/// service also shares that token's refresh lock. All I/O decisions
/// (printing, prompting, exit codes) belong to the caller.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use esi_auth::auth::{AuthService, FileTokenStore, OAuthExchanger};
/// use esi_auth::config::EsiConfig;
///
/// # async fn example() -> esi_auth::error::Result<()> {
/// let config = EsiConfig::from_env()?;
/// let exchanger = Arc::new(OAuthExchanger::new(&config, config.http_client()?));
/// let service = AuthService::new(exchanger, Arc::new(FileTokenStore::new_default()));
///
/// println!("{}", service.login_url("esi-wallet.read_character_wallet.v1", "state-123")?);
/// let token = service.complete_login("code-from-callback").await?;
/// println!("logged in as {}", token.snapshot().await.character_name);
/// # Ok(())
/// # }
/// ```
pub struct AuthService {
    exchanger: Arc<OAuthExchanger>,
    store: Arc<dyn TokenStore>,
    live: Mutex<HashMap<TokenIdentity, Arc<ManagedToken>>>,
}

impl AuthService {
    pub fn new(exchanger: Arc<OAuthExchanger>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            exchanger,
            store,
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// SSO login URL for `scopes` with caller-supplied `state`.
    pub fn login_url(&self, scopes: &str, state: &str) -> Result<String, EsiError> {
        self.exchanger.authorize_url(scopes, state)
    }

    /// Exchange an authorization code and record the resulting token.
    ///
    /// A code for an identity already on record updates that record in place;
    /// otherwise a new one is created. A character that changed owner is a new
    /// identity and never overwrites the previous owner's record.
    pub async fn complete_login(&self, code: &str) -> Result<Arc<ManagedToken>, AuthError> {
        let grant = self.exchanger.exchange_code(code).await?;
        let token = Token::from_grant(grant);
        let identity = token.identity();
        let existed = self.store.find(&identity)?.is_some();
        self.store.save(&token)?;

        tracing::info!(
            character_id = token.character_id,
            character_name = %token.character_name,
            updated = existed,
            "Login completed"
        );

        let mut live = self.live.lock().await;
        if let Some(managed) = live.get(&identity) {
            managed.replace(token).await;
            return Ok(managed.clone());
        }
        let managed = Arc::new(self.manage(token));
        live.insert(identity, managed.clone());
        Ok(managed)
    }

    /// The managed token for `identity`, loading it from the store on first use.
    pub async fn load(&self, identity: &TokenIdentity) -> Result<Arc<ManagedToken>, AuthError> {
        let mut live = self.live.lock().await;
        if let Some(managed) = live.get(identity) {
            return Ok(managed.clone());
        }
        let token = self.store.find(identity)?.ok_or(AuthError::NotLoggedIn)?;
        let managed = Arc::new(self.manage(token));
        live.insert(identity.clone(), managed.clone());
        Ok(managed)
    }

    /// The stored token for `character_id` with the latest expiry.
    pub async fn load_character(&self, character_id: i64) -> Result<Arc<ManagedToken>, AuthError> {
        let identity = self
            .store
            .list()?
            .into_iter()
            .filter(|token| token.character_id == character_id)
            .max_by_key(|token| token.expires_at)
            .map(|token| token.identity())
            .ok_or(AuthError::NotLoggedIn)?;
        self.load(&identity).await
    }

    fn manage(&self, token: Token) -> ManagedToken {
        let refresher: Arc<dyn RefreshGrant> = self.exchanger.clone();
        ManagedToken::new(token, refresher, self.store.clone())
    }
}

//! Configuration (layered: code > env > defaults).

use std::time::Duration;

use bon::Builder;

use crate::error::EsiError;
use crate::util::retry::RetryPolicy;

pub const DEFAULT_LOGIN_BASE_URL: &str = "https://login.eveonline.com";
pub const DEFAULT_ESI_BASE_URL: &str = "https://esi.evetech.net";

/// Issuer values the SSO puts in `iss`.
pub const DEFAULT_ISSUERS: &[&str] = &["login.eveonline.com", "https://login.eveonline.com"];

/// Settings shared by the SSO exchanger and the ESI client.
///
/// # Example
/// ```
/// use esi_auth::config::EsiConfig;
///
/// let config = EsiConfig::builder()
///     .client_id("my-client")
///     .client_secret("my-secret")
///     .build();
/// assert_eq!(config.esi_base_url, "https://esi.evetech.net");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct EsiConfig {
    #[builder(into)]
    pub client_id: String,
    #[builder(into)]
    pub client_secret: Option<String>,
    /// Redirect URI registered with the SSO application.
    #[builder(into)]
    pub callback_url: Option<String>,
    #[builder(into, default = DEFAULT_LOGIN_BASE_URL.to_string())]
    pub login_base_url: String,
    #[builder(into, default = DEFAULT_ESI_BASE_URL.to_string())]
    pub esi_base_url: String,
    #[builder(into, default = default_user_agent())]
    pub user_agent: String,
    #[builder(default = Duration::from_secs(6))]
    pub connect_timeout: Duration,
    #[builder(default = Duration::from_secs(10))]
    pub read_timeout: Duration,
    #[builder(default)]
    pub retry: RetryPolicy,
    /// How long a fetched signing-key set stays usable.
    #[builder(default = Duration::from_secs(300))]
    pub jwks_ttl: Duration,
    #[builder(default = DEFAULT_ISSUERS.iter().map(|s| s.to_string()).collect())]
    pub accepted_issuers: Vec<String>,
}

impl EsiConfig {
    /// Load from environment variables (`ESI_SSO_CLIENT_ID`, `ESI_SSO_CLIENT_SECRET`, ...).
    pub fn from_env() -> Result<Self, EsiError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error

        let client_id = std::env::var("ESI_SSO_CLIENT_ID").map_err(|_| {
            EsiError::Configuration("Environment variable ESI_SSO_CLIENT_ID not set".to_string())
        })?;

        Ok(Self::builder()
            .client_id(client_id)
            .maybe_client_secret(std::env::var("ESI_SSO_CLIENT_SECRET").ok())
            .maybe_callback_url(std::env::var("ESI_SSO_CALLBACK_URL").ok())
            .maybe_login_base_url(std::env::var("ESI_SSO_BASE_URL").ok())
            .maybe_esi_base_url(std::env::var("ESI_BASE_URL").ok())
            .maybe_user_agent(std::env::var("ESI_USER_AGENT").ok())
            .build())
    }

    /// Token endpoint (`/v2/oauth/token`).
    pub fn token_url(&self) -> String {
        format!("{}/v2/oauth/token", self.login_base_url.trim_end_matches('/'))
    }

    /// Authorization endpoint (`/v2/oauth/authorize`).
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/v2/oauth/authorize",
            self.login_base_url.trim_end_matches('/')
        )
    }

    /// HTTP client carrying the configured timeouts and user agent.
    pub fn http_client(&self) -> Result<reqwest::Client, EsiError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| EsiError::Configuration(format!("failed to build HTTP client: {e}")))
    }

    /// Discovery document (`/.well-known/oauth-authorization-server`).
    pub fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/oauth-authorization-server",
            self.login_base_url.trim_end_matches('/')
        )
    }
}

fn default_user_agent() -> String {
    format!("esi-auth/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let config = EsiConfig::builder().client_id("abc").build();
        assert_eq!(config.login_base_url, DEFAULT_LOGIN_BASE_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(6));
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 6);
        assert_eq!(config.accepted_issuers.len(), 2);
        assert!(config.client_secret.is_none());
        assert!(config.user_agent.starts_with("esi-auth/"));
    }

    #[test]
    fn endpoint_urls_tolerate_trailing_slash() {
        let config = EsiConfig::builder()
            .client_id("abc")
            .login_base_url("http://localhost:9999/")
            .build();
        assert_eq!(config.token_url(), "http://localhost:9999/v2/oauth/token");
        assert_eq!(
            config.discovery_url(),
            "http://localhost:9999/.well-known/oauth-authorization-server"
        );
        assert_eq!(
            config.authorize_url(),
            "http://localhost:9999/v2/oauth/authorize"
        );
    }
}

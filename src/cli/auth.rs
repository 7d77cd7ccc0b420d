//! CLI auth command handlers for login-url, login, and status.

use std::sync::Arc;

use crate::auth::{AuthService, FileTokenStore, OAuthExchanger, TokenStore};
use crate::config::EsiConfig;

pub(crate) fn service(config: &EsiConfig) -> Result<AuthService, Box<dyn std::error::Error>> {
    let exchanger = Arc::new(OAuthExchanger::new(config, config.http_client()?));
    Ok(AuthService::new(
        exchanger,
        Arc::new(FileTokenStore::new_default()),
    ))
}

/// Handle `esi-auth login-url`.
pub async fn handle_login_url(
    scopes: &str,
    state: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = EsiConfig::from_env()?;
    let state = state.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
    let url = service(&config)?.login_url(scopes, &state)?;

    println!("🔗 Visit: {url}");
    println!("📋 State: {state}");
    Ok(())
}

/// Handle `esi-auth login <code>`.
pub async fn handle_login(code: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = EsiConfig::from_env()?;
    let managed = service(&config)?.complete_login(code).await?;
    let token = managed.snapshot().await;

    println!(
        "✅ Logged in as {} ({})",
        token.character_name, token.character_id
    );
    println!("   Scopes: {}", token.scopes);
    println!(
        "   Expires: {}",
        token.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

/// Handle `esi-auth status`.
pub async fn handle_status() -> Result<(), Box<dyn std::error::Error>> {
    let store = FileTokenStore::new_default();
    let tokens = store.list()?;

    println!("🔐 Stored tokens\n");
    if tokens.is_empty() {
        println!("  ❌ Not logged in");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for token in tokens {
        let status = if token.is_stale(now) {
            if token.refresh_token.is_some() {
                "⚠️  Expired (refreshes on next use)".to_string()
            } else {
                "❌ Expired, no refresh token".to_string()
            }
        } else {
            format!("✅ Valid until {}", token.expires_at.format("%Y-%m-%d %H:%M"))
        };
        println!(
            "  {} ({}): {status}",
            token.character_name, token.character_id
        );
        println!("     scopes: {}", token.scopes);
    }
    Ok(())
}

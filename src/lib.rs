//! esi-auth: EVE SSO token lifecycle and ESI read client.
//!
//! Exchanges SSO authorization codes for verified tokens, keeps those tokens
//! fresh across their lifetime, and reads the paginated, ETag-cached ESI API
//! with them.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use esi_auth::auth::{AuthService, FileTokenStore, OAuthExchanger};
//! use esi_auth::client::{EsiClient, FetchOptions};
//! use esi_auth::config::EsiConfig;
//!
//! # async fn example() -> esi_auth::error::Result<()> {
//! let config = EsiConfig::from_env()?;
//! let exchanger = Arc::new(OAuthExchanger::new(&config, config.http_client()?));
//! let service = AuthService::new(exchanger, Arc::new(FileTokenStore::new_default()));
//!
//! let token = service.complete_login("code-from-callback").await?;
//! let character_id = token.snapshot().await.character_id;
//! let client = EsiClient::new(&config, Some(token))?;
//! let journal = client
//!     .character_wallet_journal(character_id, &FetchOptions::all())
//!     .await?;
//! println!("{} journal entries", journal.data().len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;

//! EVE SSO: code exchange, token verification, and self-refreshing token records.

pub mod claims;
pub mod error;
pub mod exchange;
pub mod jwks;
pub mod managed;
pub mod service;
pub mod store;
pub mod token;
pub mod verify;

pub use claims::{ClaimSet, Subject, SSO_AUDIENCE};
pub use error::AuthError;
pub use exchange::{Credentials, Grant, OAuthExchanger, RefreshGrant};
pub use jwks::{JwksProvider, KeySet};
pub use managed::ManagedToken;
pub use service::AuthService;
pub use store::{FileTokenStore, TokenStore, TokenStoreConfig};
pub use token::{Token, TokenIdentity};
pub use verify::TokenVerifier;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::{Token, TokenIdentity};

/// Persistence collaborator for token records.
///
/// Records are keyed by [`TokenIdentity`]; a character transferred to another
/// owner is a different record. Deleting records is left to the implementor.
pub trait TokenStore: Send + Sync {
    fn find(&self, identity: &TokenIdentity) -> Result<Option<Token>, AuthError>;
    fn save(&self, token: &Token) -> Result<(), AuthError>;
    fn list(&self) -> Result<Vec<Token>, AuthError>;
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_store_dir()
    }
}

/// File-backed token store, one TOML file per identity.
///
/// # Example
/// ```no_run
/// use esi_auth::auth::{FileTokenStore, Token, TokenStore};
/// use chrono::{Duration, Utc};
///
/// let store = FileTokenStore::new_default();
/// let token = Token {
///     access_token: "access".to_string(),
///     refresh_token: Some("refresh".to_string()),
///     expires_at: Utc::now() + Duration::minutes(20),
///     scopes: "publicData".to_string(),
///     character_id: 2112625428,
///     character_name: "Some Pilot".to_string(),
///     owner_hash: "owner-hash".to_string(),
///     last_refresh: None,
/// };
/// store.save(&token)?;
/// # Ok::<(), esi_auth::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_store_dir(),
        }
    }

    fn token_path(&self, identity: &TokenIdentity) -> PathBuf {
        self.base_dir
            .join(format!("{}.toml", identity.fingerprint()))
    }

    fn ensure_dir(path: &Path) -> Result<(), AuthError> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn read_file(path: &Path) -> Result<Option<Token>, AuthError> {
        let raw = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: TokenFile = toml::from_str(&raw)?;
        Ok(Some(file.token))
    }
}

impl TokenStore for FileTokenStore {
    fn find(&self, identity: &TokenIdentity) -> Result<Option<Token>, AuthError> {
        Self::read_file(&self.token_path(identity))
    }

    fn save(&self, token: &Token) -> Result<(), AuthError> {
        Self::ensure_dir(&self.base_dir)?;
        let path = self.token_path(&token.identity());
        let file = TokenFile {
            version: 1,
            token: token.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        fs::write(&path, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<Token>, AuthError> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let mut tokens = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            if let Some(token) = Self::read_file(&path)? {
                tokens.push(token);
            }
        }
        tokens.sort_by(|a, b| {
            a.character_name
                .cmp(&b.character_name)
                .then(a.scopes.cmp(&b.scopes))
        });
        Ok(tokens)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    token: Token,
    saved_at: DateTime<Utc>,
}

fn default_store_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".esi-auth").join("tokens"))
        .unwrap_or_else(|| PathBuf::from(".esi-auth/tokens"))
}

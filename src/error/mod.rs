//! Error types for the ESI client.

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for ESI reads and the auth flows behind them.
#[derive(Error, Debug)]
pub enum EsiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Retry budget exhausted (or the call was cancelled) for `path`.
    #[error("Request to {path} failed after {attempts} attempt(s): {reason}")]
    Request {
        path: String,
        attempts: u32,
        reason: String,
    },

    /// A 2xx body that is not valid JSON. Carries the raw body.
    #[error("Failed to decode response from {path}: {message}\n{body}")]
    ResponseDecode {
        path: String,
        body: String,
        message: String,
    },

    #[error("Unauthorized (401) for {path}")]
    Unauthorized { path: String },

    /// An in-band 401/403 raised by a caller that needs the payload.
    #[error("Rejected ({status}) for {path}: {body}")]
    Rejected {
        path: String,
        status: u16,
        body: String,
    },

    /// Single-attempt transport failure. Folded into `Request` once retries run out.
    #[error("Transport error for {path}: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Single-attempt unexpected status. Folded into `Request` once retries run out.
    #[error("Unexpected status {status} for {path}")]
    Status { path: String, status: u16 },

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Validation,
    Network,
    Server,
    Decode,
    Exhausted,
    Configuration,
}

impl EsiError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) | Self::InvalidRequest(_) => ErrorCategory::Configuration,
            Self::Request { .. } => ErrorCategory::Exhausted,
            Self::ResponseDecode { .. } => ErrorCategory::Decode,
            Self::Unauthorized { .. } | Self::Rejected { .. } => ErrorCategory::Authentication,
            Self::Transport { .. } => ErrorCategory::Network,
            Self::Status { .. } => ErrorCategory::Server,
            Self::Auth(AuthError::TokenValidation(_)) => ErrorCategory::Validation,
            Self::Auth(AuthError::Metadata(_) | AuthError::TokenRequest { .. }) => {
                ErrorCategory::Network
            }
            Self::Auth(_) => ErrorCategory::Authentication,
        }
    }

    /// Whether the fetch engine may retry this error.
    ///
    /// Only single-attempt transport timeouts/connect failures and unexpected
    /// statuses qualify. Issuer-side failures are never retried here.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_body()
            }
            Self::Status { .. } => true,
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EsiError>;

//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Chime
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ChimeError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authorization code exchange failed: {0}")]
    AuthExchange(String),

    /// Access credential rejected by the provider. The caller may attempt a
    /// refresh before giving up on the connection for this pass.
    #[error("Credential rejected: {0}")]
    Credential(String),

    /// Refresh credential itself rejected. The connection is unusable until
    /// the user re-authorizes; callers must not hot-loop retries.
    #[error("Credential expired beyond refresh: {0}")]
    CredentialExpired(String),

    /// Network/provider hiccup. Logged and retried on the next pass.
    #[error("Transient fetch error: {0}")]
    TransientFetch(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChimeError {
    /// True when retrying the same operation on a later pass may succeed
    /// without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch(_))
    }
}

/// Result type alias for Chime operations
pub type Result<T> = std::result::Result<T, ChimeError>;

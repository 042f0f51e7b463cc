use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriveError {
    #[error("failed to load drive client: {0}")]
    ClientLoad(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("session token expired")]
    TokenExpired,
    #[error("drive is not connected")]
    NotConnected,
    #[error("drive api returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
}

impl DriveError {
    /// Whether the adapter cannot be used again without re-authenticating.
    pub fn is_fatal(&self) -> bool {
        match self {
            DriveError::ClientLoad(_)
            | DriveError::Auth(_)
            | DriveError::TokenExpired
            | DriveError::NotConnected => true,
            DriveError::Http { status, .. } => matches!(status, 401 | 403),
            DriveError::Network(_) | DriveError::Parse(_) => false,
        }
    }
}

impl From<DriveError> for StorageError {
    fn from(e: DriveError) -> Self {
        if e.is_fatal() {
            StorageError::Fatal(e.to_string())
        } else {
            StorageError::Transient(e.to_string())
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            DriveError::Parse(e.to_string())
        } else {
            DriveError::Network(e.to_string())
        }
    }
}

/// Why a silent session restore did not succeed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no cached drive token")]
    NoToken,
    #[error("cached drive token has expired")]
    Expired,
    #[error(transparent)]
    Drive(#[from] DriveError),
}

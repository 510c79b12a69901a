// ⚠️ Error Types - Roster store and import failures
//
// Three failure kinds reach callers:
//   NotFound       → update/get on a tag that isn't in the roster
//   InvalidFormat  → upload or record that can't be turned into players
//   StorageFailure → snapshot read/write failed (cause attached)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using RosterError
pub type Result<T> = std::result::Result<T, RosterError>;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Player not found: {tag}")]
    NotFound { tag: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Storage failure at {}: {source}", path.display())]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RosterError {
    pub fn not_found(tag: impl Into<String>) -> Self {
        RosterError::NotFound { tag: tag.into() }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        RosterError::InvalidFormat(message.into())
    }

    pub fn storage(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        RosterError::StorageFailure {
            path: path.into(),
            source: source.into(),
        }
    }
}

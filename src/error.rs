//! Typed error variants for the profile store
//!
//! Decoding problems never show up here: corrupt profile data is recovered
//! best-effort and reported through [`crate::config::codec::Decoded`].
//! What remains is input the caller must correct and storage that failed.

use std::path::PathBuf;
use thiserror::Error;

use crate::profile::ProfileField;

/// Submitted data rejected before anything is persisted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("profile {0} must not be blank")]
    BlankField(ProfileField),

    #[error("a different profile is already named '{0}'")]
    DuplicateName(String),

    #[error("invalid port ranges '{0}': expected lo-hi[,lo-hi...] with 1 <= lo <= hi <= 65535")]
    InvalidPortRanges(String),
}

/// The key-value layer could not complete a write
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing settings file is unreadable; refusing to overwrite it
    #[error("settings file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),

    /// Failure reported by a custom adapter
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Error returned by [`crate::store::ProfileStore`] operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

pub type StoreResult<T> = Result<T, StoreError>;

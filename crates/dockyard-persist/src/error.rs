//! Error types for dockyard-persist

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by a [`HostStore`](crate::HostStore)
#[derive(Error, Debug)]
pub enum StoreError {
    /// No machine directory for this name
    #[error("host does not exist: {name}")]
    NotFound {
        /// Requested machine name
        name: String,
    },

    /// Name cannot be used as a single directory component
    #[error("invalid host name: {0:?}")]
    InvalidName(String),

    /// Filesystem operation failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path the operation was applied to
        path: PathBuf,
        source: io::Error,
    },

    /// Stored document is not a valid record
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// Document path
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Record could not be serialised
    #[error("failed to encode host {name}: {source}")]
    Encode {
        /// Machine name
        name: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the machine simply does not exist yet
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

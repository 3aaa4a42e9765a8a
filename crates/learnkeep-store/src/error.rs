//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the document store.
///
/// Corruption is not an error: it is healed on load and reported through
/// [`crate::LoadOutcome`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialized.
    #[error("JSON error for {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The path is not inside the managed data root.
    #[error("path is outside the data root: {}", .0.display())]
    OutsideDataRoot(PathBuf),

    /// No snapshot directory with this name exists.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        StoreError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

//! Error types for gotosync-sync.

use std::path::PathBuf;

use thiserror::Error;

use gotosync_core::CoreError;

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The requested product is not one of the known categories.
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// An error from configuration or the remote API.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A shared lock stayed busy past its wait budget.
    #[error("timed out waiting for lock '{0}'")]
    LockTimeout(String),

    /// JSON serialization/deserialization error (event store, lock records).
    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

//! Error types for gotosync-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ProductCategory;

/// All errors that can arise from configuration and remote collaborator calls.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.gotosync/`.
    #[error("cannot determine home directory; set $HOME or pass --home")]
    HomeNotFound,

    /// A product name outside the closed category set.
    #[error("invalid product '{0}'; expected one of: webinar, meeting, training, assist")]
    InvalidProduct(String),

    /// The remote API rejected or failed a request.
    #[error("remote API error: {0}")]
    Remote(String),

    /// No usable credentials for the given product.
    #[error("not authorized for GoTo{}", .0.label())]
    Unauthorized(ProductCategory),
}

//! Error types for gotosync-client.

use thiserror::Error;

use gotosync_core::CoreError;

/// Stable code carried by [`ClientError::MissingClientId`].
pub const MISSING_CLIENT_ID_CODE: u32 = 1_554_211_764;
/// Stable code carried by [`ClientError::MissingClientSecret`].
pub const MISSING_CLIENT_SECRET_CODE: u32 = 1_554_211_808;

/// All errors that can arise while building, authorizing or sending requests.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Token request without a usable `client_id` parameter.
    #[error("No client ID given.")]
    MissingClientId,

    /// Token request without a usable `client_secret` parameter.
    #[error("No client secret given.")]
    MissingClientSecret,

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// Connection, TLS or timeout failure below HTTP.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body was not the JSON we expected.
    #[error("response JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value that cannot be placed in a URL path.
    #[error("invalid URL path segment '{0}'")]
    InvalidPathSegment(String),

    /// Well-formed JSON missing a field we need.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Stable numeric code for the credential errors, `None` otherwise.
    pub fn code(&self) -> Option<u32> {
        match self {
            ClientError::MissingClientId => Some(MISSING_CLIENT_ID_CODE),
            ClientError::MissingClientSecret => Some(MISSING_CLIENT_SECRET_CODE),
            _ => None,
        }
    }
}

impl From<ClientError> for CoreError {
    fn from(err: ClientError) -> Self {
        CoreError::Remote(err.to_string())
    }
}

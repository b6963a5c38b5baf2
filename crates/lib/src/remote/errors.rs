//! Error types for remote-backed nodes.

use thiserror::Error;

/// Errors raised while fetching or applying remote data.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The server answered with a non-success status
    #[error("Fetching {url} returned status {status}")]
    TransientFetchFailure { url: String, status: u16 },

    /// The response body cannot be assigned to the node
    #[error("Malformed response from {url}: {reason}")]
    MalformedRemoteResponse { url: String, reason: String },

    /// The request never produced a response
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The `url` metadata does not parse
    #[error("Invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The node has no `url` metadata
    #[error("Node {name} has no remote url")]
    MissingUrl { name: String },
}

impl RemoteError {
    /// Check if polling again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::TransientFetchFailure { .. } | RemoteError::Request { .. }
        )
    }

    /// Check if the server sent data that could not be used
    pub fn is_malformed(&self) -> bool {
        matches!(self, RemoteError::MalformedRemoteResponse { .. })
    }
}

// Conversion from RemoteError to the main Error type
impl From<RemoteError> for crate::Error {
    fn from(err: RemoteError) -> Self {
        crate::Error::Remote(err)
    }
}

//! Error types for document conversions.

use thiserror::Error;

/// Errors raised when external data cannot be turned into a [`Document`](super::Document).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The input was valid data but not document-shaped
    #[error("Expected a document (object or array), found {actual}")]
    NotADocument { actual: String },
}

impl DocumentError {
    /// Check if this error reports a non-document input
    pub fn is_not_a_document(&self) -> bool {
        matches!(self, DocumentError::NotADocument { .. })
    }
}

// Conversion from DocumentError to the main Error type
impl From<DocumentError> for crate::Error {
    fn from(err: DocumentError) -> Self {
        crate::Error::Document(err)
    }
}

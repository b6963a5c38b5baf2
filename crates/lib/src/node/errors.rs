//! Error types for node assignment and merge.

use thiserror::Error;

/// Structured error types for node operations.
///
/// `set_value` swallows these and reports them through `tracing`; the
/// `try_` variants return them to the caller.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// The validator returned a falsy result
    #[error("Validation rejected value for {name}")]
    ValidationRejected { name: String },

    /// A leaf was given a document, or a composite was given a non-document
    #[error("Kind mismatch at {name}: expected {expected}, got {actual}")]
    KindMismatch {
        name: String,
        expected: &'static str,
        actual: String,
    },

    /// Undefined can be a creation value but never an assignment
    #[error("Cannot assign undefined to {name}")]
    UndefinedAssignment { name: String },

    /// A merge met a leaf where the document has a nested document, or the reverse
    #[error("Merge rejected at {path}: expected {expected}, got {actual}")]
    MergeRejected {
        path: String,
        expected: &'static str,
        actual: String,
    },
}

impl NodeError {
    /// Check if this error is a leaf/composite mismatch, directly or within a merge
    pub fn is_kind_mismatch(&self) -> bool {
        matches!(
            self,
            NodeError::KindMismatch { .. } | NodeError::MergeRejected { .. }
        )
    }

    /// Check if this error is a validator rejection
    pub fn is_validation_error(&self) -> bool {
        matches!(self, NodeError::ValidationRejected { .. })
    }

    /// Check if this error is a rejected merge
    pub fn is_merge_error(&self) -> bool {
        matches!(self, NodeError::MergeRejected { .. })
    }

    /// Check if this error is an undefined assignment
    pub fn is_undefined_assignment(&self) -> bool {
        matches!(self, NodeError::UndefinedAssignment { .. })
    }

    /// The qualified name or path the error refers to
    pub fn path(&self) -> &str {
        match self {
            NodeError::ValidationRejected { name }
            | NodeError::KindMismatch { name, .. }
            | NodeError::UndefinedAssignment { name } => name,
            NodeError::MergeRejected { path, .. } => path,
        }
    }
}

// Conversion from NodeError to the main Error type
impl From<NodeError> for crate::Error {
    fn from(err: NodeError) -> Self {
        crate::Error::Node(err)
    }
}

//!
//! Canopy: an observable, hierarchical, in-memory data model.
//! This library provides a tree of named nodes whose values can be read, written,
//! validated and watched for change.
//!
//! ## Core Concepts
//!
//! Canopy is built around several key concepts:
//!
//! * **Values (`value::Value`)**: The tagged boundary type. Scalars, null, opaque callables and
//!   nested documents are told apart once, when data crosses into the tree.
//! * **Documents (`document::Document`)**: Insertion-ordered maps from name to value, the shape
//!   used to build, serialize and merge trees.
//! * **Nodes (`node::Node`)**: Either a [`Leaf`] holding a single value or a [`Composite`] owning
//!   named children. Both implement the [`Property`] capability trait.
//! * **Notifications (`notify`)**: Change events fire synchronously and bubble from the changed
//!   node up through every ancestor, invoking subtree listeners along the way.
//! * **Transactions (`notify::start_transaction`)**: Events can be queued and flushed in one go,
//!   with optional queue and callback optimizations.
//! * **Merge (`merge`)**: Reconciles an external document against a live tree with
//!   all-or-nothing semantics.
//! * **Remote sync (`remote`)**: Nodes carrying `url` and `refreshRate` metadata are handed to a
//!   poller which feeds fetched data back through `set_value`.
//!
//! ## Threading
//!
//! Trees are `Rc`-based and stay on the thread that built them. The notification bus and its
//! optimization flags are per-thread and shared by every tree on that thread.

pub mod document;
pub mod merge;
pub mod metadata;
pub mod node;
pub mod notify;
pub mod remote;
pub mod value;

pub use document::{Document, METADATA_SUFFIX};
pub use metadata::Metadata;
pub use node::{Composite, Leaf, Node, Notify, Property};
pub use notify::{EventOptimization, ListenScope, Listener};
pub use value::{Callable, Value};

/// Result type used throughout the Canopy library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Canopy library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured node errors from the node module
    #[error(transparent)]
    Node(node::NodeError),

    /// Structured notification errors from the notify module
    #[error(transparent)]
    Notify(notify::NotifyError),

    /// Structured document errors from the document module
    #[error(transparent)]
    Document(document::DocumentError),

    /// Structured remote sync errors from the remote module
    #[error(transparent)]
    Remote(remote::RemoteError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Node(_) => "node",
            Error::Notify(_) => "notify",
            Error::Document(_) => "document",
            Error::Remote(_) => "remote",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error is a leaf/composite kind mismatch, directly or within a merge.
    pub fn is_kind_mismatch(&self) -> bool {
        match self {
            Error::Node(node_err) => node_err.is_kind_mismatch(),
            _ => false,
        }
    }

    /// Check if this error is a validator rejection.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Node(node_err) => node_err.is_validation_error(),
            _ => false,
        }
    }

    /// Check if this error is a rejected merge.
    pub fn is_merge_error(&self) -> bool {
        match self {
            Error::Node(node_err) => node_err.is_merge_error(),
            _ => false,
        }
    }

    /// Check if this error concerns the shape of a document.
    pub fn is_document_error(&self) -> bool {
        matches!(self, Error::Document(_) | Error::Serialize(_))
    }

    /// Check if this error comes from the remote sync collaborator.
    pub fn is_remote_error(&self) -> bool {
        matches!(self, Error::Remote(_))
    }

    /// Check if the failed operation may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Remote(remote_err) => remote_err.is_retryable(),
            _ => false,
        }
    }
}

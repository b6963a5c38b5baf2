//! Reconciling a document against a live subtree.
//!
//! A merge runs in two phases:
//!
//! 1. **Check**: walk the document alongside the tree without touching
//!    anything. Wherever a key names an existing child, the shapes must agree:
//!    a nested document needs a composite, anything else needs a leaf. The
//!    first disagreement aborts the merge with [`NodeError::MergeRejected`].
//! 2. **Apply**: inside a transaction, assign every scalar to its existing
//!    leaf (validators still apply per leaf), recurse into nested documents,
//!    create children for new keys and, unless `keep_old` is set, remove
//!    children whose name does not appear in the document.
//!
//! Because the check phase saw every conflict, the apply phase cannot fail
//! halfway: the tree is either untouched or fully reconciled. Leaf change
//! events are queued and flushed together when the apply phase ends.
//!
//! Transactions do not nest. A merge run inside an open transaction ends it,
//! flushing everything the caller queued so far along with the merge's own
//! events.
//!
//! A key counts as absent only when it is missing from the document. Falsy
//! values such as `0`, `false` or `""` are ordinary values.

use tracing::{debug, trace};

use crate::{
    document::Document,
    metadata::Metadata,
    node::{Composite, Node, NodeError, Property},
    notify,
    value::Value,
};

/// Merge `doc` into `target`.
pub fn merge(target: &Composite, doc: &Document, keep_old: bool) -> Result<(), NodeError> {
    check(target, doc)?;

    debug!(name = %target.qualified_name(), keep_old, "applying merge");
    notify::start_transaction();
    apply(target, doc, keep_old);
    notify::end_transaction(None);
    Ok(())
}

/// Returns the first shape conflict between `doc` and the subtree, if any.
pub fn check(target: &Composite, doc: &Document) -> Result<(), NodeError> {
    for (name, value) in doc.entries() {
        let Some(existing) = target.child(name) else {
            continue;
        };
        match (&existing, value) {
            (Node::Composite(composite), Value::Doc(nested)) => check(composite, nested)?,
            (Node::Leaf(_), Value::Doc(_)) => {
                return Err(NodeError::MergeRejected {
                    path: existing.qualified_name().to_string(),
                    expected: "non-document value",
                    actual: value.type_name().to_string(),
                });
            }
            (Node::Composite(_), _) => {
                return Err(NodeError::MergeRejected {
                    path: existing.qualified_name().to_string(),
                    expected: "document",
                    actual: value.type_name().to_string(),
                });
            }
            (Node::Leaf(_), _) => {}
        }
    }
    Ok(())
}

fn apply(target: &Composite, doc: &Document, keep_old: bool) {
    for (name, value) in doc.entries() {
        match (target.child(name), value) {
            (Some(Node::Composite(composite)), Value::Doc(nested)) => {
                apply(&composite, nested, keep_old)
            }
            (Some(Node::Leaf(leaf)), _) => {
                leaf.set_value(value.clone());
            }
            (Some(Node::Composite(_)), _) => {
                // Ruled out by check
            }
            (None, _) => {
                let metadata = doc
                    .metadata_for(name)
                    .map(Metadata::from_document)
                    .unwrap_or_default();
                trace!(parent = %target.qualified_name(), child = %name, "merge creates child");
                target.create_child_with(name.clone(), value.clone(), metadata);
            }
        }
    }

    if !keep_old {
        for name in target.child_names() {
            if !doc.contains_key(&name) {
                trace!(parent = %target.qualified_name(), child = %name, "merge removes child");
                target.remove_child(&name);
            }
        }
    }
}

//! Composite nodes.
//!
//! A composite owns its children in insertion order. It has no stored value:
//! reading it serializes the subtree and assigning a document to it merges
//! that document into the subtree.

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;
use tracing::{debug, error};

use super::{Leaf, Node, NodeCore, NodeError, Notify, Property, ROOT_NAME};
use crate::{
    document::{Document, metadata_key},
    merge,
    metadata::Metadata,
    notify::{self, ListenScope, Listener},
    remote,
    value::Value,
};

pub(crate) struct CompositeInner {
    pub(super) core: NodeCore,
    children: RefCell<IndexMap<String, Node>>,
}

/// A node owning named children.
#[derive(Clone)]
pub struct Composite(Rc<CompositeInner>);

impl Composite {
    /// Build a root composite from a document.
    ///
    /// The root's local name comes from the `name` metadata entry, defaulting
    /// to `"root"`. Metadata siblings in `doc` become the metadata of the
    /// children they are named after.
    pub fn new(doc: Document, metadata: Metadata) -> Self {
        let name = metadata.name().unwrap_or(ROOT_NAME).to_string();
        let root = Self::with_parent(name, None, metadata);
        root.populate(&doc);
        root
    }

    /// An empty root named `"root"`
    pub fn empty() -> Self {
        Self::new(Document::new(), Metadata::new())
    }

    fn with_parent(
        name: String,
        parent: Option<&Rc<CompositeInner>>,
        metadata: Metadata,
    ) -> Self {
        Self(Rc::new(CompositeInner {
            core: NodeCore::new(name, parent, metadata),
            children: RefCell::new(IndexMap::new()),
        }))
    }

    fn populate(&self, doc: &Document) {
        for (name, value) in doc.entries() {
            let metadata = doc
                .metadata_for(name)
                .map(Metadata::from_document)
                .unwrap_or_default();
            self.create_child_with(name.clone(), value.clone(), metadata);
        }
    }

    pub(crate) fn from_inner(inner: Rc<CompositeInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<CompositeInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn core(&self) -> &NodeCore {
        &self.0.core
    }

    /// Subtree listeners, as seen by an event bubbling up from a descendant
    pub(crate) fn subtree_listener_snapshot(&self) -> Vec<Listener> {
        self.0.core.listeners_for_descendants()
    }

    /// Returns true if both handles point to the same composite
    pub fn ptr_eq(&self, other: &Composite) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Add a child without metadata. See [`create_child_with`](Self::create_child_with).
    pub fn create_child(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.create_child_with(name, value, Metadata::new())
    }

    /// Add a child.
    ///
    /// A document value builds a nested composite, anything else a leaf. A
    /// child with the same name is replaced in place. No change event fires.
    /// Children carrying remote metadata are handed to the registered
    /// [`RemoteTracker`](crate::remote::RemoteTracker).
    pub fn create_child_with(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
        metadata: Metadata,
    ) -> &Self {
        let name = name.into();
        let value: Value = value.into();
        let child = match value {
            Value::Doc(doc) => {
                let composite = Self::with_parent(name.clone(), Some(&self.0), metadata);
                composite.populate(&doc);
                Node::Composite(composite)
            }
            scalar => Node::Leaf(Leaf::new(name.clone(), scalar, Some(&self.0), metadata)),
        };

        self.0.children.borrow_mut().insert(name, child.clone());

        let is_remote = child.metadata().is_remote();
        if is_remote && !remote::track(&child) {
            debug!(name = %child.qualified_name(), "no remote tracker registered");
        }
        self
    }

    /// The child with the given name
    pub fn child(&self, name: &str) -> Option<Node> {
        self.0.children.borrow().get(name).cloned()
    }

    /// The child with the given name, if it is a leaf
    pub fn leaf(&self, name: &str) -> Option<Leaf> {
        match self.child(name)? {
            Node::Leaf(leaf) => Some(leaf),
            Node::Composite(_) => None,
        }
    }

    /// The child with the given name, if it is a composite
    pub fn composite(&self, name: &str) -> Option<Composite> {
        match self.child(name)? {
            Node::Composite(composite) => Some(composite),
            Node::Leaf(_) => None,
        }
    }

    /// Look up a descendant by a slash-separated relative path.
    ///
    /// An empty path returns this composite.
    pub fn find(&self, path: &str) -> Option<Node> {
        let mut current = Node::Composite(self.clone());
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.as_composite()?.child(segment)?;
        }
        Some(current)
    }

    /// Snapshot of the children in order
    pub fn children(&self) -> Vec<(String, Node)> {
        self.0
            .children
            .borrow()
            .iter()
            .map(|(name, node)| (name.clone(), node.clone()))
            .collect()
    }

    /// Child names in order
    pub fn child_names(&self) -> Vec<String> {
        self.0.children.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.children.borrow().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.children.borrow().contains_key(name)
    }

    /// Detach and return a child. No change event fires.
    pub fn remove_child(&self, name: &str) -> Option<Node> {
        self.0.children.borrow_mut().shift_remove(name)
    }

    /// Serialize the subtree.
    ///
    /// With `include_metadata`, every child with metadata gets a sibling
    /// entry under [`metadata_key`], validators included as callables.
    pub fn to_document(&self, include_metadata: bool) -> Document {
        let mut doc = Document::new();
        for (name, child) in self.children() {
            let value = match &child {
                Node::Leaf(leaf) => leaf.value(),
                Node::Composite(composite) => composite.to_document(include_metadata).into(),
            };
            doc.insert(name.clone(), value);

            if include_metadata {
                let metadata = child.metadata();
                if !metadata.is_empty() {
                    doc.insert(metadata_key(&name), metadata.to_document());
                }
            }
        }
        doc
    }

    /// Deep copy into a new, independent root.
    ///
    /// Child metadata and values are copied. The new root keeps this node's
    /// local name and validator. Listeners are not copied.
    pub fn clone_tree(&self) -> Composite {
        let mut metadata = Metadata::new().with_name(self.local_name());
        if let Some(validator) = self.metadata().validator() {
            metadata = metadata.with_validator(validator);
        }
        Composite::new(self.to_document(true), metadata)
    }

    /// Merge `doc` into this subtree, logging and returning false on rejection.
    ///
    /// See [`merge`](crate::merge) for the algorithm.
    pub fn merge(&self, doc: &Document, keep_old: bool) -> bool {
        match self.try_merge(doc, keep_old) {
            Ok(()) => true,
            Err(err) => {
                error!(name = %self.qualified_name(), error = %err, "merge rejected");
                false
            }
        }
    }

    /// Merge `doc` into this subtree.
    pub fn try_merge(&self, doc: &Document, keep_old: bool) -> Result<(), NodeError> {
        merge::merge(self, doc, keep_old)
    }
}

impl Property for Composite {
    fn local_name(&self) -> &str {
        self.0.core.name()
    }

    fn qualified_name(&self) -> &str {
        self.0.core.qualified_name()
    }

    fn value(&self) -> Value {
        Value::Doc(self.to_document(false))
    }

    fn try_set_value(&self, value: Value, notify: Notify) -> Result<bool, NodeError> {
        let doc = match value {
            Value::Doc(doc) => doc,
            Value::Undefined => {
                return Err(NodeError::UndefinedAssignment {
                    name: self.qualified_name().to_string(),
                });
            }
            other => {
                return Err(NodeError::KindMismatch {
                    name: self.qualified_name().to_string(),
                    expected: "document",
                    actual: other.type_name().to_string(),
                });
            }
        };

        let old = self.to_document(false);
        if old == doc {
            return Ok(false);
        }

        if !self.validate(&Value::Doc(doc.clone())) {
            return Err(NodeError::ValidationRejected {
                name: self.qualified_name().to_string(),
            });
        }

        merge::merge(self, &doc, false)?;
        if notify == Notify::Fire {
            notify::fire_event(&Node::Composite(self.clone()), Value::Doc(old));
        }
        Ok(true)
    }

    fn on_change(&self, listener: &Listener, scope: ListenScope) -> &Self {
        self.0.core.listen(listener, scope);
        self
    }

    fn metadata(&self) -> Ref<'_, Metadata> {
        self.0.core.metadata()
    }

    fn metadata_mut(&self) -> RefMut<'_, Metadata> {
        self.0.core.metadata_mut()
    }

    fn parent(&self) -> Option<Composite> {
        self.0.core.parent()
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("name", &self.qualified_name())
            .field("children", &self.child_names())
            .finish()
    }
}

//! Model nodes.
//!
//! A tree is made of two node kinds behind one handle enum:
//!
//! - [`Leaf`] holds a single non-document [`Value`].
//! - [`Composite`] owns an ordered set of named children and has no stored
//!   value; its value is the document it serializes to.
//!
//! Both implement [`Property`], the capability trait for reading, writing,
//! validating and watching a node. Handles are cheap `Rc` clones; parents own
//! their children and children hold a weak back-reference.
//!
//! ```
//! # use canopy::{Composite, Document, Metadata, Property};
//! let root = Composite::new(
//!     Document::new().with("volume", 3).with("audio", Document::new().with("muted", false)),
//!     Metadata::new(),
//! );
//!
//! let muted = root.find("audio/muted").unwrap();
//! assert_eq!(muted.qualified_name(), "/root/audio/muted");
//!
//! muted.set_value(true);
//! assert_eq!(root.to_document(false).to_json(), serde_json::json!({
//!     "volume": 3,
//!     "audio": { "muted": true }
//! }));
//! ```

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};

use tracing::{error, trace, warn};

use crate::{
    metadata::Metadata,
    notify::{ListenScope, Listener, listener::Listeners},
    value::Value,
};

pub mod composite;
pub mod errors;
pub mod leaf;

pub use composite::Composite;
pub use errors::NodeError;
pub use leaf::Leaf;

use composite::CompositeInner;
use leaf::LeafInner;

/// Local name given to a root composite without a `name` metadata entry.
pub const ROOT_NAME: &str = "root";

/// Whether a successful assignment fires a change event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Notify {
    #[default]
    Fire,
    Suppress,
}

/// Capabilities shared by every node.
///
/// Writes are fail-soft by default: [`set_value`](Property::set_value) never
/// fails, it logs the rejection and returns whatever value the node ends up
/// holding. Use [`try_set_value`](Property::try_set_value) to get the reason.
pub trait Property {
    /// Local name within the parent
    fn local_name(&self) -> &str;

    /// Slash-separated path from the root, fixed at construction
    fn qualified_name(&self) -> &str;

    /// The current value. Composites return their serialized document.
    fn value(&self) -> Value;

    /// Checked assignment.
    ///
    /// Returns `Ok(true)` if the value changed, `Ok(false)` if the new value
    /// equals the current one.
    fn try_set_value(&self, value: Value, notify: Notify) -> Result<bool, NodeError>;

    /// Register a change listener
    fn on_change(&self, listener: &Listener, scope: ListenScope) -> &Self;

    /// Live read access to the metadata
    fn metadata(&self) -> Ref<'_, Metadata>;

    /// Live write access to the metadata
    fn metadata_mut(&self) -> RefMut<'_, Metadata>;

    /// The owning composite, `None` for a root or a detached node
    fn parent(&self) -> Option<Composite>;

    /// Assign a value and fire a change event, returning the resulting value.
    fn set_value(&self, value: impl Into<Value>) -> Value
    where
        Self: Sized,
    {
        self.set_value_with(value, Notify::Fire)
    }

    /// Assign a value, returning the resulting value.
    fn set_value_with(&self, value: impl Into<Value>, notify: Notify) -> Value
    where
        Self: Sized,
    {
        if let Err(err) = self.try_set_value(value.into(), notify) {
            match &err {
                NodeError::ValidationRejected { .. } => {
                    trace!(name = %self.qualified_name(), "validator rejected value")
                }
                NodeError::MergeRejected { .. } => {
                    error!(name = %self.qualified_name(), error = %err, "assignment rejected")
                }
                _ => warn!(name = %self.qualified_name(), error = %err, "assignment rejected"),
            }
        }
        self.value()
    }

    /// Returns true if a validator is set
    fn has_validator(&self) -> bool {
        self.metadata().validator().is_some()
    }

    /// Run the validator against `value`. Passes when no validator is set.
    fn validate(&self, value: &Value) -> bool {
        // Release the metadata borrow before the validator runs.
        let validator = self.metadata().validator();
        validator.is_none_or(|v| v.call(std::slice::from_ref(value)).is_truthy())
    }
}

/// State every node kind carries.
pub(crate) struct NodeCore {
    name: String,
    qualified_name: String,
    parent: Option<Weak<CompositeInner>>,
    metadata: RefCell<Metadata>,
    listeners: RefCell<Listeners>,
}

impl NodeCore {
    pub(crate) fn new(
        name: String,
        parent: Option<&Rc<CompositeInner>>,
        metadata: Metadata,
    ) -> Self {
        let qualified_name = match parent {
            Some(parent) => format!("{}/{}", parent.core.qualified_name, name),
            None => format!("/{name}"),
        };
        Self {
            name,
            qualified_name,
            parent: parent.map(Rc::downgrade),
            metadata: RefCell::new(metadata),
            listeners: RefCell::new(Listeners::default()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub(crate) fn parent(&self) -> Option<Composite> {
        self.parent.as_ref()?.upgrade().map(Composite::from_inner)
    }

    pub(crate) fn metadata(&self) -> Ref<'_, Metadata> {
        self.metadata.borrow()
    }

    pub(crate) fn metadata_mut(&self) -> RefMut<'_, Metadata> {
        self.metadata.borrow_mut()
    }

    pub(crate) fn listen(&self, listener: &Listener, scope: ListenScope) {
        self.listeners.borrow_mut().push(listener.clone(), scope);
    }

    pub(crate) fn listeners_for_self(&self) -> Vec<Listener> {
        self.listeners.borrow().for_self()
    }

    pub(crate) fn listeners_for_descendants(&self) -> Vec<Listener> {
        self.listeners.borrow().for_descendants()
    }
}

/// Which kind of node a handle points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Composite,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Leaf => "leaf",
            NodeKind::Composite => "composite",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handle to either kind of node.
#[derive(Clone)]
pub enum Node {
    Leaf(Leaf),
    Composite(Composite),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Composite(_) => NodeKind::Composite,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Node::Composite(_))
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Node::Composite(composite) => Some(composite),
            Node::Leaf(_) => None,
        }
    }

    /// Returns true if both handles point to the same node
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => a.ptr_eq(b),
            (Node::Composite(a), Node::Composite(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// A non-owning handle that does not keep the node alive
    pub fn downgrade(&self) -> WeakNode {
        match self {
            Node::Leaf(leaf) => WeakNode(WeakInner::Leaf(leaf.downgrade())),
            Node::Composite(composite) => WeakNode(WeakInner::Composite(composite.downgrade())),
        }
    }

    fn core(&self) -> &NodeCore {
        match self {
            Node::Leaf(leaf) => leaf.core(),
            Node::Composite(composite) => composite.core(),
        }
    }

    /// Listeners interested in a change to this node itself
    pub(crate) fn listener_snapshot(&self) -> Vec<Listener> {
        self.core().listeners_for_self()
    }
}

impl Property for Node {
    fn local_name(&self) -> &str {
        self.core().name()
    }

    fn qualified_name(&self) -> &str {
        self.core().qualified_name()
    }

    fn value(&self) -> Value {
        match self {
            Node::Leaf(leaf) => leaf.value(),
            Node::Composite(composite) => composite.value(),
        }
    }

    fn try_set_value(&self, value: Value, notify: Notify) -> Result<bool, NodeError> {
        match self {
            Node::Leaf(leaf) => leaf.try_set_value(value, notify),
            Node::Composite(composite) => composite.try_set_value(value, notify),
        }
    }

    fn on_change(&self, listener: &Listener, scope: ListenScope) -> &Self {
        self.core().listen(listener, scope);
        self
    }

    fn metadata(&self) -> Ref<'_, Metadata> {
        self.core().metadata()
    }

    fn metadata_mut(&self) -> RefMut<'_, Metadata> {
        self.core().metadata_mut()
    }

    fn parent(&self) -> Option<Composite> {
        self.core().parent()
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Node::Leaf(leaf)
    }
}

impl From<Composite> for Node {
    fn from(composite: Composite) -> Self {
        Node::Composite(composite)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf(leaf) => fmt::Debug::fmt(leaf, f),
            Node::Composite(composite) => fmt::Debug::fmt(composite, f),
        }
    }
}

/// A weak node handle, as held by background pollers.
#[derive(Clone)]
pub struct WeakNode(WeakInner);

#[derive(Clone)]
enum WeakInner {
    Leaf(Weak<LeafInner>),
    Composite(Weak<CompositeInner>),
}

impl WeakNode {
    /// The node, if it is still alive
    pub fn upgrade(&self) -> Option<Node> {
        match &self.0 {
            WeakInner::Leaf(weak) => weak.upgrade().map(|inner| Node::Leaf(Leaf::from_inner(inner))),
            WeakInner::Composite(weak) => weak
                .upgrade()
                .map(|inner| Node::Composite(Composite::from_inner(inner))),
        }
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => write!(f, "WeakNode({})", node.qualified_name()),
            None => f.write_str("WeakNode(<dropped>)"),
        }
    }
}

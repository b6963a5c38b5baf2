//! Leaf nodes.

use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::{Rc, Weak},
};

use super::{Composite, Node, NodeCore, NodeError, Notify, Property, composite::CompositeInner};
use crate::{
    metadata::Metadata,
    notify::{self, ListenScope, Listener},
    value::Value,
};

pub(crate) struct LeafInner {
    core: NodeCore,
    value: RefCell<Value>,
}

/// A node holding a single non-document value.
///
/// Leaves are created through [`Composite::create_child`] and live as long as
/// their parent keeps them, or as long as a handle is held.
#[derive(Clone)]
pub struct Leaf(Rc<LeafInner>);

impl Leaf {
    pub(crate) fn new(
        name: String,
        value: Value,
        parent: Option<&Rc<CompositeInner>>,
        metadata: Metadata,
    ) -> Self {
        Self(Rc::new(LeafInner {
            core: NodeCore::new(name, parent, metadata),
            value: RefCell::new(value),
        }))
    }

    pub(crate) fn from_inner(inner: Rc<LeafInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<LeafInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn core(&self) -> &NodeCore {
        &self.0.core
    }

    /// Returns true if both handles point to the same leaf
    pub fn ptr_eq(&self, other: &Leaf) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Property for Leaf {
    fn local_name(&self) -> &str {
        self.0.core.name()
    }

    fn qualified_name(&self) -> &str {
        self.0.core.qualified_name()
    }

    fn value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    fn try_set_value(&self, value: Value, notify: Notify) -> Result<bool, NodeError> {
        match &value {
            Value::Undefined => {
                return Err(NodeError::UndefinedAssignment {
                    name: self.qualified_name().to_string(),
                });
            }
            Value::Doc(_) => {
                return Err(NodeError::KindMismatch {
                    name: self.qualified_name().to_string(),
                    expected: "non-document value",
                    actual: value.type_name().to_string(),
                });
            }
            _ => {}
        }

        if *self.0.value.borrow() == value {
            return Ok(false);
        }
        if !self.validate(&value) {
            return Err(NodeError::ValidationRejected {
                name: self.qualified_name().to_string(),
            });
        }

        let old = self.0.value.replace(value);
        if notify == Notify::Fire {
            notify::fire_event(&Node::Leaf(self.clone()), old);
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

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("name", &self.qualified_name())
            .field("value", &*self.0.value.borrow())
            .finish()
    }
}

//! Change listeners.

use std::{fmt, rc::Rc};

use crate::value::Value;

type Callback = dyn Fn(&Value, &Value, &str);

/// A change callback with a stable identity.
///
/// The callback receives `(old_value, new_value, qualified_name)`. Cloning a
/// `Listener` keeps its identity, which is what the single-callback
/// optimization keys on. An optional hash tag lets distinct listeners be
/// deduplicated together by the hash optimization.
///
/// ```
/// # use canopy::{Listener, Value};
/// let listener = Listener::new(|old, new, name| {
///     println!("{name}: {old} -> {new}");
/// })
/// .with_hash("render");
///
/// assert_eq!(listener.hash(), Some("render"));
/// assert!(listener.ptr_eq(&listener.clone()));
/// ```
#[derive(Clone)]
pub struct Listener {
    callback: Rc<Callback>,
    hash: Option<Rc<str>>,
}

impl Listener {
    /// Wrap a callback
    pub fn new(f: impl Fn(&Value, &Value, &str) + 'static) -> Self {
        Self {
            callback: Rc::new(f),
            hash: None,
        }
    }

    /// Tag this listener with a hash for the hash optimization
    pub fn with_hash(mut self, hash: impl Into<Rc<str>>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// The hash tag, if any
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    /// Returns true if both handles share the same callback
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }

    /// Identity key, shared by all clones
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.callback) as *const () as usize
    }

    pub(crate) fn call(&self, old: &Value, new: &Value, name: &str) {
        (self.callback)(old, new, name)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("callback", &(Rc::as_ptr(&self.callback) as *const ()))
            .field("hash", &self.hash)
            .finish()
    }
}

/// Which changes a listener is registered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListenScope {
    /// Changes to the node itself
    #[default]
    Direct,
    /// Changes to the node and to anything below it
    Subtree,
}

/// Registered listeners of one node, in registration order.
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    direct: Vec<Listener>,
    subtree: Vec<Listener>,
}

impl Listeners {
    pub(crate) fn push(&mut self, listener: Listener, scope: ListenScope) {
        match scope {
            ListenScope::Direct => self.direct.push(listener),
            ListenScope::Subtree => self.subtree.push(listener),
        }
    }

    /// Direct listeners followed by subtree listeners
    pub(crate) fn for_self(&self) -> Vec<Listener> {
        self.direct.iter().chain(&self.subtree).cloned().collect()
    }

    /// Subtree listeners only, as seen by a bubbling event
    pub(crate) fn for_descendants(&self) -> Vec<Listener> {
        self.subtree.clone()
    }
}

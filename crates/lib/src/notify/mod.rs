//! Change notification bus.
//!
//! Every node change passes through [`fire_event`]. Depending on the
//! transaction state the event is either dispatched right away or queued until
//! [`end_transaction`] flushes it.
//!
//! # Dispatch
//!
//! For a change to `node`:
//!
//! 1. The node's direct listeners, then its subtree listeners, are called with
//!    `(old, node.value(), node.qualified_name())`.
//! 2. Each ancestor up to the root then calls its subtree listeners (never
//!    its direct ones) with `(old, ancestor.value(), ancestor.qualified_name())`.
//!    The old value is always the one of the originally changed node.
//!
//! # Episodes
//!
//! Deduplication state lives for one episode: a transaction flush, or one
//! immediate dispatch. A change made from inside a callback starts its own
//! episode with empty caches; the outer episode's caches are restored when it
//! returns.
//!
//! # Scope
//!
//! The bus is a per-thread context. All trees built on a thread share its
//! transaction state, queue and optimization flags, so starting a transaction
//! while working on one tree also batches events for every other tree. Use
//! [`reset`] to return the current thread to its initial state.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    mem,
};

use tracing::{debug, trace};

use crate::{
    node::{Node, Property},
    value::Value,
};

pub mod errors;
pub mod listener;
pub mod transaction;

pub use errors::NotifyError;
pub use listener::{ListenScope, Listener};
pub use transaction::{
    EventOptimization, batch, batch_or_join, end_transaction, event_optimization,
    in_transaction, set_event_optimization, start_transaction, try_start_transaction,
    update_event_optimization,
};

thread_local! {
    static BUS: RefCell<Bus> = RefCell::new(Bus::default());
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    Active,
    Batching,
}

struct PendingEvent {
    node: Node,
    old: Value,
}

/// Dedup state of one dispatch episode.
#[derive(Default)]
struct EpisodeCaches {
    /// Listeners already invoked, keyed by identity. The clone keeps the
    /// callback allocation, and so its key, alive for the episode.
    executed: HashMap<usize, Listener>,
    /// Hash tags already invoked
    hashes: HashSet<String>,
}

#[derive(Default)]
struct Bus {
    state: State,
    queue: Vec<PendingEvent>,
    options: EventOptimization,
    caches: EpisodeCaches,
}

impl Bus {
    /// Decide whether `listener` runs under the current optimization flags,
    /// recording it when it does.
    fn admit(&mut self, listener: &Listener) -> bool {
        let single = self.options.enable_single_callback_call;
        let by_hash = self.options.enable_callback_hash_optimization;
        let caches = &mut self.caches;

        if single && caches.executed.contains_key(&listener.id()) {
            return false;
        }
        if by_hash
            && let Some(hash) = listener.hash()
            && caches.hashes.contains(hash)
        {
            return false;
        }

        if single {
            caches.executed.insert(listener.id(), listener.clone());
        }
        if by_hash && let Some(hash) = listener.hash() {
            caches.hashes.insert(hash.to_string());
        }
        true
    }
}

fn with_bus<R>(f: impl FnOnce(&mut Bus) -> R) -> R {
    BUS.with_borrow_mut(f)
}

/// Report a change of `node` from `old` to its current value.
///
/// Dispatches immediately when no transaction is open, otherwise queues the
/// event in call order.
pub fn fire_event(node: &Node, old: Value) {
    let event = with_bus(|bus| match bus.state {
        State::Batching => {
            bus.queue.push(PendingEvent {
                node: node.clone(),
                old,
            });
            None
        }
        State::Active => Some(old),
    });

    if let Some(old) = event {
        run_episode(|| dispatch(node, &old));
    }
}

/// Return the current thread's bus to its initial state.
///
/// Drops any queued events, leaves batching mode and restores default
/// optimization flags.
pub fn reset() {
    let previous = with_bus(|bus| mem::take(bus));
    drop(previous);
}

/// Puts the enclosing episode's caches back, even if a callback panics.
struct EpisodeGuard(Option<EpisodeCaches>);

impl Drop for EpisodeGuard {
    fn drop(&mut self) {
        if let Some(outer) = self.0.take() {
            // Swap out so the finished caches drop after the bus borrow ends.
            let finished = with_bus(|bus| mem::replace(&mut bus.caches, outer));
            drop(finished);
        }
    }
}

/// Run `f` as one dispatch episode with empty dedup caches.
fn run_episode(f: impl FnOnce()) {
    let outer = with_bus(|bus| mem::take(&mut bus.caches));
    let _guard = EpisodeGuard(Some(outer));
    f();
}

fn dispatch(node: &Node, old: &Value) {
    trace!(name = %node.qualified_name(), "dispatching change");

    for listener in node.listener_snapshot() {
        invoke(&listener, old, node);
    }

    let mut ancestor = node.parent();
    while let Some(parent) = ancestor {
        let parent_node = Node::Composite(parent.clone());
        for listener in parent.subtree_listener_snapshot() {
            invoke(&listener, old, &parent_node);
        }
        ancestor = parent.parent();
    }
}

fn invoke(listener: &Listener, old: &Value, node: &Node) {
    if with_bus(|bus| bus.admit(listener)) {
        let current = node.value();
        listener.call(old, &current, node.qualified_name());
    }
}

/// Flush a drained transaction queue as one episode.
fn flush(queue: Vec<PendingEvent>) {
    let options = event_optimization();
    let queue = if options.suppress_previous_property_change_events {
        collapse(queue)
    } else {
        queue
    };

    debug!(events = queue.len(), "flushing transaction queue");
    run_episode(|| {
        for event in &queue {
            dispatch(&event.node, &event.old);
        }
    });
}

/// Keep only the newest queued event per node, in original relative order.
fn collapse(queue: Vec<PendingEvent>) -> Vec<PendingEvent> {
    let mut seen: Vec<Node> = Vec::new();
    let mut kept = Vec::new();
    for event in queue.into_iter().rev() {
        if !seen.iter().any(|node| node.ptr_eq(&event.node)) {
            seen.push(event.node.clone());
            kept.push(event);
        }
    }
    kept.reverse();
    kept
}

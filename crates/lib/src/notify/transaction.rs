//! Transactions and event optimization flags.
//!
//! While a transaction is open every change event is queued. Ending it flushes
//! the queue in one dispatch episode, optionally collapsing repeated events for
//! the same node and deduplicating listener calls.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{NotifyError, State, flush, with_bus};

/// Flags shaping how queued events and listener calls are deduplicated.
///
/// All flags default to off. Serialized in camelCase so it can be read from a
/// config file:
///
/// ```
/// # use canopy::EventOptimization;
/// let opts: EventOptimization =
///     serde_json::from_str(r#"{"enableSingleCallbackCall": true}"#).unwrap();
/// assert!(opts.enable_single_callback_call);
/// assert!(!opts.suppress_previous_property_change_events);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventOptimization {
    /// On flush, keep only the newest queued event per node
    pub suppress_previous_property_change_events: bool,
    /// Within one episode, call each listener at most once
    pub enable_single_callback_call: bool,
    /// Within one episode, call at most one listener per hash tag
    pub enable_callback_hash_optimization: bool,
}

impl EventOptimization {
    /// All optimizations enabled
    pub fn all() -> Self {
        Self {
            suppress_previous_property_change_events: true,
            enable_single_callback_call: true,
            enable_callback_hash_optimization: true,
        }
    }
}

/// The optimization flags in effect on this thread
pub fn event_optimization() -> EventOptimization {
    with_bus(|bus| bus.options)
}

/// Replace the optimization flags on this thread
pub fn set_event_optimization(options: EventOptimization) {
    debug!(?options, "event optimization updated");
    with_bus(|bus| bus.options = options);
}

/// Modify the optimization flags in place
pub fn update_event_optimization(f: impl FnOnce(&mut EventOptimization)) {
    let mut options = event_optimization();
    f(&mut options);
    set_event_optimization(options);
}

/// Returns true while a transaction is open on this thread
pub fn in_transaction() -> bool {
    with_bus(|bus| bus.state == State::Batching)
}

/// Open a transaction. Does nothing if one is already open.
pub fn start_transaction() {
    let started = with_bus(|bus| {
        let idle = bus.state == State::Active;
        bus.state = State::Batching;
        idle
    });
    if started {
        trace!("transaction started");
    }
}

/// Open a transaction, failing if one is already open.
pub fn try_start_transaction() -> Result<(), NotifyError> {
    with_bus(|bus| match bus.state {
        State::Batching => Err(NotifyError::TransactionAlreadyActive),
        State::Active => {
            bus.state = State::Batching;
            Ok(())
        }
    })
}

/// Close the open transaction and flush its queue.
///
/// `overrides` replaces the optimization flags for this flush only; the
/// previous flags are restored afterwards. Does nothing when no transaction
/// is open.
pub fn end_transaction(overrides: Option<EventOptimization>) {
    let drained = with_bus(|bus| {
        if bus.state == State::Active {
            return None;
        }
        bus.state = State::Active;
        let previous = overrides.map(|opts| std::mem::replace(&mut bus.options, opts));
        Some((std::mem::take(&mut bus.queue), previous))
    });

    let Some((queue, previous)) = drained else {
        return;
    };

    /// Restores the caller's flags even if a listener panics.
    struct Restore(Option<EventOptimization>);
    impl Drop for Restore {
        fn drop(&mut self) {
            if let Some(options) = self.0.take() {
                with_bus(|bus| bus.options = options);
            }
        }
    }

    let _restore = Restore(previous);
    flush(queue);
}

/// Run `f` inside a transaction, flushing when it returns.
///
/// Same as `start_transaction(); f(); end_transaction(None)`, so inside an
/// already open transaction it flushes the caller's queue early. Use
/// [`batch_or_join`] to avoid that.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    start_transaction();
    let result = f();
    end_transaction(None);
    result
}

/// Like [`batch`], but if a transaction is already open `f` joins it and
/// nothing is flushed until the outer transaction ends.
pub fn batch_or_join<R>(f: impl FnOnce() -> R) -> R {
    if in_transaction() {
        return f();
    }
    batch(f)
}

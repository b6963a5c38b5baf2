//! Remote-backed nodes.
//!
//! A node whose metadata carries both a `url` and a non-zero `refreshRate` is
//! remote-backed. When such a node is created, it is handed to the
//! [`RemoteTracker`] registered on the current thread. The tree itself never
//! does I/O.
//!
//! The pieces here are independent of any runtime:
//!
//! - [`RemoteTracker`] and [`set_tracker`] connect the tree to a poller.
//! - [`apply_response`] turns one fetched response into a node update,
//!   honoring `Last-Modified` so older data never overwrites newer data.
//! - [`refresh_delay`] and [`polls_again`] encode the refresh schedule.
//!
//! With the `remote` feature, [`Poller`] drives the schedule on a tokio
//! [`LocalSet`](tokio::task::LocalSet) and [`HttpSource`] fetches over HTTP.

use std::{cell::RefCell, rc::Rc, time::Duration};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    document::Document,
    node::{Node, Notify, Property},
    value::Value,
};

pub mod errors;
#[cfg(feature = "remote")]
mod poller;
#[cfg(feature = "remote")]
mod source;

pub use errors::RemoteError;
#[cfg(feature = "remote")]
pub use poller::Poller;
#[cfg(feature = "remote")]
pub use source::{HttpSource, RemoteSource, parse_http_date};

/// Shortest delay between two fetches of the same node.
pub const MIN_REFRESH_MILLIS: i64 = 100;

/// Receives remote-backed nodes as they are created.
pub trait RemoteTracker {
    fn track(&self, node: &Node);
}

thread_local! {
    static TRACKER: RefCell<Option<Rc<dyn RemoteTracker>>> = const { RefCell::new(None) };
}

/// Register the tracker for this thread, replacing any previous one.
pub fn set_tracker(tracker: Rc<dyn RemoteTracker>) {
    TRACKER.with_borrow_mut(|slot| *slot = Some(tracker));
}

/// Unregister the tracker for this thread.
pub fn clear_tracker() {
    TRACKER.with_borrow_mut(|slot| *slot = None);
}

/// Hand `node` to the registered tracker. Returns false if there is none.
pub(crate) fn track(node: &Node) -> bool {
    // Clone out so the tracker may register or clear trackers itself.
    let tracker = TRACKER.with_borrow(|slot| slot.clone());
    match tracker {
        Some(tracker) => {
            debug!(name = %node.qualified_name(), "tracking remote node");
            tracker.track(node);
            true
        }
        None => false,
    }
}

/// One fetched response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FetchResponse {
    /// A `200` response with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            last_modified: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What applying a response did to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The node took the new value
    Applied,
    /// The fetched value equals the current one
    Unchanged,
    /// The response is not newer than the last applied one
    Stale,
    /// The node refused the value, e.g. its validator failed
    Rejected,
}

/// Apply one fetched response to `node`.
///
/// - A non-success status is a [`RemoteError::TransientFetchFailure`].
/// - A body that is not JSON, or does not fit the node kind, is a
///   [`RemoteError::MalformedRemoteResponse`].
/// - A `last_modified` not after the stored `lastModified` is [`PollOutcome::Stale`].
///
/// Otherwise the value goes through `try_set_value`, and the response's
/// `last_modified`, if any, is stored even when the node rejects the value.
pub fn apply_response(
    node: &Node,
    url: &str,
    response: FetchResponse,
) -> Result<PollOutcome, RemoteError> {
    if !response.is_success() {
        return Err(RemoteError::TransientFetchFailure {
            url: url.to_string(),
            status: response.status,
        });
    }

    let malformed = |reason: String| RemoteError::MalformedRemoteResponse {
        url: url.to_string(),
        reason,
    };
    let json: serde_json::Value =
        serde_json::from_str(&response.body).map_err(|e| malformed(e.to_string()))?;
    let value = match node {
        Node::Composite(_) => Value::Doc(Document::try_from(json).map_err(|e| malformed(e.to_string()))?),
        Node::Leaf(_) => match Value::from(json) {
            Value::Doc(_) => return Err(malformed("expected a scalar for a leaf".to_string())),
            scalar => scalar,
        },
    };

    let stored = node.metadata().last_modified();
    if let (Some(at), Some(stored)) = (response.last_modified, stored)
        && at <= stored
    {
        return Ok(PollOutcome::Stale);
    }

    let outcome = match node.try_set_value(value, Notify::Fire) {
        Ok(true) => PollOutcome::Applied,
        Ok(false) => PollOutcome::Unchanged,
        Err(err) => {
            warn!(name = %node.qualified_name(), error = %err, "remote value rejected");
            PollOutcome::Rejected
        }
    };

    if let Some(at) = response.last_modified {
        node.metadata_mut().set_last_modified(at);
    }
    Ok(outcome)
}

/// Delay before the next fetch, never shorter than [`MIN_REFRESH_MILLIS`].
pub fn refresh_delay(refresh_rate: i64) -> Duration {
    Duration::from_millis(refresh_rate.max(MIN_REFRESH_MILLIS) as u64)
}

/// Whether a node keeps polling after a completed fetch.
///
/// Only positive rates repeat; `-1` fetches once.
pub fn polls_again(refresh_rate: i64) -> bool {
    refresh_rate > 0
}

//! Background polling of remote-backed nodes.
//!
//! The poller runs on a tokio [`LocalSet`](tokio::task::LocalSet) because
//! nodes are `!Send`. Each tracked node gets its own local task that sleeps,
//! fetches and applies in a loop. Tasks hold only a [`WeakNode`], so dropping
//! a node (or its tree) ends its polling.
//!
//! ```no_run
//! # use std::rc::Rc;
//! # use canopy::{Composite, Metadata, Value, remote::{HttpSource, Poller}};
//! # async fn demo() {
//! let poller = Rc::new(Poller::new(HttpSource::new()));
//! poller.install();
//!
//! let root = Composite::empty();
//! root.create_child_with(
//!     "weather",
//!     Value::Null,
//!     Metadata::new().with_url("http://example.test/weather").with_refresh_rate(5_000),
//! );
//!
//! tokio::task::LocalSet::new().run_until(poller.run()).await;
//! # }
//! ```

use std::{cell::RefCell, rc::Rc};

use tokio::sync::{mpsc, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::{
    PollOutcome, RemoteError, RemoteSource, RemoteTracker, apply_response, polls_again,
    refresh_delay, set_tracker,
};
use crate::node::{Node, Property, WeakNode};

/// Polls tracked nodes against a [`RemoteSource`].
pub struct Poller<S> {
    source: Rc<S>,
    tracked_tx: mpsc::UnboundedSender<WeakNode>,
    tracked_rx: RefCell<Option<mpsc::UnboundedReceiver<WeakNode>>>,
    shutdown: watch::Sender<bool>,
}

impl<S: RemoteSource + 'static> Poller<S> {
    pub fn new(source: S) -> Self {
        let (tracked_tx, tracked_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        Self {
            source: Rc::new(source),
            tracked_tx,
            tracked_rx: RefCell::new(Some(tracked_rx)),
            shutdown,
        }
    }

    /// Register this poller as the thread's [`RemoteTracker`]
    pub fn install(self: &Rc<Self>) {
        set_tracker(self.clone());
    }

    /// Stop the run loop and every polling task
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Fetch and apply once, right now
    pub async fn poll_once(&self, node: &Node) -> Result<PollOutcome, RemoteError> {
        let url = node
            .metadata()
            .url()
            .map(str::to_owned)
            .ok_or_else(|| RemoteError::MissingUrl {
                name: node.qualified_name().to_string(),
            })?;
        let response = self.source.fetch(&url).await?;
        apply_response(node, &url, response)
    }

    /// Spawn a polling task for every tracked node until [`shutdown`](Self::shutdown).
    ///
    /// Must run inside a [`LocalSet`](tokio::task::LocalSet). Nodes tracked
    /// while running are picked up as they arrive. Returns immediately if the
    /// poller is already running or was already run.
    pub async fn run(&self) {
        let Some(mut tracked) = self.tracked_rx.borrow_mut().take() else {
            warn!("poller is already running");
            return;
        };
        let mut shutdown = self.shutdown.subscribe();

        async move {
            info!("starting remote poller");
            loop {
                tokio::select! {
                    Some(node) = tracked.recv() => {
                        let task = poll_node(self.source.clone(), node, self.shutdown.subscribe());
                        tokio::task::spawn_local(task);
                    }
                    _ = shutdown.wait_for(|stop| *stop) => {
                        info!("remote poller shutting down");
                        break;
                    }
                }
            }
        }
        .instrument(info_span!("remote_poller"))
        .await
    }
}

impl<S> RemoteTracker for Poller<S> {
    fn track(&self, node: &Node) {
        if self.tracked_tx.send(node.downgrade()).is_err() {
            warn!(name = %node.qualified_name(), "poller stopped, node not tracked");
        }
    }
}

/// Polling loop for one node.
async fn poll_node<S: RemoteSource>(
    source: Rc<S>,
    node: WeakNode,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        // Metadata is read every round so rate and url changes take effect.
        let Some((name, url, rate)) = node.upgrade().map(|node| {
            let metadata = node.metadata();
            (
                node.qualified_name().to_string(),
                metadata.url().map(str::to_owned),
                metadata.refresh_rate().unwrap_or(0),
            )
        }) else {
            debug!("remote node dropped, polling stopped");
            return;
        };
        let Some(url) = url else {
            warn!(error = %RemoteError::MissingUrl { name }, "polling stopped");
            return;
        };

        let response = tokio::select! {
            response = async {
                tokio::time::sleep(refresh_delay(rate)).await;
                source.fetch(&url).await
            } => response,
            _ = shutdown.wait_for(|stop| *stop) => return,
        };

        let Some(live) = node.upgrade() else {
            debug!(%name, "remote node dropped, polling stopped");
            return;
        };
        let again = match response.and_then(|response| apply_response(&live, &url, response)) {
            Ok(outcome) => {
                debug!(%name, ?outcome, "remote poll applied");
                polls_again(rate)
            }
            Err(err) if err.is_retryable() => {
                warn!(%name, error = %err, "retrying remote request");
                true
            }
            Err(err) => {
                error!(%name, error = %err, "remote data dropped");
                polls_again(rate)
            }
        };
        if !again {
            return;
        }
    }
}

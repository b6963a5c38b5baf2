//! Remote sync integration tests
//!
//! The poller runs on a `LocalSet` against a scripted source. The HTTP source
//! is exercised against a local axum server.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Json, Router,
    http::{StatusCode, header},
    routing::get,
};
use canopy::{
    Composite, Document, ListenScope, Metadata, Property, Value,
    remote::{
        FetchResponse, HttpSource, PollOutcome, Poller, RemoteError, RemoteSource, clear_tracker,
    },
};
use chrono::{TimeZone, Utc};
use tokio::task::LocalSet;

use crate::helpers::*;

/// Replays scripted responses; the last one repeats forever.
#[derive(Clone)]
struct Scripted {
    responses: Rc<RefCell<VecDeque<Result<FetchResponse, RemoteError>>>>,
    calls: Rc<Cell<usize>>,
}

impl Scripted {
    fn new(responses: Vec<Result<FetchResponse, RemoteError>>) -> Self {
        Self {
            responses: Rc::new(RefCell::new(responses.into())),
            calls: Rc::new(Cell::new(0)),
        }
    }

    fn calls(&self) -> usize {
        self.calls.get()
    }
}

#[async_trait(?Send)]
impl RemoteSource for Scripted {
    async fn fetch(&self, _url: &str) -> Result<FetchResponse, RemoteError> {
        self.calls.set(self.calls.get() + 1);
        let mut responses = self.responses.borrow_mut();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap()
        }
    }
}

fn remote(url: &str, rate: i64) -> Metadata {
    Metadata::new().with_url(url).with_refresh_rate(rate)
}

/// Poll `cond` every 10ms until it holds, failing after two seconds.
async fn wait_until(cond: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_one_shot_poll_populates_composite() {
    reset_bus();
    let source = Scripted::new(vec![Ok(FetchResponse::ok(r#"{"temp": 21, "unit": "C"}"#))]);
    let poller = Rc::new(Poller::new(source.clone()));
    poller.install();

    let root = Composite::empty();
    root.create_child_with("weather", Document::new(), remote("http://fake/weather", -1));
    clear_tracker();
    let recorder = Recorder::new();
    root.on_change(&recorder.listener, ListenScope::Subtree);

    LocalSet::new()
        .run_until(async {
            let runner = poller.clone();
            let handle = tokio::task::spawn_local(async move { runner.run().await });

            wait_until(|| root.find("weather/temp").is_some()).await;
            // A one-shot node is not fetched again
            tokio::time::sleep(Duration::from_millis(250)).await;
            poller.shutdown();
            handle.await.unwrap();
        })
        .await;

    assert_eq!(source.calls(), 1);
    assert_eq!(root.find("weather/temp").unwrap().value(), 21);
    assert_eq!(root.find("weather/unit").unwrap().value(), "C");
    assert_eq!(recorder.names(), vec!["/root"]);
}

#[tokio::test]
async fn test_failed_fetch_is_retried() {
    reset_bus();
    let source = Scripted::new(vec![
        Ok(FetchResponse::ok("").with_status(503)),
        Err(RemoteError::Request {
            url: "http://fake/n".to_string(),
            reason: "connection refused".to_string(),
        }),
        Ok(FetchResponse::ok("5")),
    ]);
    let poller = Rc::new(Poller::new(source.clone()));
    poller.install();

    let root = Composite::empty();
    root.create_child_with("n", 0, remote("http://fake/n", -1));
    clear_tracker();

    LocalSet::new()
        .run_until(async {
            let runner = poller.clone();
            let handle = tokio::task::spawn_local(async move { runner.run().await });
            wait_until(|| root.leaf("n").unwrap().value() == 5).await;
            poller.shutdown();
            handle.await.unwrap();
        })
        .await;

    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_polling_stops_when_node_is_dropped() {
    reset_bus();
    let source = Scripted::new(vec![Ok(FetchResponse::ok("1"))]);
    let poller = Rc::new(Poller::new(source.clone()));
    poller.install();

    let root = Composite::empty();
    root.create_child_with("n", 0, remote("http://fake/n", 100));
    clear_tracker();

    LocalSet::new()
        .run_until(async move {
            let runner = poller.clone();
            let handle = tokio::task::spawn_local(async move { runner.run().await });

            wait_until(|| source.calls() >= 2).await;
            drop(root);
            let at_drop = source.calls();
            tokio::time::sleep(Duration::from_millis(400)).await;
            // At most one fetch was already in flight
            assert!(source.calls() <= at_drop + 1);

            poller.shutdown();
            handle.await.unwrap();
        })
        .await;
}

#[tokio::test]
async fn test_malformed_data_keeps_polling() {
    reset_bus();
    let source = Scripted::new(vec![
        Ok(FetchResponse::ok("{broken")),
        Ok(FetchResponse::ok("7")),
    ]);
    let poller = Rc::new(Poller::new(source.clone()));
    poller.install();

    let root = Composite::empty();
    root.create_child_with("n", 0, remote("http://fake/n", 100));
    clear_tracker();

    LocalSet::new()
        .run_until(async {
            let runner = poller.clone();
            let handle = tokio::task::spawn_local(async move { runner.run().await });
            wait_until(|| root.leaf("n").unwrap().value() == 7).await;
            poller.shutdown();
            handle.await.unwrap();
        })
        .await;
}

#[tokio::test]
async fn test_poll_once_requires_url() {
    reset_bus();
    let poller = Poller::new(Scripted::new(vec![Ok(FetchResponse::ok("1"))]));
    let root = Composite::empty();
    root.create_child("n", 0);

    let err = poller.poll_once(&root.child("n").unwrap()).await.unwrap_err();
    assert_eq!(
        err,
        RemoteError::MissingUrl {
            name: "/root/n".to_string()
        }
    );
}

async fn serve() -> String {
    let router = Router::new()
        .route(
            "/settings",
            get(|| async {
                (
                    [(header::LAST_MODIFIED, "Wed, 21 Oct 2015 07:28:00 GMT")],
                    Json(serde_json::json!({ "volume": 8, "theme": "light" })),
                )
            }),
        )
        .route("/flaky", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
        .route("/garbage", get(|| async { "<html>" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_http_source_reads_last_modified() {
    let base = serve().await;
    let response = HttpSource::new()
        .fetch(&format!("{base}/settings"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(
        response.last_modified,
        Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
    );
    let json: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(json["volume"], 8);
}

#[tokio::test]
async fn test_http_poll_applies_then_goes_stale() {
    reset_bus();
    let base = serve().await;
    let poller = Poller::new(HttpSource::new());

    let root = Composite::empty();
    root.create_child_with(
        "settings",
        Document::new().with("volume", 3),
        remote(&format!("{base}/settings"), 1000),
    );
    let settings = root.child("settings").unwrap();

    assert_eq!(poller.poll_once(&settings).await, Ok(PollOutcome::Applied));
    assert_eq!(root.find("settings/volume").unwrap().value(), 8);
    assert!(settings.metadata().last_modified().is_some());

    // Same Last-Modified: local edits are not overwritten
    root.find("settings/volume").unwrap().set_value(2);
    assert_eq!(poller.poll_once(&settings).await, Ok(PollOutcome::Stale));
    assert_eq!(root.find("settings/volume").unwrap().value(), 2);
}

#[tokio::test]
async fn test_http_errors_are_classified() {
    reset_bus();
    let base = serve().await;
    let poller = Poller::new(HttpSource::new());

    let root = Composite::empty();
    root.create_child_with("a", Value::Null, Metadata::new().with_url(format!("{base}/flaky")))
        .create_child_with("b", Value::Null, Metadata::new().with_url(format!("{base}/garbage")));

    let flaky = poller.poll_once(&root.child("a").unwrap()).await.unwrap_err();
    assert!(flaky.is_retryable());
    assert!(matches!(flaky, RemoteError::TransientFetchFailure { status: 503, .. }));

    let garbage = poller.poll_once(&root.child("b").unwrap()).await.unwrap_err();
    assert!(garbage.is_malformed());
    let err: canopy::Error = garbage.into();
    assert!(err.is_remote_error());
    assert!(!err.is_retryable());
}

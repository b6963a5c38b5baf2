//! Where remote data comes from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::LAST_MODIFIED;

use super::{FetchResponse, RemoteError};

/// Fetches the current state of a remote resource.
///
/// Implementations do not interpret the body; [`apply_response`](super::apply_response)
/// does that. Futures are not `Send` since polling runs on a `LocalSet`.
#[async_trait(?Send)]
pub trait RemoteSource {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, RemoteError>;
}

/// HTTP `GET` source built on `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client, e.g. with timeouts or default headers
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl RemoteSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, RemoteError> {
        let parsed = url::Url::parse(url).map_err(|e| RemoteError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date);

        let body = response.text().await.map_err(|e| RemoteError::Request {
            url: url.to_string(),
            reason: format!("Failed to read body: {e}"),
        })?;

        Ok(FetchResponse {
            status,
            body,
            last_modified,
        })
    }
}

/// Parse a `Last-Modified` header value.
///
/// Accepts HTTP dates (`Wed, 21 Oct 2015 07:28:00 GMT`) and RFC 3339.
pub fn parse_http_date(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(text)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

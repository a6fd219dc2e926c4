//! # Backend Transport
//!
//! Asynchronous HTTP client against the home-automation backend, built on
//! `reqwest` with middleware support for exponential backoff retries on
//! transient failures. Covers the four backend surfaces:
//!
//! - `GET  {base}/item/{identifier}`: read one scalar
//! - `POST {base}/item/{identifier}`: write one scalar
//! - `GET  {base}/item/{identifier}/changes`: server-push change stream
//! - `GET  {base}/history?id={identifier}&limit={n}`: tabular history
//!
//! The transport reports success or failure to its caller and touches no
//! cache or widget state itself.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use thiserror::Error;
use url::Url;

use crate::core::value::ItemValue;
use crate::retrieve::sse::SseParser;

/// Transport failure taxonomy: network, HTTP status, or decode failure on
/// any of the four backend surfaces.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for IoError {
    fn from(e: reqwest::Error) -> Self {
        IoError::Network(e.to_string())
    }
}

impl From<reqwest_middleware::Error> for IoError {
    fn from(e: reqwest_middleware::Error) -> Self {
        IoError::Network(e.to_string())
    }
}

/// One history row as delivered by the backend: Unix-ms timestamp plus the
/// recorded scalar. Rows arrive as an unordered multiset.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct HistoryRow {
    pub t: i64,
    pub val: ItemValue,
}

/// The HTTP transport bound to one base endpoint.
///
/// Requests go through a middleware-enabled client with a transient-retry
/// policy; the long-lived change stream bypasses the retry middleware, since
/// reconnecting a push channel is a caller decision, not a retry.
pub struct HttpIo {
    inner: ClientWithMiddleware,
    stream_client: reqwest::Client,
    base_url: Url,
}

impl HttpIo {
    /// Creates a transport for `base_url` with a 3-attempt exponential
    /// backoff retry policy for transient request failures.
    pub fn new(base_url: Url) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let base = reqwest::Client::new();
        let client = ClientBuilder::new(base.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            inner: client,
            stream_client: base,
            base_url,
        }
    }

    /// The base endpoint this transport is bound to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn item_url(&self, item: &str) -> Result<Url, IoError> {
        Ok(self.base_url.join(&format!("item/{}", item))?)
    }

    /// Reads the current scalar value of one item.
    pub async fn fetch_value(&self, item: &str) -> Result<ItemValue, IoError> {
        let url = self.item_url(item)?;
        let resp = self.inner.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IoError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Writes one scalar value, JSON-serialized as the request body.
    /// Success means the backend acknowledged the write; the caller decides
    /// whether to apply an optimistic local update.
    pub async fn send_value(&self, item: &str, value: &ItemValue) -> Result<(), IoError> {
        let url = self.item_url(item)?;
        let body = serde_json::to_string(value)?;
        let resp = self
            .inner
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IoError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Issues a single historical-range read for one item.
    pub async fn query_history(&self, item: &str, limit: u32) -> Result<Vec<HistoryRow>, IoError> {
        let mut url = self.base_url.join("history")?;
        url.query_pairs_mut()
            .append_pair("id", item)
            .append_pair("limit", &limit.to_string());

        let resp = self.inner.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IoError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Opens the server-push change stream for one item.
    ///
    /// Messages are delivered in backend emission order with no replay or
    /// gap detection: a missed message is permanently lost and only
    /// correctable by a staleness-triggered re-fetch.
    pub async fn subscribe_changes(&self, item: &str) -> Result<ChangeStream, IoError> {
        let url = self.base_url.join(&format!("item/{}/changes", item))?;
        let resp = self
            .stream_client
            .get(url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(IoError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(ChangeStream::new(resp.bytes_stream()))
    }
}

/// An open push channel delivering decoded scalar values for one item
/// until the backend closes the connection.
pub struct ChangeStream {
    stream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    parser: SseParser,
    pending: VecDeque<String>,
}

impl ChangeStream {
    fn new(stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static) -> Self {
        Self {
            stream: Box::pin(stream),
            parser: SseParser::new(),
            pending: VecDeque::new(),
        }
    }

    /// Next value pushed by the backend. `None` once the stream has ended;
    /// a decode failure on one message is returned as an error without
    /// consuming the rest of the stream.
    pub async fn next_value(&mut self) -> Option<Result<ItemValue, IoError>> {
        loop {
            if let Some(data) = self.pending.pop_front() {
                return Some(serde_json::from_str(&data).map_err(IoError::from));
            }
            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    let mut events = self.parser.push(&chunk);
                    self.pending.append(&mut events);
                }
                Some(Err(e)) => return Some(Err(IoError::from(e))),
                None => return None,
            }
        }
    }
}

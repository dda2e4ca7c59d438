//! HTTP transport seam.
//!
//! [`HttpTransport`] hides the HTTP client so the fetcher's retry and rate
//! limiting can be exercised against canned responses.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Status and body of a completed HTTP exchange, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failure below the HTTP layer: no status was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request timed out.
    #[error("timeout: {0}")]
    Timeout(String),
    /// The connection could not be established.
    #[error("connect: {0}")]
    Connect(String),
    /// The response body could not be read.
    #[error("body: {0}")]
    Body(String),
    /// The request itself was invalid (bad URL or header).
    #[error("request: {0}")]
    Request(String),
}

impl TransportError {
    /// True for failures that may succeed on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        !matches!(self, Self::Request(_))
    }
}

/// Performs single HTTP GET requests. Implementations never retry.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Issues a GET with the given headers.
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the given request timeout.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> rsplit_core::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| rsplit_core::SplitError::Config(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wraps a pre-configured client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else if e.is_builder() {
                TransportError::Request(e.to_string())
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(any(test, feature = "test-util"))]
pub use canned::{RecordedRequest, StaticTransport};

#[cfg(any(test, feature = "test-util"))]
mod canned {
    use super::{HttpResponse, HttpTransport, TransportError};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use tokio::time::Instant;

    type Reply = Result<HttpResponse, TransportError>;

    /// A recorded request.
    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        /// Requested URL.
        pub url: String,
        /// Header pairs sent with the request.
        pub headers: Vec<(String, String)>,
        /// Tokio clock reading when the request was issued.
        pub at: Instant,
    }

    /// Transport answering from canned routes.
    ///
    /// Each URL holds a queue of replies; the last reply repeats once the
    /// queue drains. Unknown URLs answer 404. Every request is recorded.
    #[derive(Debug, Default)]
    pub struct StaticTransport {
        routes: Mutex<HashMap<String, VecDeque<Reply>>>,
        log: Mutex<Vec<RecordedRequest>>,
    }

    impl StaticTransport {
        /// Creates a transport with no routes.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Adds a reply for `url` (builder form).
        #[must_use]
        pub fn with_route(
            self,
            url: impl Into<String>,
            status: u16,
            body: impl Into<String>,
        ) -> Self {
            self.push(url, Ok(HttpResponse::new(status, body)));
            self
        }

        /// Queues a reply for `url`.
        pub fn respond(&self, url: impl Into<String>, status: u16, body: impl Into<String>) {
            self.push(url, Ok(HttpResponse::new(status, body)));
        }

        /// Queues a transport failure for `url`.
        pub fn fail(&self, url: impl Into<String>, error: TransportError) {
            self.push(url, Err(error));
        }

        fn push(&self, url: impl Into<String>, reply: Reply) {
            if let Ok(mut routes) = self.routes.lock() {
                routes.entry(url.into()).or_default().push_back(reply);
            }
        }

        /// Every request issued so far, in order.
        #[must_use]
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.log.lock().map(|log| log.clone()).unwrap_or_default()
        }

        /// Number of requests issued for `url`.
        #[must_use]
        pub fn hits(&self, url: &str) -> usize {
            self.requests().iter().filter(|r| r.url == url).count()
        }
    }

    #[async_trait]
    impl HttpTransport for StaticTransport {
        async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Reply {
            if let Ok(mut log) = self.log.lock() {
                log.push(RecordedRequest {
                    url: url.to_string(),
                    headers: headers
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                        .collect(),
                    at: Instant::now(),
                });
            }

            let Ok(mut routes) = self.routes.lock() else {
                return Err(TransportError::Request("poisoned route table".into()));
            };
            match routes.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue
                    .pop_front()
                    .unwrap_or_else(|| Ok(HttpResponse::new(404, ""))),
                Some(queue) => queue
                    .front()
                    .cloned()
                    .unwrap_or_else(|| Ok(HttpResponse::new(404, ""))),
                None => Ok(HttpResponse::new(404, "")),
            }
        }
    }
}

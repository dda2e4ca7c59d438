//! Rate-limited, retrying HTTP access to EDGAR.

use rand::Rng;
use rsplit_core::{FetchError, Result, SplitError};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::rate_limit::RateLimit;
use crate::transport::{HttpResponse, HttpTransport};

/// Retry behavior for transient registry failures.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub factor: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Whether to spread delays randomly over 50-100% of the nominal value.
    pub jitter: bool,
    /// HTTP statuses that trigger a retry.
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            factor: 2.0,
            max_delay: Duration::from_secs(8),
            jitter: true,
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// True when `status` is worth another attempt.
    #[must_use]
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status) || (500..600).contains(&status)
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// The exponential term is capped at `max_delay` before it becomes a
    /// [`Duration`], so any retry count is safe.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let seconds = self.base_delay.as_secs_f64() * self.factor.max(1.0).powi(exponent);
        // `min` also maps an infinite or NaN product to the cap.
        let nominal = Duration::from_secs_f64(seconds.min(self.max_delay.as_secs_f64()));
        if !self.jitter {
            return nominal;
        }
        nominal.mul_f64(rand::thread_rng().gen_range(0.5..1.0))
    }
}

/// Shared low-level access to the registry.
///
/// Every request waits on the shared [`RateLimit`], carries the identifying
/// `User-Agent` the SEC requires, and is retried with exponential backoff on
/// timeouts, connection failures, 408, 429 and 5xx. No caching happens here.
#[derive(Debug, Clone)]
pub struct RateLimitedFetcher {
    transport: Arc<dyn HttpTransport>,
    limiter: Arc<dyn RateLimit>,
    user_agent: String,
    retry: RetryPolicy,
}

impl RateLimitedFetcher {
    /// Create a fetcher.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// Returns [`SplitError::Config`] if the user agent is empty or lacks a
    /// contact e-mail address.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        limiter: Arc<dyn RateLimit>,
        user_agent: &str,
    ) -> Result<Self> {
        validate_user_agent(user_agent)?;
        Ok(Self {
            transport,
            limiter,
            user_agent: user_agent.trim().to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The identifying header value sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetches `url`, returning the successful response.
    ///
    /// # Errors
    /// [`FetchError::Transient`] when retries are exhausted on a retryable
    /// failure, [`FetchError::Permanent`] for any other non-2xx status.
    pub async fn fetch(&self, url: &str) -> std::result::Result<HttpResponse, FetchError> {
        self.fetch_with_headers(url, &[]).await
    }

    /// Fetches `url` with additional headers.
    ///
    /// # Errors
    /// Same as [`fetch`](Self::fetch).
    pub async fn fetch_with_headers(
        &self,
        url: &str,
        extra: &[(&str, &str)],
    ) -> std::result::Result<HttpResponse, FetchError> {
        let mut headers = Vec::with_capacity(extra.len() + 1);
        headers.push(("User-Agent", self.user_agent.as_str()));
        headers.extend_from_slice(extra);

        let attempts = self.retry.max_attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=attempts {
            self.limiter.acquire().await;
            debug!(url, attempt, "Fetching from EDGAR");

            match self.transport.get(url, &headers).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if self.retry.should_retry_status(response.status) => {
                    last_reason = format!("HTTP {}", response.status);
                }
                Ok(response) => {
                    return Err(FetchError::Permanent {
                        url: url.to_string(),
                        status: Some(response.status),
                        reason: format!("HTTP {}", response.status),
                    });
                }
                Err(e) if e.is_transient() => last_reason = e.to_string(),
                Err(e) => {
                    return Err(FetchError::Permanent {
                        url: url.to_string(),
                        status: None,
                        reason: e.to_string(),
                    });
                }
            }

            if attempt < attempts {
                let delay = self.retry.delay_for(attempt);
                warn!(url, attempt, reason = %last_reason, ?delay, "Retrying EDGAR request");
                sleep(delay).await;
            }
        }

        Err(FetchError::Transient {
            url: url.to_string(),
            reason: format!("{last_reason} after {attempts} attempts"),
        })
    }

    /// Fetches and deserializes a JSON document.
    ///
    /// # Errors
    /// [`SplitError::Fetch`] on request failure, [`SplitError::Parse`] when
    /// the body is not the expected JSON.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .fetch_with_headers(url, &[("Accept", "application/json")])
            .await?;
        serde_json::from_str(&response.body)
            .map_err(|e| SplitError::Parse(format!("Failed to parse {url}: {e}")))
    }
}

/// Checks the SEC fair-access requirement on the `User-Agent` header.
///
/// # Errors
/// Returns [`SplitError::Config`] if the value is blank or has no contact
/// e-mail address.
pub fn validate_user_agent(user_agent: &str) -> Result<()> {
    let trimmed = user_agent.trim();
    if trimmed.is_empty() {
        return Err(SplitError::Config(
            "EDGAR requires a User-Agent header identifying the requester".into(),
        ));
    }
    let has_contact = trimmed
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == '<' || c == '>')
        .any(|word| {
            word.split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'))
        });
    if !has_contact {
        return Err(SplitError::Config(format!(
            "EDGAR User-Agent must include a contact e-mail address: {trimmed:?}"
        )));
    }
    Ok(())
}

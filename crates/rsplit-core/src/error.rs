//! Error types for EDGAR split linking.
//!
//! This module defines [`SplitError`], the crate-wide error, together with the
//! narrower [`FetchError`] and [`ExtractionError`] raised by the registry
//! components.

use thiserror::Error;

/// Failure of a single registry request after retries were exhausted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// A failure that may succeed on a later attempt (429, 5xx, timeouts).
    #[error("transient fetch failure for {url}: {reason}")]
    Transient {
        /// The requested URL.
        url: String,
        /// Human readable cause.
        reason: String,
    },

    /// A failure that will not succeed on retry (404, 403, malformed request).
    #[error("permanent fetch failure for {url} (status {status:?}): {reason}")]
    Permanent {
        /// The requested URL.
        url: String,
        /// HTTP status, when the server answered at all.
        status: Option<u16>,
        /// Human readable cause.
        reason: String,
    },
}

impl FetchError {
    /// Returns true for failures worth retrying on a later run.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// The URL that failed.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Transient { url, .. } | Self::Permanent { url, .. } => url,
        }
    }
}

/// Hard failure while turning a filing document into facts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The document could not be downloaded.
    #[error("document fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    /// The document was empty or could not be reduced to text.
    #[error("unparseable document {url}: {reason}")]
    UnparseableDocument {
        /// Document URL.
        url: String,
        /// Human readable cause.
        reason: String,
    },
}

/// Errors that can occur while linking splits to filings.
#[derive(Error, Debug)]
pub enum SplitError {
    /// No CIK could be found for the symbol or company name.
    #[error("no CIK found for {symbol} ({company_name:?})")]
    CikNotFound {
        /// Ticker that was looked up.
        symbol: String,
        /// Company name used for the fallback match, if any.
        company_name: Option<String>,
    },

    /// Registry request failure.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Document extraction failure.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Error parsing registry or stored data.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the split store.
    #[error("Store error: {0}")]
    Store(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Misconfiguration that makes every request invalid. Fatal to a batch.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl SplitError {
    /// Returns true when the whole batch must stop rather than the current split.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias using [`SplitError`].
pub type Result<T> = std::result::Result<T, SplitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_classification() {
        let transient = FetchError::Transient {
            url: "https://example.test/a".into(),
            reason: "HTTP 503".into(),
        };
        let permanent = FetchError::Permanent {
            url: "https://example.test/b".into(),
            status: Some(404),
            reason: "not found".into(),
        };
        assert!(transient.is_transient());
        assert!(!permanent.is_transient());
        assert_eq!(permanent.url(), "https://example.test/b");
    }

    #[test]
    fn test_only_config_is_fatal() {
        assert!(SplitError::Config("missing user agent".into()).is_fatal());
        assert!(
            !SplitError::CikNotFound {
                symbol: "ABCD".into(),
                company_name: None
            }
            .is_fatal()
        );
        let fetch: SplitError = FetchError::Transient {
            url: "u".into(),
            reason: "r".into(),
        }
        .into();
        assert!(!fetch.is_fatal());
    }
}

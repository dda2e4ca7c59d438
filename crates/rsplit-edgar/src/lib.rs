#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/rsplit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR components for linking reverse splits to filings.
//!
//! This crate provides the registry-facing stages of the pipeline:
//!
//! - CIK lookup from ticker symbols or company names
//! - Filing discovery from the submissions API
//! - Fact extraction from filing documents
//! - Relevance scoring of candidate filings
//!
//! # Example
//!
//! ```no_run
//! use rsplit_edgar::{
//!     EdgarEndpoints, FilingDiscovery, RateLimitedFetcher, ReqwestTransport, TokenBucket,
//! };
//! use rsplit_core::{Cik, DiscoveryWindow};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = RateLimitedFetcher::new(
//!         Arc::new(ReqwestTransport::new(Duration::from_secs(30))?),
//!         Arc::new(TokenBucket::new(8)),
//!         "MyApp/1.0 (contact@example.com)",
//!     )?;
//!     let discovery = FilingDiscovery::new(Arc::new(fetcher), EdgarEndpoints::default());
//!
//!     let target = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//!     let candidates = discovery
//!         .discover(Cik::new(320193)?, target, DiscoveryWindow::default())
//!         .await?;
//!     for filing in &candidates {
//!         println!("{} {} {}", filing.filing_date, filing.form_type, filing.document_url);
//!     }
//!
//!     Ok(())
//! }
//! ```

/// Candidate filing discovery.
pub mod discovery;
/// Fact extraction from filing documents.
pub mod extract;
/// Rate-limited, retrying fetcher.
pub mod fetcher;
/// Request-rate limiting.
pub mod rate_limit;
/// CIK resolution.
pub mod resolver;
/// Relevance scoring.
pub mod score;
/// HTTP transport seam.
pub mod transport;

mod wire;

pub use discovery::{CandidateSet, FilingDiscovery};
pub use extract::{
    Confidence, ContentExtractor, ExtractedFacts, RatioFinding, extract_facts, strip_markup,
};
pub use fetcher::{RateLimitedFetcher, RetryPolicy, validate_user_agent};
pub use rate_limit::{RateLimit, TokenBucket};
pub use resolver::{CikResolver, normalize_company_name};
pub use score::{RelevanceScorer, ScoreWeights, ScoredFiling, business_days_between, rank_filings};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use wire::{ARCHIVES_BASE_URL, COMPANY_TICKERS_URL, EdgarEndpoints, SUBMISSIONS_BASE_URL};

#[cfg(any(test, feature = "test-util"))]
pub use transport::{RecordedRequest, StaticTransport};

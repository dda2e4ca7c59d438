#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/rsplit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Reverse split to SEC filing linker.
//!
//! This crate ties the pipeline together. It re-exports the domain types,
//! the stores and the registry components, and provides the [`SplitLinker`]
//! that resolves a batch of splits plus the [`run_nightly_edgar_batch`]
//! entry point.
//!
//! # Features
//!
//! - `sqlite` - SQLite-backed [`SqliteStore`] and the `rsplit-nightly` binary

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

// Core types and traits
pub use rsplit_core::*;

// Stores
#[cfg(feature = "sqlite")]
pub use rsplit_store::SqliteStore;
pub use rsplit_store::InMemoryStore;

// Registry components
pub use rsplit_edgar::{
    CikResolver, Confidence, ContentExtractor, EdgarEndpoints, ExtractedFacts, FilingDiscovery,
    HttpTransport, RateLimitedFetcher, RatioFinding, RelevanceScorer, ReqwestTransport,
    RetryPolicy, ScoreWeights, TokenBucket,
};

mod config;
mod linker;
mod report;
pub use config::{BatchConfig, MAX_ATTEMPTS, MAX_CONCURRENCY, MAX_RATE_LIMIT, MAX_WINDOW_DAYS};
pub use linker::SplitLinker;
pub use report::{ProcessingReport, SplitOutcome};

/// Runs one linking batch over the unresolved splits in `store`.
///
/// # Errors
/// Returns [`SplitError::Config`] for an invalid configuration, or a store
/// error when the unresolved splits cannot be listed. Per-split failures are
/// reported in the [`ProcessingReport`] instead.
pub async fn run_nightly_edgar_batch(
    store: Arc<dyn SplitStore>,
    config: &BatchConfig,
) -> Result<ProcessingReport> {
    let (_shutdown_tx, shutdown) = watch::channel(false);
    run_nightly_edgar_batch_with_shutdown(store, config, shutdown).await
}

/// Like [`run_nightly_edgar_batch`], stopping early once `shutdown` turns true.
///
/// # Errors
/// Same as [`run_nightly_edgar_batch`].
pub async fn run_nightly_edgar_batch_with_shutdown(
    store: Arc<dyn SplitStore>,
    config: &BatchConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<ProcessingReport> {
    config.validate()?;
    info!(
        rate_limit = config.rate_limit,
        window_before_days = config.window.before_days,
        window_after_days = config.window.after_days,
        min_score = config.min_score_threshold,
        max_splits = ?config.max_splits,
        "Running nightly EDGAR batch"
    );

    let transport = Arc::new(ReqwestTransport::new(config.request_timeout)?);
    let linker = SplitLinker::with_transport(store, transport, config)?;
    linker.run(config.max_splits, shutdown).await
}

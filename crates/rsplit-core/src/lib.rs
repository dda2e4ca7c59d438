#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/rsplit/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for linking reverse splits to EDGAR filings.
//!
//! - [`SplitRecord`](types::SplitRecord) - A reverse split reported by a collector
//! - [`EdgarFilingRecord`](types::EdgarFilingRecord) - A scored filing link
//! - [`SplitStore`](store::SplitStore) - Persistence abstraction
//! - [`SplitError`](error::SplitError) - Error taxonomy

/// Error types for linking operations.
pub mod error;
/// Tabular export of linked splits.
pub mod frame;
/// Persistence trait for splits and filing links.
pub mod store;
/// Core data types.
pub mod types;

pub use error::{ExtractionError, FetchError, Result, SplitError};
pub use frame::linked_splits_frame;
pub use store::{SplitStore, validate_resolution};
pub use types::{
    Cik, CikMapping, DEFAULT_CIK_TTL, DiscoveryWindow, EdgarFilingRecord, FilingCandidate,
    FormType, LinkOutcome, LinkedSplit, NewSplitRecord, SplitId, SplitRatio, SplitRecord,
    SplitSource, Symbol, normalize_ticker, parse_share_count,
};

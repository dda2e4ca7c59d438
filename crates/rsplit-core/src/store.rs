//! Persistence trait for split records and their filing links.
//!
//! This module defines the [`SplitStore`] trait, the read/write contract the
//! link writer needs from whatever database backs the collectors and the
//! dashboard.

use async_trait::async_trait;
use std::fmt;

use crate::{
    error::{Result, SplitError},
    types::{
        CikMapping, EdgarFilingRecord, LinkOutcome, LinkedSplit, NewSplitRecord, SplitId,
        SplitRecord, Symbol,
    },
};

/// Storage for splits, CIK mappings and filing links.
///
/// Every mutation is keyed by a single split, so implementations only need
/// atomic upsert-by-key; no cross-record locking is required.
#[async_trait]
pub trait SplitStore: Send + Sync + fmt::Debug {
    /// Inserts a split or refreshes the collector-owned fields of the existing
    /// record with the same (`symbol`, `effective_date`).
    ///
    /// Linking state (`edgar_resolved`, attempts, outcome) is never reset.
    async fn upsert_split(&self, split: &NewSplitRecord) -> Result<SplitRecord>;

    /// Returns a split by id.
    async fn get_split(&self, id: SplitId) -> Result<Option<SplitRecord>>;

    /// Returns up to `limit` splits that are unresolved or flagged for
    /// reprocessing, in ascending id order.
    async fn unresolved_splits(&self, limit: Option<usize>) -> Result<Vec<SplitRecord>>;

    /// Sets or clears the forced-reprocess flag.
    async fn set_force_reprocess(&self, id: SplitId, force: bool) -> Result<()>;

    /// Returns the cached mapping for a symbol, expired or not.
    ///
    /// Returns `Ok(None)` if nothing is cached.
    async fn get_cik_mapping(&self, symbol: &Symbol) -> Result<Option<CikMapping>>;

    /// Stores a mapping, replacing any previous one for the same symbol.
    async fn put_cik_mapping(&self, mapping: &CikMapping) -> Result<()>;

    /// Atomically persists the scored filings of a split and marks it resolved.
    ///
    /// Rows are upserted by (`split_id`, `accession_number`). Exactly one of
    /// `filings` must be canonical; any previously canonical row of the split
    /// loses the flag. The split's force flag is cleared and its attempt
    /// counter advanced.
    async fn commit_resolution(
        &self,
        split_id: SplitId,
        filings: &[EdgarFilingRecord],
    ) -> Result<()>;

    /// Records an attempt that left the split unresolved.
    ///
    /// `edgar_resolved` is left untouched, so a previously resolved split that
    /// was forced and failed keeps its existing links.
    async fn record_outcome(&self, split_id: SplitId, outcome: LinkOutcome) -> Result<()>;

    /// All filing links of a split, canonical first, then by descending score.
    async fn filings_for_split(&self, split_id: SplitId) -> Result<Vec<EdgarFilingRecord>>;

    /// The canonical filing of a split, if resolved.
    async fn canonical_filing(&self, split_id: SplitId) -> Result<Option<EdgarFilingRecord>>;

    /// Every split joined with its canonical filing, ordered by effective date.
    async fn linked_splits(&self) -> Result<Vec<LinkedSplit>>;
}

/// Validates the canonical-flag contract of [`SplitStore::commit_resolution`].
///
/// # Errors
/// Returns [`SplitError::InvalidParameter`]
/// when the slice is empty, belongs to another split, or does not hold exactly
/// one canonical record.
pub fn validate_resolution(split_id: SplitId, filings: &[EdgarFilingRecord]) -> Result<()> {
    if filings.is_empty() {
        return Err(SplitError::InvalidParameter(format!(
            "split {split_id}: resolution without filings"
        )));
    }
    if let Some(stray) = filings.iter().find(|f| f.split_id != split_id) {
        return Err(SplitError::InvalidParameter(format!(
            "filing {} belongs to split {}, not {split_id}",
            stray.accession_number, stray.split_id
        )));
    }
    let canonical = filings.iter().filter(|f| f.is_canonical).count();
    if canonical != 1 {
        return Err(SplitError::InvalidParameter(format!(
            "split {split_id}: expected one canonical filing, got {canonical}"
        )));
    }
    Ok(())
}

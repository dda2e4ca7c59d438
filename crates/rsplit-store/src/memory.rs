//! In-memory split store.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rsplit_core::{
    CikMapping, EdgarFilingRecord, LinkOutcome, LinkedSplit, NewSplitRecord, Result, SplitError,
    SplitId, SplitRecord, SplitStore, Symbol, validate_resolution,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Debug, Default)]
struct State {
    splits: BTreeMap<SplitId, SplitRecord>,
    keys: HashMap<(Symbol, NaiveDate), SplitId>,
    next_id: i64,
    mappings: HashMap<Symbol, CikMapping>,
    filings: BTreeMap<(SplitId, String), EdgarFilingRecord>,
}

impl State {
    fn split_mut(&mut self, id: SplitId) -> Result<&mut SplitRecord> {
        self.splits
            .get_mut(&id)
            .ok_or_else(|| SplitError::InvalidParameter(format!("unknown split {id}")))
    }

    fn filings_of(&self, split_id: SplitId) -> impl Iterator<Item = &EdgarFilingRecord> {
        self.filings
            .range((split_id, String::new())..)
            .take_while(move |((id, _), _)| *id == split_id)
            .map(|(_, f)| f)
    }
}

/// Simple in-memory store for testing and development.
///
/// All state sits behind a single `RwLock`, so a resolution commit is atomic
/// with respect to concurrent readers. Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SplitStore for InMemoryStore {
    #[instrument(skip(self, split), fields(symbol = %split.symbol))]
    async fn upsert_split(&self, split: &NewSplitRecord) -> Result<SplitRecord> {
        let mut state = self.state.write().await;
        let key = (split.symbol.clone(), split.effective_date);

        if let Some(id) = state.keys.get(&key).copied() {
            let record = state.split_mut(id)?;
            if split.company_name.is_some() {
                record.company_name.clone_from(&split.company_name);
            }
            record.split_ratio.clone_from(&split.split_ratio);
            record.source = split.source;
            record.last_updated = Utc::now();
            debug!(id = %id, "Refreshed split record");
            return Ok(record.clone());
        }

        state.next_id += 1;
        let id = SplitId(state.next_id);
        let record = SplitRecord {
            id,
            symbol: split.symbol.clone(),
            company_name: split.company_name.clone(),
            split_ratio: split.split_ratio.clone(),
            effective_date: split.effective_date,
            source: split.source,
            edgar_resolved: false,
            force_reprocess: false,
            edgar_attempts: 0,
            last_outcome: None,
            last_updated: Utc::now(),
        };
        state.keys.insert(key, id);
        state.splits.insert(id, record.clone());
        debug!(id = %id, "Inserted split record");
        Ok(record)
    }

    async fn get_split(&self, id: SplitId) -> Result<Option<SplitRecord>> {
        Ok(self.state.read().await.splits.get(&id).cloned())
    }

    async fn unresolved_splits(&self, limit: Option<usize>) -> Result<Vec<SplitRecord>> {
        let state = self.state.read().await;
        Ok(state
            .splits
            .values()
            .filter(|s| s.needs_linking())
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn set_force_reprocess(&self, id: SplitId, force: bool) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state.split_mut(id)?;
        record.force_reprocess = force;
        record.last_updated = Utc::now();
        Ok(())
    }

    async fn get_cik_mapping(&self, symbol: &Symbol) -> Result<Option<CikMapping>> {
        Ok(self.state.read().await.mappings.get(symbol).cloned())
    }

    async fn put_cik_mapping(&self, mapping: &CikMapping) -> Result<()> {
        self.state
            .write()
            .await
            .mappings
            .insert(mapping.symbol.clone(), mapping.clone());
        Ok(())
    }

    #[instrument(skip(self, filings), fields(filings = filings.len()))]
    async fn commit_resolution(
        &self,
        split_id: SplitId,
        filings: &[EdgarFilingRecord],
    ) -> Result<()> {
        validate_resolution(split_id, filings)?;
        let mut state = self.state.write().await;
        // Validate the split before touching any filing row.
        state.split_mut(split_id)?;

        for (_, existing) in state
            .filings
            .range_mut((split_id, String::new())..)
            .take_while(|((id, _), _)| *id == split_id)
        {
            existing.is_canonical = false;
        }
        for filing in filings {
            state
                .filings
                .insert((split_id, filing.accession_number.clone()), filing.clone());
        }

        let record = state.split_mut(split_id)?;
        record.edgar_resolved = true;
        record.force_reprocess = false;
        record.edgar_attempts += 1;
        record.last_outcome = Some(LinkOutcome::Resolved);
        record.last_updated = Utc::now();
        Ok(())
    }

    async fn record_outcome(&self, split_id: SplitId, outcome: LinkOutcome) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state.split_mut(split_id)?;
        record.edgar_attempts += 1;
        record.last_outcome = Some(outcome);
        if outcome != LinkOutcome::Errored {
            record.force_reprocess = false;
        }
        record.last_updated = Utc::now();
        Ok(())
    }

    async fn filings_for_split(&self, split_id: SplitId) -> Result<Vec<EdgarFilingRecord>> {
        let state = self.state.read().await;
        let mut filings: Vec<_> = state.filings_of(split_id).cloned().collect();
        filings.sort_by(|a, b| {
            b.is_canonical
                .cmp(&a.is_canonical)
                .then(b.relevance_score.total_cmp(&a.relevance_score))
                .then(a.filing_date.cmp(&b.filing_date))
                .then_with(|| a.accession_number.cmp(&b.accession_number))
        });
        Ok(filings)
    }

    async fn canonical_filing(&self, split_id: SplitId) -> Result<Option<EdgarFilingRecord>> {
        let state = self.state.read().await;
        Ok(state.filings_of(split_id).find(|f| f.is_canonical).cloned())
    }

    async fn linked_splits(&self) -> Result<Vec<LinkedSplit>> {
        let state = self.state.read().await;
        let mut linked: Vec<_> = state
            .splits
            .values()
            .map(|split| LinkedSplit {
                split: split.clone(),
                canonical: state.filings_of(split.id).find(|f| f.is_canonical).cloned(),
            })
            .collect();
        linked.sort_by_key(|l| (l.split.effective_date, l.split.id));
        Ok(linked)
    }
}

//! The link writer: drives resolution, discovery, extraction and scoring for
//! each unresolved split and persists the outcome.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::{StreamExt, future, stream};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use rsplit_core::{
    DiscoveryWindow, ExtractionError, LinkOutcome, Result, SplitError, SplitRecord, SplitStore,
};
use rsplit_edgar::{
    CikResolver, ContentExtractor, FilingDiscovery, HttpTransport, RateLimitedFetcher,
    RelevanceScorer, ScoredFiling, TokenBucket, rank_filings,
};

use crate::config::BatchConfig;
use crate::report::{ProcessingReport, SplitOutcome};

/// Links splits to the filings that disclose them.
///
/// All stages share one [`RateLimitedFetcher`], so running several splits
/// concurrently never raises the request rate above the configured ceiling.
#[derive(Debug)]
pub struct SplitLinker {
    store: Arc<dyn SplitStore>,
    resolver: CikResolver,
    discovery: FilingDiscovery,
    extractor: ContentExtractor,
    scorer: RelevanceScorer,
    window: DiscoveryWindow,
    min_score: f64,
    max_candidates: usize,
    runners_up: usize,
    concurrency: usize,
    time_budget: Option<Duration>,
}

impl SplitLinker {
    /// Creates a linker around an existing fetcher.
    #[must_use]
    pub fn new(
        store: Arc<dyn SplitStore>,
        fetcher: Arc<RateLimitedFetcher>,
        config: &BatchConfig,
    ) -> Self {
        let resolver = CikResolver::new(
            Arc::clone(&fetcher),
            Arc::clone(&store),
            config.endpoints.clone(),
        )
        .with_ttl(config.cik_ttl);

        Self {
            resolver,
            discovery: FilingDiscovery::new(Arc::clone(&fetcher), config.endpoints.clone()),
            extractor: ContentExtractor::new(fetcher),
            scorer: RelevanceScorer::new(config.window),
            store,
            window: config.window,
            min_score: config.min_score_threshold,
            max_candidates: config.max_candidates_per_split.max(1),
            runners_up: config.runners_up,
            concurrency: config.concurrency.max(1),
            time_budget: config.time_budget,
        }
    }

    /// Creates a linker whose fetcher issues requests through `transport`,
    /// throttled by a token bucket at the configured rate.
    ///
    /// # Errors
    /// Returns [`SplitError::Config`] if the user agent is unusable.
    pub fn with_transport(
        store: Arc<dyn SplitStore>,
        transport: Arc<dyn HttpTransport>,
        config: &BatchConfig,
    ) -> Result<Self> {
        let fetcher = RateLimitedFetcher::new(
            transport,
            Arc::new(TokenBucket::new(config.rate_limit)),
            &config.user_agent,
        )?
        .with_retry(config.retry.clone());
        Ok(Self::new(store, Arc::new(fetcher), config))
    }

    /// Lists unresolved splits from the store and resolves them.
    ///
    /// # Errors
    /// Fails when the store cannot list splits or a fatal configuration error
    /// stops the batch.
    pub async fn run(
        &self,
        max_splits: Option<usize>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ProcessingReport> {
        let splits = self.store.unresolved_splits(max_splits).await?;
        self.resolve_batch(splits, shutdown).await
    }

    /// Resolves `splits`, isolating per-split failures.
    ///
    /// New splits stop being picked up once `shutdown` turns true or the time
    /// budget runs out; splits already in flight finish. Every outcome is
    /// persisted as soon as it is known, so an interrupted batch keeps its
    /// progress.
    ///
    /// # Errors
    /// Only fatal errors ([`SplitError::is_fatal`]) are returned, after the
    /// in-flight splits have completed.
    pub async fn resolve_batch(
        &self,
        splits: Vec<SplitRecord>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ProcessingReport> {
        let total = splits.len();
        let deadline = self.time_budget.map(|budget| Instant::now() + budget);
        let halted = AtomicBool::new(false);
        let started = AtomicUsize::new(0);
        info!(
            splits = total,
            concurrency = self.concurrency,
            "Starting EDGAR link batch"
        );

        let mut report = ProcessingReport::default();
        let mut fatal = None;
        {
            let mut outcomes = stream::iter(splits)
                .take_while(|_| {
                    future::ready(
                        !halted.load(Ordering::Acquire) && !stop_requested(&shutdown, deadline),
                    )
                })
                .map(|split| {
                    started.fetch_add(1, Ordering::Relaxed);
                    self.process(split)
                })
                .buffer_unordered(self.concurrency);

            while let Some(result) = outcomes.next().await {
                match result {
                    Ok(outcome) => report.record(outcome),
                    Err(e) => {
                        error!(error = %e, "Fatal error, stopping batch");
                        halted.store(true, Ordering::Release);
                        fatal.get_or_insert(e);
                    }
                }
            }
        }

        report.cancelled = total.saturating_sub(started.load(Ordering::Relaxed));
        if report.cancelled > 0 {
            warn!(cancelled = report.cancelled, "Batch stopped before all splits were picked up");
        }
        info!(%report, "EDGAR link batch finished");

        match fatal {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Runs one split, converting non-fatal failures into an errored outcome.
    #[instrument(skip(self, split), fields(split_id = %split.id, symbol = %split.symbol))]
    async fn process(&self, split: SplitRecord) -> Result<SplitOutcome> {
        if !split.needs_linking() {
            debug!("Already resolved, skipping");
            return Ok(SplitOutcome::new(
                split.id,
                split.symbol,
                LinkOutcome::Skipped,
            ));
        }

        match self.link(&split).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "Split failed, leaving it for the next run");
                if let Err(store_error) = self
                    .store
                    .record_outcome(split.id, LinkOutcome::Errored)
                    .await
                {
                    warn!(error = %store_error, "Failed to record errored outcome");
                }
                let mut outcome = SplitOutcome::new(split.id, split.symbol, LinkOutcome::Errored);
                outcome.error = Some(e.to_string());
                Ok(outcome)
            }
        }
    }

    async fn link(&self, split: &SplitRecord) -> Result<SplitOutcome> {
        let cik = match self
            .resolver
            .resolve(&split.symbol, split.company_name.as_deref())
            .await
        {
            Ok(cik) => cik,
            Err(SplitError::CikNotFound { .. }) => {
                info!("No CIK found");
                return self.unresolved(split, LinkOutcome::CikNotFound).await;
            }
            Err(e) => return Err(e),
        };

        let candidates = self
            .discovery
            .discover(cik, split.effective_date, self.window)
            .await?;
        debug!(%cik, candidates = candidates.len(), "Discovered candidates");
        if candidates.is_empty() {
            return self.unresolved(split, LinkOutcome::NoQualifyingFiling).await;
        }

        let mut scored = Vec::new();
        let mut failure: Option<ExtractionError> = None;
        for candidate in candidates.iter().take(self.max_candidates) {
            match self.extractor.extract(candidate).await {
                Ok(facts) => {
                    let score = self.scorer.score(candidate, &facts, split);
                    debug!(
                        accession = %candidate.accession_number,
                        form = %candidate.form_type,
                        score,
                        "Scored candidate"
                    );
                    scored.push(ScoredFiling {
                        candidate: candidate.clone(),
                        facts,
                        score,
                    });
                }
                Err(e) => {
                    warn!(accession = %candidate.accession_number, error = %e, "Dropping candidate");
                    failure = Some(e);
                }
            }
        }

        rank_filings(&mut scored);
        let accepted: Vec<ScoredFiling> = scored
            .into_iter()
            .filter(|f| f.score > 0.0 && f.score >= self.min_score)
            .take(1 + self.runners_up)
            .collect();

        let Some(best) = accepted.first() else {
            // Unexamined candidates may hold the disclosure; retry next run.
            if let Some(e) = failure {
                return Err(SplitError::Extraction(e));
            }
            return self.unresolved(split, LinkOutcome::NoQualifyingFiling).await;
        };

        let mut outcome = SplitOutcome::new(split.id, split.symbol.clone(), LinkOutcome::Resolved);
        outcome.accession_number = Some(best.candidate.accession_number.clone());
        outcome.score = Some(best.score);
        outcome.warnings.clone_from(&best.facts.warnings);

        let records: Vec<_> = accepted
            .into_iter()
            .enumerate()
            .map(|(rank, filing)| filing.into_record(split.id, rank == 0))
            .collect();
        self.store.commit_resolution(split.id, &records).await?;

        info!(
            %cik,
            accession = outcome.accession_number.as_deref().unwrap_or_default(),
            score = outcome.score.unwrap_or_default(),
            "Linked split to filing"
        );
        Ok(outcome)
    }

    async fn unresolved(&self, split: &SplitRecord, kind: LinkOutcome) -> Result<SplitOutcome> {
        self.store.record_outcome(split.id, kind).await?;
        Ok(SplitOutcome::new(split.id, split.symbol.clone(), kind))
    }
}

fn stop_requested(shutdown: &watch::Receiver<bool>, deadline: Option<Instant>) -> bool {
    *shutdown.borrow() || deadline.is_some_and(|d| Instant::now() >= d)
}

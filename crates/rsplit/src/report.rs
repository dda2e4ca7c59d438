//! Batch outcome accounting.

use rsplit_core::{LinkOutcome, SplitId, Symbol};
use serde::Serialize;
use std::fmt;

/// What happened to one split during a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SplitOutcome {
    /// The split.
    pub split_id: SplitId,
    /// Its ticker.
    pub symbol: Symbol,
    /// Terminal state of the attempt.
    pub kind: LinkOutcome,
    /// Accession number of the canonical filing, when resolved.
    pub accession_number: Option<String>,
    /// Score of the canonical filing, when resolved.
    pub score: Option<f64>,
    /// Extraction warnings of the canonical filing.
    pub warnings: Vec<String>,
    /// Failure description, when errored.
    pub error: Option<String>,
}

impl SplitOutcome {
    pub(crate) const fn new(split_id: SplitId, symbol: Symbol, kind: LinkOutcome) -> Self {
        Self {
            split_id,
            symbol,
            kind,
            accession_number: None,
            score: None,
            warnings: Vec::new(),
            error: None,
        }
    }
}

/// Summary of one batch run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProcessingReport {
    /// Splits for which an attempt finished.
    pub processed: usize,
    /// Splits linked to a canonical filing.
    pub resolved: usize,
    /// Splits whose candidates all fell below the threshold.
    pub no_qualifying_filing: usize,
    /// Splits whose symbol has no CIK.
    pub cik_not_found: usize,
    /// Splits that failed and stay eligible for the next run.
    pub errored: usize,
    /// Splits left alone because they were already resolved.
    pub skipped: usize,
    /// Splits never started because the batch was cancelled or ran out of time.
    pub cancelled: usize,
    /// Per-split detail, ordered by split id.
    pub outcomes: Vec<SplitOutcome>,
}

impl ProcessingReport {
    /// Adds one split's outcome to the tallies.
    pub fn record(&mut self, outcome: SplitOutcome) {
        match outcome.kind {
            LinkOutcome::Resolved => self.resolved += 1,
            LinkOutcome::NoQualifyingFiling => self.no_qualifying_filing += 1,
            LinkOutcome::CikNotFound => self.cik_not_found += 1,
            LinkOutcome::Errored => self.errored += 1,
            LinkOutcome::Skipped => self.skipped += 1,
        }
        if outcome.kind != LinkOutcome::Skipped {
            self.processed += 1;
        }
        let at = self
            .outcomes
            .partition_point(|o| o.split_id <= outcome.split_id);
        self.outcomes.insert(at, outcome);
    }

    /// Splits attempted but still without a canonical filing.
    #[must_use]
    pub const fn unresolved(&self) -> usize {
        self.no_qualifying_filing + self.cik_not_found + self.errored
    }

    /// True when cancellation or the time budget left splits unstarted.
    #[must_use]
    pub const fn cut_short(&self) -> bool {
        self.cancelled > 0
    }

    /// Looks up the outcome of a split.
    #[must_use]
    pub fn outcome(&self, split_id: SplitId) -> Option<&SplitOutcome> {
        self.outcomes.iter().find(|o| o.split_id == split_id)
    }
}

impl fmt::Display for ProcessingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} resolved={} no_qualifying_filing={} cik_not_found={} errored={} skipped={} cancelled={}",
            self.processed,
            self.resolved,
            self.no_qualifying_filing,
            self.cik_not_found,
            self.errored,
            self.skipped,
            self.cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_tallies_and_orders() {
        let mut report = ProcessingReport::default();
        report.record(SplitOutcome::new(SplitId(3), "CCC".into(), LinkOutcome::Errored));
        report.record(SplitOutcome::new(SplitId(1), "AAA".into(), LinkOutcome::Resolved));
        report.record(SplitOutcome::new(SplitId(2), "BBB".into(), LinkOutcome::Skipped));
        report.record(SplitOutcome::new(SplitId(4), "DDD".into(), LinkOutcome::CikNotFound));

        assert_eq!(report.processed, 3);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.unresolved(), 2);
        let ids: Vec<_> = report.outcomes.iter().map(|o| o.split_id).collect();
        assert_eq!(ids, vec![SplitId(1), SplitId(2), SplitId(3), SplitId(4)]);
        assert_eq!(report.outcome(SplitId(3)).unwrap().kind, LinkOutcome::Errored);
    }

    #[test]
    fn test_display() {
        let mut report = ProcessingReport::default();
        report.record(SplitOutcome::new(SplitId(1), "AAA".into(), LinkOutcome::Resolved));
        assert!(!report.cut_short());
        report.cancelled = 2;
        assert!(report.cut_short());
        assert_eq!(
            report.to_string(),
            "processed=1 resolved=1 no_qualifying_filing=0 cik_not_found=0 errored=0 skipped=0 cancelled=2"
        );
    }
}

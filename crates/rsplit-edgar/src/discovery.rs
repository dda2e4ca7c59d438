//! Candidate filing discovery around a split's effective date.

use chrono::NaiveDate;
use rsplit_core::{Cik, DiscoveryWindow, FetchError, FilingCandidate, FormType, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::fetcher::RateLimitedFetcher;
use crate::wire::{CompanySubmissions, EdgarEndpoints, FilingColumns, SubmissionPage};

/// Ordered candidate filings for one split, fully materialized.
///
/// Closest to the target date first, then earliest filing date, then accession
/// number. Listing pages are fetched eagerly; callers walk the set and fetch
/// documents only as far as they need. Cloning is cheap and every clone
/// iterates from the start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CandidateSet {
    filings: Arc<[FilingCandidate]>,
}

impl CandidateSet {
    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filings.len()
    }

    /// True when no filing qualified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filings.is_empty()
    }

    /// Iterates candidates in priority order.
    pub fn iter(&self) -> std::slice::Iter<'_, FilingCandidate> {
        self.filings.iter()
    }

    /// Candidates as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[FilingCandidate] {
        &self.filings
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a FilingCandidate;
    type IntoIter = std::slice::Iter<'a, FilingCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lists a filer's submissions and keeps the ones that may disclose a split.
#[derive(Debug, Clone)]
pub struct FilingDiscovery {
    fetcher: Arc<RateLimitedFetcher>,
    endpoints: EdgarEndpoints,
}

impl FilingDiscovery {
    /// Creates a discovery client.
    #[must_use]
    pub const fn new(fetcher: Arc<RateLimitedFetcher>, endpoints: EdgarEndpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Finds candidate filings for `cik` inside `window` around `target`.
    ///
    /// A filer the registry does not know (404 or similar) yields an empty set.
    ///
    /// # Errors
    /// Returns the fetch error when the submissions index stays unreachable
    /// after retries, or a parse error when it is malformed.
    #[instrument(skip(self), fields(cik = %cik))]
    pub async fn discover(
        &self,
        cik: Cik,
        target: NaiveDate,
        window: DiscoveryWindow,
    ) -> Result<CandidateSet> {
        let url = self.endpoints.submissions_url(cik);
        let submissions: CompanySubmissions = match self.fetcher.fetch_json(&url).await {
            Ok(submissions) => submissions,
            Err(rsplit_core::SplitError::Fetch(FetchError::Permanent { status, .. })) => {
                debug!(?status, "No submissions index for filer");
                return Ok(CandidateSet::default());
            }
            Err(e) => return Err(e),
        };
        debug!(company = %submissions.name, "Loaded submissions index");

        let (start, end) = window.bounds(target);
        let mut pages = vec![submissions.filings.recent];

        let earliest_recent = pages[0]
            .rows()
            .filter_map(|row| parse_date(row.filing_date))
            .min();
        let needs_older = earliest_recent.is_none_or(|earliest| start < earliest);
        if needs_older {
            for page in &submissions.filings.files {
                if !page_overlaps(page, start, end) {
                    continue;
                }
                let page_url = self.endpoints.submissions_page_url(&page.name);
                match self.fetcher.fetch_json::<FilingColumns>(&page_url).await {
                    Ok(columns) => pages.push(columns),
                    Err(e) => warn!(page = %page.name, error = %e, "Skipping submissions page"),
                }
            }
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for columns in &pages {
            for row in columns.rows() {
                let Some(filing_date) = parse_date(row.filing_date) else {
                    continue;
                };
                if !window.contains(target, filing_date) {
                    continue;
                }
                let form_type = FormType::parse(row.form);
                if !form_type.may_disclose_split() || row.primary_document.trim().is_empty() {
                    continue;
                }
                if !seen.insert(row.accession_number.to_string()) {
                    continue;
                }
                candidates.push(FilingCandidate {
                    cik,
                    accession_number: row.accession_number.to_string(),
                    form_type,
                    filing_date,
                    document_url: self.endpoints.document_url(
                        cik,
                        row.accession_number,
                        row.primary_document,
                    ),
                    items: split_items(row.items),
                });
            }
        }

        sort_candidates(&mut candidates, target);
        debug!(count = candidates.len(), "Discovered candidate filings");
        Ok(CandidateSet {
            filings: candidates.into(),
        })
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Pages without parseable bounds are fetched rather than skipped.
fn page_overlaps(page: &SubmissionPage, start: NaiveDate, end: NaiveDate) -> bool {
    match (parse_date(&page.filing_from), parse_date(&page.filing_to)) {
        (Some(from), Some(to)) => from <= end && start <= to,
        _ => true,
    }
}

fn split_items(items: &str) -> Vec<String> {
    items
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn sort_candidates(candidates: &mut [FilingCandidate], target: NaiveDate) {
    candidates.sort_by(|a, b| {
        let da = (a.filing_date - target).num_days().abs();
        let db = (b.filing_date - target).num_days().abs();
        da.cmp(&db)
            .then(a.filing_date.cmp(&b.filing_date))
            .then_with(|| a.accession_number.cmp(&b.accession_number))
    });
}

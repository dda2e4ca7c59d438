//! Relevance scoring and ranking of candidate filings.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rsplit_core::{DiscoveryWindow, EdgarFilingRecord, FilingCandidate, FormType, SplitId, SplitRecord};
use std::cmp::Ordering;

use crate::extract::{Confidence, ExtractedFacts};

/// 8-K items that accompany a reverse split (charter amendment, share issuance).
const SPLIT_ITEMS: &[&str] = &["5.03", "3.02"];

/// Weights of the relevance components.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreWeights {
    /// 8-K and 6-K.
    pub current_report: f64,
    /// DEF 14A and other proxy or information statements.
    pub proxy: f64,
    /// Registration statements and prospectuses.
    pub registration: f64,
    /// 10-K, 10-Q and 20-F.
    pub periodic: f64,
    /// Extracted ratio equals the split's ratio with high confidence.
    pub ratio_exact: f64,
    /// Ratio agrees only loosely (same direction, or low confidence).
    pub ratio_hint: f64,
    /// Extracted effective date close to the split's.
    pub effective_date_match: f64,
    /// Business days within which an effective date counts as matching.
    pub effective_date_tolerance: u32,
    /// Split-related 8-K item present.
    pub item_match: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            current_report: 1.0,
            proxy: 0.6,
            registration: 0.45,
            periodic: 0.3,
            ratio_exact: 0.3,
            ratio_hint: 0.1,
            effective_date_match: 0.2,
            effective_date_tolerance: 5,
            item_match: 0.1,
        }
    }
}

impl ScoreWeights {
    /// Weight of a form family.
    #[must_use]
    pub fn form_weight(&self, form: &FormType) -> f64 {
        match form {
            FormType::EightK | FormType::SixK => self.current_report,
            FormType::Def14A | FormType::Proxy(_) => self.proxy,
            FormType::Registration(_) => self.registration,
            FormType::TenK | FormType::TenQ | FormType::TwentyF => self.periodic,
            FormType::Other(_) => 0.0,
        }
    }

    /// Highest achievable raw score; proximity contributes at most 1.
    fn max_total(&self) -> f64 {
        let form = self
            .current_report
            .max(self.proxy)
            .max(self.registration)
            .max(self.periodic);
        form + 1.0 + self.ratio_exact.max(self.ratio_hint) + self.effective_date_match + self.item_match
    }
}

/// Pure, deterministic scorer: equal inputs always give bit-identical scores.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelevanceScorer {
    weights: ScoreWeights,
    window: DiscoveryWindow,
}

impl RelevanceScorer {
    /// Creates a scorer with default weights for candidates found in `window`.
    #[must_use]
    pub fn new(window: DiscoveryWindow) -> Self {
        Self {
            weights: ScoreWeights::default(),
            window,
        }
    }

    /// Replaces the weights.
    #[must_use]
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Current weights.
    #[must_use]
    pub const fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Scores `candidate` for `split` in `[0, 1]`.
    ///
    /// Documents without any split evidence (no ratio, no effective date, no
    /// reverse split vocabulary) score zero regardless of form or date.
    #[must_use]
    pub fn score(
        &self,
        candidate: &FilingCandidate,
        facts: &ExtractedFacts,
        split: &SplitRecord,
    ) -> f64 {
        if !facts.has_split_evidence() {
            return 0.0;
        }
        let w = &self.weights;
        let target = split.effective_date;

        let form = w.form_weight(&candidate.form_type);

        let side = self.window.side_days(target, candidate.filing_date);
        let distance = (candidate.filing_date - target).num_days().unsigned_abs() as f64;
        let proximity = if side == 0 {
            if distance == 0.0 { 1.0 } else { 0.0 }
        } else {
            (1.0 - distance / f64::from(side)).max(0.0)
        };

        let ratio = match (&facts.ratio, split.parsed_ratio()) {
            (Some(found), Some(expected)) => {
                if found.ratio == expected && found.confidence == Confidence::High {
                    w.ratio_exact
                } else if found.mentions(&expected) || found.ratio.same_direction(&expected) {
                    w.ratio_hint
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        let effective = facts.effective_date.map_or(0.0, |date| {
            if business_days_between(date, target) <= w.effective_date_tolerance {
                w.effective_date_match
            } else {
                0.0
            }
        });

        let has_item = candidate
            .items
            .iter()
            .chain(facts.items.iter())
            .any(|item| SPLIT_ITEMS.contains(&item.as_str()));
        let items = if has_item { w.item_match } else { 0.0 };

        let total = form + proximity + ratio + effective + items;
        let max = w.max_total();
        if max <= 0.0 {
            return 0.0;
        }
        (total / max).clamp(0.0, 1.0)
    }
}

/// Weekdays strictly after the earlier date, up to and including the later one.
///
/// Friday to the following Monday is one business day. Holidays are not
/// considered.
#[must_use]
pub fn business_days_between(a: NaiveDate, b: NaiveDate) -> u32 {
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    let days = (end - start).num_days();
    let weeks = days / 7;
    let mut count = weeks * 5;
    let mut day = start + Duration::days(weeks * 7);
    while day < end {
        day += Duration::days(1);
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
    }
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// A candidate together with its extracted facts and score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredFiling {
    /// The filing.
    pub candidate: FilingCandidate,
    /// Facts extracted from its document.
    pub facts: ExtractedFacts,
    /// Relevance in `[0, 1]`.
    pub score: f64,
}

impl ScoredFiling {
    /// Converts into the persisted record.
    #[must_use]
    pub fn into_record(self, split_id: SplitId, is_canonical: bool) -> EdgarFilingRecord {
        EdgarFilingRecord {
            split_id,
            cik: self.candidate.cik,
            form_type: self.candidate.form_type.code().to_string(),
            accession_number: self.candidate.accession_number,
            filing_date: self.candidate.filing_date,
            extracted_ratio: self.facts.ratio.map(|r| r.ratio.to_string()),
            extracted_effective_date: self.facts.effective_date,
            announcement_date: self.facts.announcement_date,
            rounding_up_flag: self.facts.rounding_up,
            relevance_score: self.score,
            url: self.candidate.document_url,
            is_canonical,
        }
    }
}

/// Orders filings best first.
///
/// Higher score wins; equal scores go to the earlier filing, then the smaller
/// accession number, so the ranking never depends on input order.
pub fn rank_filings(filings: &mut [ScoredFiling]) {
    filings.sort_by(compare_ranked);
}

fn compare_ranked(a: &ScoredFiling, b: &ScoredFiling) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(a.candidate.filing_date.cmp(&b.candidate.filing_date))
        .then_with(|| a.candidate.accession_number.cmp(&b.candidate.accession_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{RatioFinding, extract_facts};
    use chrono::Utc;
    use rsplit_core::{Cik, SplitRatio, SplitSource, Symbol};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn split(effective: NaiveDate, ratio: &str) -> SplitRecord {
        SplitRecord {
            id: SplitId(1),
            symbol: Symbol::new("ABCD"),
            company_name: None,
            split_ratio: ratio.to_string(),
            effective_date: effective,
            source: SplitSource::StockAnalysis,
            edgar_resolved: false,
            force_reprocess: false,
            edgar_attempts: 0,
            last_outcome: None,
            last_updated: Utc::now(),
        }
    }

    fn candidate(accession: &str, form: FormType, filed: NaiveDate) -> FilingCandidate {
        FilingCandidate {
            cik: Cik::new(1234567).unwrap(),
            accession_number: accession.to_string(),
            form_type: form,
            filing_date: filed,
            document_url: format!("https://www.sec.gov/Archives/{accession}.htm"),
            items: vec![],
        }
    }

    fn facts_with_ratio(ratio: SplitRatio, confidence: Confidence) -> ExtractedFacts {
        ExtractedFacts {
            ratio: Some(RatioFinding {
                ratio,
                confidence,
                alternatives: vec![],
            }),
            ..ExtractedFacts::default()
        }
    }

    #[test]
    fn test_matching_8k_scores_above_threshold() {
        let scorer = RelevanceScorer::default();
        let split = split(date(2024, 3, 1), "1-for-20");
        let facts = extract_facts(
            "ABCD announced a 1-for-20 reverse stock split effective March 1, 2024. No fractional \
             shares will be issued; cash will be paid.",
            date(2024, 2, 28),
        );
        let candidate = candidate("a", FormType::EightK, date(2024, 2, 28));

        let score = scorer.score(&candidate, &facts, &split);
        // form 1.0 + proximity (1 - 2/14) + ratio 0.3 + effective 0.2, over 2.6.
        let expected = (1.0 + (1.0 - 2.0 / 14.0) + 0.3 + 0.2) / 2.6;
        assert!((score - expected).abs() < 1e-12, "{score}");
        assert!(score > 0.3);
    }

    #[test]
    fn test_score_is_deterministic() {
        let scorer = RelevanceScorer::new(DiscoveryWindow::new(10, 15));
        let split = split(date(2024, 2, 22), "1-for-10");
        let facts = facts_with_ratio(SplitRatio::new(1, 8).unwrap(), Confidence::High);
        let candidate = candidate("a", FormType::Def14A, date(2024, 2, 25));

        let first = scorer.score(&candidate, &facts, &split);
        for _ in 0..10 {
            assert_eq!(scorer.score(&candidate, &facts, &split).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn test_ratio_agreement_levels() {
        let scorer = RelevanceScorer::default();
        let split = split(date(2024, 3, 1), "1-for-20");
        let filing = candidate("a", FormType::EightK, date(2024, 3, 1));

        let exact = scorer.score(
            &filing,
            &facts_with_ratio(SplitRatio::new(1, 20).unwrap(), Confidence::High),
            &split,
        );
        let low = scorer.score(
            &filing,
            &facts_with_ratio(SplitRatio::new(1, 20).unwrap(), Confidence::Low),
            &split,
        );
        let direction = scorer.score(
            &filing,
            &facts_with_ratio(SplitRatio::new(1, 10).unwrap(), Confidence::High),
            &split,
        );
        let conflicting = scorer.score(
            &filing,
            &facts_with_ratio(SplitRatio::new(3, 2).unwrap(), Confidence::High),
            &split,
        );

        assert!((exact - 2.3 / 2.6).abs() < 1e-12);
        assert!((low - 2.1 / 2.6).abs() < 1e-12);
        assert_eq!(low.to_bits(), direction.to_bits());
        assert!((conflicting - 2.0 / 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_form_and_distance() {
        let scorer = RelevanceScorer::default();
        let split = split(date(2024, 3, 1), "1-for-20");
        let facts = ExtractedFacts {
            mentions_reverse_split: true,
            ..ExtractedFacts::default()
        };

        let proxy = scorer.score(&candidate("a", FormType::Def14A, date(2024, 3, 1)), &facts, &split);
        assert!((proxy - 1.6 / 2.6).abs() < 1e-12);

        // 30 days after with a 30 day window leaves only the form weight.
        let late = scorer.score(&candidate("b", FormType::TenQ, date(2024, 3, 31)), &facts, &split);
        assert!((late - 0.3 / 2.6).abs() < 1e-12);

        let other = scorer.score(
            &candidate("c", FormType::parse("4"), date(2024, 3, 1)),
            &facts,
            &split,
        );
        assert!((other - 1.0 / 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_items_from_index_or_text() {
        let scorer = RelevanceScorer::default();
        let split = split(date(2024, 3, 1), "1-for-20");
        let facts = ExtractedFacts {
            mentions_reverse_split: true,
            ..ExtractedFacts::default()
        };
        let mut filing = candidate("a", FormType::EightK, date(2024, 3, 1));
        let base = scorer.score(&filing, &facts, &split);

        filing.items = vec!["5.03".into()];
        let with_item = scorer.score(&filing, &facts, &split);
        assert!((with_item - base - 0.1 / 2.6).abs() < 1e-12);
    }

    #[test]
    fn test_no_evidence_scores_zero() {
        let scorer = RelevanceScorer::default();
        let split = split(date(2024, 3, 1), "1-for-20");
        let filing = candidate("a", FormType::EightK, date(2024, 3, 1));
        assert_eq!(scorer.score(&filing, &ExtractedFacts::default(), &split), 0.0);
    }

    #[test]
    fn test_business_days() {
        // Friday to Monday.
        assert_eq!(business_days_between(date(2024, 3, 1), date(2024, 3, 4)), 1);
        assert_eq!(business_days_between(date(2024, 3, 4), date(2024, 3, 1)), 1);
        assert_eq!(business_days_between(date(2024, 3, 1), date(2024, 3, 1)), 0);
        assert_eq!(business_days_between(date(2024, 3, 1), date(2024, 3, 8)), 5);
        assert_eq!(business_days_between(date(2024, 3, 1), date(2024, 3, 11)), 6);
    }

    #[test]
    fn test_ties_go_to_earlier_filing() {
        let scored = |accession: &str, filed: NaiveDate, score: f64| ScoredFiling {
            candidate: candidate(accession, FormType::EightK, filed),
            facts: ExtractedFacts::default(),
            score,
        };
        let mut filings = vec![
            scored("0001-24-000002", date(2024, 2, 25), 0.55),
            scored("0001-24-000009", date(2024, 2, 20), 0.55),
            scored("0001-24-000001", date(2024, 2, 26), 0.40),
        ];
        rank_filings(&mut filings);
        assert_eq!(filings[0].candidate.filing_date, date(2024, 2, 20));
        assert_eq!(filings[1].candidate.filing_date, date(2024, 2, 25));
        assert_eq!(filings[2].score, 0.40);

        let record = filings.remove(0).into_record(SplitId(7), true);
        assert_eq!(record.split_id, SplitId(7));
        assert_eq!(record.accession_number, "0001-24-000009");
        assert_eq!(record.form_type, "8-K");
        assert!(record.is_canonical);
    }
}

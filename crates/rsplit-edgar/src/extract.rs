//! Fact extraction from filing documents.
//!
//! [`ContentExtractor::extract`] downloads a filing and hands its plain text
//! to [`extract_facts`], a pure function that can be tested without network
//! access. Every field of [`ExtractedFacts`] is optional: a document that
//! mentions only some of the facts is still a successful extraction.

use chrono::NaiveDate;
use regex::Regex;
use rsplit_core::{ExtractionError, FilingCandidate, SplitRatio, parse_share_count};
use scraper::{Html, Node};
use std::sync::{Arc, LazyLock};
use tracing::{debug, instrument};

use crate::fetcher::RateLimitedFetcher;

// =============================================================================
// Result types
// =============================================================================

/// How much a ratio finding can be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Confidence {
    /// Single ratio stated next to split vocabulary.
    High,
    /// Ambiguous, out of context, or from the colon fallback.
    Low,
}

/// Ratio found in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatioFinding {
    /// Preferred ratio.
    pub ratio: SplitRatio,
    /// Trust in [`ratio`](Self::ratio).
    pub confidence: Confidence,
    /// Other distinct ratios found in the same document.
    pub alternatives: Vec<SplitRatio>,
}

impl RatioFinding {
    /// True when `ratio` is the preferred ratio or one of the alternatives.
    #[must_use]
    pub fn mentions(&self, ratio: &SplitRatio) -> bool {
        self.ratio == *ratio || self.alternatives.contains(ratio)
    }
}

/// Facts pulled from one filing. Absent facts are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedFacts {
    /// Split ratio.
    pub ratio: Option<RatioFinding>,
    /// Date the split takes effect.
    pub effective_date: Option<NaiveDate>,
    /// Time of day the split takes effect, as written ("12:01 a.m. Eastern Time").
    pub effective_time: Option<String>,
    /// Date the split was announced, never after the filing date.
    pub announcement_date: Option<NaiveDate>,
    /// `Some(true)` when fractional shares are rounded up, `Some(false)` for
    /// cash in lieu or rounding down, `None` when absent or contradictory.
    pub rounding_up: Option<bool>,
    /// Whether reverse split or share consolidation vocabulary occurs.
    pub mentions_reverse_split: bool,
    /// 8-K item numbers referenced in the text, in order of appearance.
    pub items: Vec<String>,
    /// Human readable notes about ambiguous findings.
    pub warnings: Vec<String>,
}

impl ExtractedFacts {
    /// True when the document carries any evidence of a split.
    #[must_use]
    pub const fn has_split_evidence(&self) -> bool {
        self.ratio.is_some() || self.effective_date.is_some() || self.mentions_reverse_split
    }
}

// =============================================================================
// Extractor
// =============================================================================

/// Fetches filing documents and extracts split facts from them.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    fetcher: Arc<RateLimitedFetcher>,
}

impl ContentExtractor {
    /// Creates an extractor sharing `fetcher`.
    #[must_use]
    pub const fn new(fetcher: Arc<RateLimitedFetcher>) -> Self {
        Self { fetcher }
    }

    /// Downloads the candidate's primary document and extracts its facts.
    ///
    /// # Errors
    /// [`ExtractionError::FetchFailed`] when the document cannot be fetched,
    /// [`ExtractionError::UnparseableDocument`] when it holds no text.
    #[instrument(skip(self, candidate), fields(accession = %candidate.accession_number))]
    pub async fn extract(
        &self,
        candidate: &FilingCandidate,
    ) -> Result<ExtractedFacts, ExtractionError> {
        let response = self.fetcher.fetch(&candidate.document_url).await?;
        let text = strip_markup(&response.body);
        if text.is_empty() {
            return Err(ExtractionError::UnparseableDocument {
                url: candidate.document_url.clone(),
                reason: "document contains no text".into(),
            });
        }

        let facts = extract_facts(&text, candidate.filing_date);
        debug!(
            ratio = ?facts.ratio.as_ref().map(|r| r.ratio.to_string()),
            effective_date = ?facts.effective_date,
            rounding_up = ?facts.rounding_up,
            "Extracted filing facts"
        );
        Ok(facts)
    }
}

/// Reduces an HTML (or plain text) document to whitespace-collapsed text.
///
/// Text inside `script`, `style`, `head` and inline XBRL headers is dropped.
#[must_use]
pub fn strip_markup(document: &str) -> String {
    const HIDDEN: &[&str] = &["script", "style", "head", "title", "ix:header"];

    let html = Html::parse_document(document);
    let mut raw = String::with_capacity(document.len() / 2);
    for node in html.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts split facts from plain text filed on `filing_date`.
#[must_use]
pub fn extract_facts(text: &str, filing_date: NaiveDate) -> ExtractedFacts {
    let mut warnings = Vec::new();

    let ratio = find_ratio(text);
    match &ratio {
        Some(finding) if finding.confidence == Confidence::Low => warnings.push(format!(
            "low-confidence ratio {} (alternatives: {})",
            finding.ratio,
            join_ratios(&finding.alternatives)
        )),
        None => warnings.push("no split ratio found".to_string()),
        _ => {}
    }

    let rounding_up = rounding_policy(text, &mut warnings);

    ExtractedFacts {
        ratio,
        effective_date: find_effective_date(text, filing_date),
        effective_time: EFFECTIVE_TIME
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
        announcement_date: find_announcement_date(text, filing_date),
        rounding_up,
        mentions_reverse_split: REVERSE_SPLIT.is_match(text),
        items: find_items(text),
        warnings,
    }
}

fn join_ratios(ratios: &[SplitRatio]) -> String {
    if ratios.is_empty() {
        return "none".to_string();
    }
    ratios
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Patterns
// =============================================================================

const NUMBER_WORDS: &str = "zero|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|\
                            thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty|\
                            thirty|forty|fifty|sixty|seventy|eighty|ninety|hundred|thousand";

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|\
                      november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

fn number_pattern() -> String {
    format!(r"(?:\d{{1,3}}(?:,\d{{3}})+|\d+|(?:{NUMBER_WORDS})(?:[- ](?:and[- ])?(?:{NUMBER_WORDS}))*)")
}

fn compile(pattern: &str) -> Regex {
    // Patterns are compile-time constants covered by the tests below.
    Regex::new(pattern).expect("built-in extraction pattern")
}

/// "1-for-20", "one for twenty", "1 - for - 20".
static RATIO_FOR: LazyLock<Regex> = LazyLock::new(|| {
    let n = number_pattern();
    compile(&format!(r"(?i)\b({n})(?:\s*-\s*|\s+)for(?:\s*-\s*|\s+)({n})\b"))
});

/// "one (1) new share for every twenty (20) shares".
static RATIO_EVERY: LazyLock<Regex> = LazyLock::new(|| {
    let n = number_pattern();
    compile(&format!(
        r"(?i)\b({n})\s+(?:\(\d+\)\s+)?(?:new\s+)?shares?\s+(?:of\s+common\s+stock\s+)?for\s+(?:each|every)\s+({n})\b"
    ))
});

/// "1:20", only trusted next to split vocabulary.
static RATIO_COLON: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{1,3})\s*:\s*(\d{1,4})\b"));

static SPLIT_CONTEXT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)split|reverse|consolidat|ratio"));

static CLOCK_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^\s*(?:a\.?m\b|p\.?m\b|a\.m\.|p\.m\.)"));

static REVERSE_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\breverse\s+(?:stock\s+|share\s+)?split|\b(?:share|stock)\s+consolidation")
});

static EFFECTIVE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\beffective\b"));

static EFFECTIVE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\beffective\b[^.;]{0,60}?\b(\d{1,2}:\d{2}\s*[ap]\.?m\.?(?:\s+(?:eastern|new\s+york\s+city)\s+(?:(?:standard|daylight)\s+)?time)?)",
    )
});

static DATE_MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"))
});

static DATE_DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(r"(?i)\b(\d{{1,2}})\s+({MONTHS})\.?,?\s+(\d{{4}})\b"))
});

static DATE_ISO: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{4})-(\d{2})-(\d{2})\b"));

static DATE_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b"));

static ANNOUNCEMENT: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"\bOn\s+((?i:{MONTHS})\.?\s+\d{{1,2}},?\s+\d{{4}})"
    ))
});

static ITEM: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)\bItem\s+(\d\.\d{2})\b"));

static ROUND_UP: LazyLock<ContextPattern> = LazyLock::new(|| ContextPattern {
    cue: compile(
        r"(?i)\bround(?:ed|ing|s)?\s+(?:up|upward)\b|\bnext\s+(?:higher\s+)?whole\s+share",
    ),
    context: compile(r"(?i)fraction|split|whole\s+share"),
    radius: 300,
});

static ROUND_DOWN: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\bcash\s+(?:payment\s+)?in\s+lieu\b|\bround(?:ed|ing|s)?\s+down(?:ward)?\b|\bsell(?:ing|s)?\s+(?:the\s+|all\s+|such\s+)?fractional|\bfractional\s+(?:shares|interests?)\s+(?:will|shall)\s+be\s+(?:aggregated\s+and\s+)?sold",
    )
});

static NO_FRACTIONAL: LazyLock<ContextPattern> = LazyLock::new(|| ContextPattern {
    cue: compile(r"(?i)\bno\s+fractional\s+shares?\b"),
    context: compile(r"(?i)\bcash\b"),
    radius: 150,
});

/// A cue that only counts when `context` occurs within `radius` bytes of it.
struct ContextPattern {
    cue: Regex,
    context: Regex,
    radius: usize,
}

impl ContextPattern {
    fn is_match_within(&self, text: &str) -> bool {
        self.cue.find_iter(text).any(|m| {
            self.context
                .is_match(around(text, m.start(), m.end(), self.radius))
        })
    }
}

/// Negators that cancel a following round-down cue in the same clause.
/// "no fractional" states a policy rather than a negation and is captured
/// separately so it can be skipped.
static NEGATION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(?:no|not|without|nor|never)\b(\s+fractional)?"));

/// How far back a negator may sit from the cue it cancels.
const NEGATION_REACH: usize = 80;

/// A cue like "no stockholder will receive cash in lieu" or "will not be
/// rounded down".
fn is_negated(text: &str, start: usize) -> bool {
    let mut lo = start.saturating_sub(NEGATION_REACH);
    while !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let head = &text[lo..start];
    let clause = head.rsplit(['.', ';', ',', ':']).next().unwrap_or(head);
    NEGATION
        .captures_iter(clause)
        .any(|caps| caps.get(1).is_none())
}

/// Round-up wins over the bare "no fractional shares ... cash" cue, which is
/// as common in round-up paragraphs as in cash-out ones. An explicit cash-out
/// or round-down next to a round-up cue is flagged as contradictory.
fn rounding_policy(text: &str, warnings: &mut Vec<String>) -> Option<bool> {
    let up = ROUND_UP.is_match_within(text);
    let explicit_down = ROUND_DOWN
        .find_iter(text)
        .any(|m| !is_negated(text, m.start()));
    match (up, explicit_down) {
        (true, false) => Some(true),
        (true, true) => {
            warnings.push("contradictory fractional share treatment".to_string());
            None
        }
        (false, true) => Some(false),
        (false, false) => NO_FRACTIONAL.is_match_within(text).then_some(false),
    }
}

// =============================================================================
// Ratio
// =============================================================================

struct RatioMatch {
    ratio: SplitRatio,
    in_context: bool,
}

fn find_ratio(text: &str) -> Option<RatioFinding> {
    let mut matches: Vec<(usize, RatioMatch)> = Vec::new();
    for pattern in [&*RATIO_FOR, &*RATIO_EVERY] {
        for caps in pattern.captures_iter(text) {
            let (Some(whole), Some(left), Some(right)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if !is_standalone(text, whole.start(), whole.end()) {
                continue;
            }
            let Some(ratio) = plausible_ratio(left.as_str(), right.as_str()) else {
                continue;
            };
            let in_context = SPLIT_CONTEXT.is_match(around(text, whole.start(), whole.end(), 250));
            matches.push((whole.start(), RatioMatch { ratio, in_context }));
        }
    }
    matches.sort_by_key(|(start, _)| *start);

    let preferred: Vec<SplitRatio> = distinct(matches.iter().filter(|(_, m)| m.in_context));
    if let Some((&first, rest)) = preferred.split_first() {
        let others = distinct(matches.iter());
        return Some(RatioFinding {
            ratio: first,
            confidence: if rest.is_empty() {
                Confidence::High
            } else {
                Confidence::Low
            },
            alternatives: others.into_iter().filter(|r| *r != first).collect(),
        });
    }

    let loose = distinct(matches.iter());
    if let Some((&first, rest)) = loose.split_first() {
        return Some(RatioFinding {
            ratio: first,
            confidence: Confidence::Low,
            alternatives: rest.to_vec(),
        });
    }

    find_colon_ratio(text)
}

fn distinct<'a>(matches: impl Iterator<Item = &'a (usize, RatioMatch)>) -> Vec<SplitRatio> {
    let mut out: Vec<SplitRatio> = Vec::new();
    for (_, m) in matches {
        if !out.contains(&m.ratio) {
            out.push(m.ratio);
        }
    }
    out
}

fn find_colon_ratio(text: &str) -> Option<RatioFinding> {
    let mut found: Vec<SplitRatio> = Vec::new();
    for caps in RATIO_COLON.captures_iter(text) {
        let (Some(whole), Some(left), Some(right)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if right.as_str().starts_with('0') || CLOCK_SUFFIX.is_match(&text[whole.end()..]) {
            continue;
        }
        if !is_standalone(text, whole.start(), whole.end())
            || !SPLIT_CONTEXT.is_match(around(text, whole.start(), whole.end(), 40))
        {
            continue;
        }
        if let Some(ratio) = plausible_ratio(left.as_str(), right.as_str()) {
            if !found.contains(&ratio) {
                found.push(ratio);
            }
        }
    }
    let (&first, rest) = found.split_first()?;
    Some(RatioFinding {
        ratio: first,
        confidence: Confidence::Low,
        alternatives: rest.to_vec(),
    })
}

fn plausible_ratio(left: &str, right: &str) -> Option<SplitRatio> {
    let ratio = SplitRatio::new(parse_share_count(left)?, parse_share_count(right)?).ok()?;
    if ratio.is_year_like() || ratio.new_shares == ratio.old_shares {
        return None;
    }
    Some(ratio)
}

/// Rejects matches glued to decimals, amounts or dates ("5.03 for 10").
fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    if before.is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '$' | '/' | ':')) {
        return false;
    }
    let mut after = text[end..].chars();
    match (after.next(), after.next()) {
        (Some('.' | ',' | '/' | ':'), Some(d)) if d.is_ascii_digit() => false,
        (Some('%'), _) => false,
        _ => true,
    }
}

// =============================================================================
// Dates
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct DateMatch {
    start: usize,
    end: usize,
    date: NaiveDate,
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn ymd(year: &str, month: u32, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)
}

/// Parses a single "Month D, YYYY" expression.
fn parse_month_first(s: &str) -> Option<NaiveDate> {
    let caps = DATE_MONTH_FIRST.captures(s)?;
    ymd(&caps[3], month_number(&caps[1])?, &caps[2])
}

/// Every date expression in `text`, in order, without overlaps.
fn find_dates(text: &str) -> Vec<DateMatch> {
    let mut dates = Vec::new();
    let mut push = |caps: &regex::Captures<'_>, date: Option<NaiveDate>| {
        if let (Some(m), Some(date)) = (caps.get(0), date) {
            dates.push(DateMatch {
                start: m.start(),
                end: m.end(),
                date,
            });
        }
    };

    for caps in DATE_MONTH_FIRST.captures_iter(text) {
        let date = month_number(&caps[1]).and_then(|month| ymd(&caps[3], month, &caps[2]));
        push(&caps, date);
    }
    for caps in DATE_DAY_FIRST.captures_iter(text) {
        let date = month_number(&caps[2]).and_then(|month| ymd(&caps[3], month, &caps[1]));
        push(&caps, date);
    }
    for caps in DATE_ISO.captures_iter(text) {
        let date = caps[2]
            .parse()
            .ok()
            .and_then(|month| ymd(&caps[1], month, &caps[3]));
        push(&caps, date);
    }
    for caps in DATE_NUMERIC.captures_iter(text) {
        let date = caps[1]
            .parse()
            .ok()
            .and_then(|month| ymd(&caps[3], month, &caps[2]));
        push(&caps, date);
    }

    dates.sort_by_key(|d| (d.start, std::cmp::Reverse(d.end)));
    let mut out: Vec<DateMatch> = Vec::with_capacity(dates.len());
    for date in dates {
        if out.last().is_none_or(|prev| date.start >= prev.end) {
            out.push(date);
        }
    }
    out
}

/// Tokens scanned on each side of "effective".
const EFFECTIVE_TOKEN_WINDOW: usize = 15;

/// Picks the effective date near the word "effective".
///
/// Dates following "effective" win over dates preceding it. A date directly
/// introduced by "On" usually dates the announcement, so it is only used
/// when nothing else qualifies. Remaining ties go to the date closest to the
/// filing date, then the earlier date.
fn find_effective_date(text: &str, filing_date: NaiveDate) -> Option<NaiveDate> {
    let dates = find_dates(text);
    if dates.is_empty() {
        return None;
    }

    let mut following = Vec::new();
    let mut preceding = Vec::new();
    for m in EFFECTIVE.find_iter(text) {
        let limit_after = tokens_after(text, m.end(), EFFECTIVE_TOKEN_WINDOW);
        let limit_before = tokens_before(text, m.start(), EFFECTIVE_TOKEN_WINDOW);
        for d in &dates {
            if d.start >= m.end() && d.end <= limit_after {
                following.push(*d);
            } else if d.end <= m.start() && d.start >= limit_before {
                preceding.push(*d);
            }
        }
    }

    let tier = if following.is_empty() {
        preceding
    } else {
        following
    };
    let (introduced_by_on, plain): (Vec<DateMatch>, Vec<DateMatch>) =
        tier.into_iter().partition(|d| follows_on(text, d.start));
    let pool = if plain.is_empty() {
        introduced_by_on
    } else {
        plain
    };

    pool.into_iter()
        .map(|d| d.date)
        .min_by_key(|date| ((*date - filing_date).num_days().abs(), *date))
}

fn follows_on(text: &str, start: usize) -> bool {
    text[..start]
        .trim_end()
        .strip_suffix("On")
        .is_some_and(|head| !head.chars().next_back().is_some_and(char::is_alphanumeric))
}

fn find_announcement_date(text: &str, filing_date: NaiveDate) -> Option<NaiveDate> {
    ANNOUNCEMENT
        .captures_iter(text)
        .filter_map(|caps| parse_month_first(caps.get(1)?.as_str()))
        .find(|date| *date <= filing_date)
}

fn find_items(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for caps in ITEM.captures_iter(text) {
        let item = caps[1].to_string();
        if !items.contains(&item) {
            items.push(item);
        }
    }
    items
}

// =============================================================================
// Text windows
// =============================================================================

/// Slice of `text` extending `radius` bytes around `start..end`, widened to
/// character boundaries.
fn around(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let mut lo = start.saturating_sub(radius);
    while !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = end.saturating_add(radius).min(text.len());
    while !text.is_char_boundary(hi) {
        hi += 1;
    }
    &text[lo..hi]
}

/// Byte offset just past the `n`th whitespace-separated token after `from`.
fn tokens_after(text: &str, from: usize, n: usize) -> usize {
    let mut count = 0;
    let mut in_token = false;
    for (i, c) in text[from..].char_indices() {
        if c.is_whitespace() {
            if in_token {
                count += 1;
                in_token = false;
                if count == n {
                    return from + i;
                }
            }
        } else {
            in_token = true;
        }
    }
    text.len()
}

/// Byte offset of the `n`th whitespace-separated token before `to`.
fn tokens_before(text: &str, to: usize, n: usize) -> usize {
    let mut count = 0;
    let mut in_token = false;
    for (i, c) in text[..to].char_indices().rev() {
        if c.is_whitespace() {
            if in_token {
                count += 1;
                in_token = false;
                if count == n {
                    return i + c.len_utf8();
                }
            }
        } else {
            in_token = true;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::TokenBucket;
    use crate::transport::StaticTransport;
    use rsplit_core::{Cik, FormType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ratio(new_shares: u32, old_shares: u32) -> SplitRatio {
        SplitRatio::new(new_shares, old_shares).unwrap()
    }

    const PRESS_RELEASE: &str = "On February 26, 2024, ABCD Therapeutics, Inc. announced a \
        1-for-20 reverse stock split of its common stock, which will become effective at \
        12:01 a.m. Eastern Time on March 1, 2024. No fractional shares will be issued; cash \
        will be paid in lieu of fractional shares. Item 5.03 Amendments to Articles. \
        Item 8.01 Other Events.";

    #[test]
    fn test_press_release_facts() {
        let facts = extract_facts(PRESS_RELEASE, date(2024, 2, 28));

        let finding = facts.ratio.clone().unwrap();
        assert_eq!(finding.ratio, ratio(1, 20));
        assert_eq!(finding.confidence, Confidence::High);
        assert!(finding.alternatives.is_empty());

        assert_eq!(facts.effective_date, Some(date(2024, 3, 1)));
        assert_eq!(facts.effective_time.as_deref(), Some("12:01 a.m. Eastern Time"));
        assert_eq!(facts.announcement_date, Some(date(2024, 2, 26)));
        assert_eq!(facts.rounding_up, Some(false));
        assert!(facts.mentions_reverse_split);
        assert_eq!(facts.items, vec!["5.03", "8.01"]);
        assert!(facts.warnings.is_empty());
        assert!(facts.has_split_evidence());
    }

    #[test]
    fn test_spelled_out_ratio() {
        let facts = extract_facts(
            "Stockholders approved a reverse split at a ratio of one-for-twenty-five.",
            date(2024, 1, 1),
        );
        assert_eq!(facts.ratio.unwrap().ratio, ratio(1, 25));

        let facts = extract_facts(
            "each holder will receive one (1) new share for every fifty (50) shares held \
             following the share consolidation",
            date(2024, 1, 1),
        );
        assert_eq!(facts.ratio.unwrap().ratio, ratio(1, 50));
    }

    #[test]
    fn test_year_like_and_decimals_rejected() {
        let facts = extract_facts(
            "Revenue for fiscal 2023 for 2024 comparison; the split discussion under \
             Item 5.03 for 10 days.",
            date(2024, 1, 1),
        );
        assert!(facts.ratio.is_none());
        assert!(facts.warnings.iter().any(|w| w.contains("no split ratio")));
    }

    #[test]
    fn test_multiple_ratios_are_low_confidence() {
        let facts = extract_facts(
            "The Board may effect a reverse stock split at a ratio of 1-for-10 or 1-for-20, \
             in its discretion.",
            date(2024, 1, 1),
        );
        let finding = facts.ratio.unwrap();
        assert_eq!(finding.confidence, Confidence::Low);
        assert_eq!(finding.ratio, ratio(1, 10));
        assert_eq!(finding.alternatives, vec![ratio(1, 20)]);
        assert!(finding.mentions(&ratio(1, 20)));
        assert_eq!(facts.warnings.len(), 1);
    }

    #[test]
    fn test_colon_fallback() {
        let facts = extract_facts(
            "The reverse split ratio is 1:15. The meeting starts at 10:30 a.m. and ends by 12:01.",
            date(2024, 1, 1),
        );
        let finding = facts.ratio.unwrap();
        assert_eq!(finding.ratio, ratio(1, 15));
        assert_eq!(finding.confidence, Confidence::Low);

        let facts = extract_facts("The meeting starts at 10:30 a.m. sharp.", date(2024, 1, 1));
        assert!(facts.ratio.is_none());
    }

    #[test]
    fn test_effective_date_closest_to_filing() {
        let facts = extract_facts(
            "The split will be effective on either March 1, 2024 or March 15, 2024.",
            date(2024, 3, 10),
        );
        assert_eq!(facts.effective_date, Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_effective_date_formats() {
        let cases = [
            ("effective as of 2024-03-01.", date(2024, 3, 1)),
            ("effective 3/1/2024.", date(2024, 3, 1)),
            ("effective on 1 March 2024.", date(2024, 3, 1)),
            ("EFFECTIVE MARCH 1ST, 2024.", date(2024, 3, 1)),
            ("effective Sept. 3, 2024.", date(2024, 9, 3)),
        ];
        for (text, expected) in cases {
            let facts = extract_facts(text, date(2024, 3, 1));
            assert_eq!(facts.effective_date, Some(expected), "{text}");
        }
    }

    #[test]
    fn test_on_dates_are_a_last_resort() {
        let facts = extract_facts(
            "On February 20, 2024, and as of February 23, 2024 the reverse split is effective.",
            date(2024, 2, 21),
        );
        assert_eq!(facts.effective_date, Some(date(2024, 2, 23)));

        let facts = extract_facts(
            "On March 4, 2024, the reverse split became effective.",
            date(2024, 3, 5),
        );
        assert_eq!(facts.effective_date, Some(date(2024, 3, 4)));
    }

    #[test]
    fn test_distant_dates_are_ignored() {
        let facts = extract_facts(
            "The split became effective. Unrelated matters one two three four five six seven \
             eight nine ten eleven twelve thirteen fourteen fifteen sixteen on March 9, 2024.",
            date(2024, 3, 10),
        );
        assert_eq!(facts.effective_date, None);
    }

    #[test]
    fn test_announcement_never_after_filing() {
        let facts = extract_facts("On April 2, 2024, the company will vote.", date(2024, 3, 1));
        assert_eq!(facts.announcement_date, None);
    }

    #[test]
    fn test_rounding_policy() {
        let up = extract_facts(
            "Any fractional shares resulting from the reverse split will be rounded up to the \
             nearest whole share.",
            date(2024, 1, 1),
        );
        assert_eq!(up.rounding_up, Some(true));

        let down = extract_facts(
            "Stockholders will receive a cash payment in lieu of any fractional share.",
            date(2024, 1, 1),
        );
        assert_eq!(down.rounding_up, Some(false));

        let both = extract_facts(
            "Fractional shares will be rounded up, and the transfer agent will pay cash in lieu \
             of fractional shares.",
            date(2024, 1, 1),
        );
        assert_eq!(both.rounding_up, None);
        assert!(both.warnings.iter().any(|w| w.contains("contradictory")));

        let silent = extract_facts("The annual meeting was held.", date(2024, 1, 1));
        assert_eq!(silent.rounding_up, None);
        assert!(!silent.has_split_evidence());
    }

    #[test]
    fn test_round_up_with_no_cash_in_lieu() {
        let facts = extract_facts(
            "No fractional shares will be issued in connection with the reverse stock split. \
             Instead, any fractional share will be rounded up to the nearest whole share, and no \
             stockholder will receive cash in lieu of fractional shares.",
            date(2024, 1, 1),
        );
        assert_eq!(facts.rounding_up, Some(true));
        assert!(!facts.warnings.iter().any(|w| w.contains("contradictory")));

        let without = extract_facts(
            "Fractional shares will be rounded up to the next whole share without any cash in \
             lieu payment; holders will not receive cash in lieu of fractional shares.",
            date(2024, 1, 1),
        );
        assert_eq!(without.rounding_up, Some(true));
    }

    #[test]
    fn test_fractional_shares_sold_for_proceeds() {
        let facts = extract_facts(
            "Fractional shares will be aggregated and sold by the exchange agent, and the net \
             proceeds distributed pro rata to holders otherwise entitled to a fraction.",
            date(2024, 1, 1),
        );
        assert_eq!(facts.rounding_up, Some(false));

        let no_fraction = extract_facts(
            "No fractional shares will be issued and holders will receive cash for any fraction.",
            date(2024, 1, 1),
        );
        assert_eq!(no_fraction.rounding_up, Some(false));

        let not_rounded_down = extract_facts(
            "Fractional shares will not be rounded down.",
            date(2024, 1, 1),
        );
        assert_eq!(not_rounded_down.rounding_up, None);
    }

    #[test]
    fn test_strip_markup() {
        let html = "<html><head><title>T</title><style>p { color: red }</style></head>\
                    <body><p>1-for-20</p><script>var x = 1;</script>\
                    <p>reverse&nbsp;split</p></body></html>";
        assert_eq!(strip_markup(html), "1-for-20 reverse split");
        assert_eq!(strip_markup("plain   text\n here"), "plain text here");
        assert_eq!(strip_markup("<html><body> </body></html>"), "");
    }

    #[test]
    fn test_around_respects_char_boundaries() {
        let text = "ééééé split ééééé";
        let window = around(text, 11, 16, 4);
        assert_eq!(window, "é split é");
    }

    fn candidate(url: &str) -> FilingCandidate {
        FilingCandidate {
            cik: Cik::new(1234567).unwrap(),
            accession_number: "0001234567-24-000011".into(),
            form_type: FormType::EightK,
            filing_date: date(2024, 2, 28),
            document_url: url.into(),
            items: vec![],
        }
    }

    fn extractor(transport: &Arc<StaticTransport>) -> ContentExtractor {
        let fetcher = RateLimitedFetcher::new(
            Arc::clone(transport) as Arc<dyn crate::transport::HttpTransport>,
            Arc::new(TokenBucket::new(10)),
            "rsplit-tests/0.1 (ops@example.com)",
        )
        .unwrap()
        .with_retry(crate::fetcher::RetryPolicy::none());
        ContentExtractor::new(Arc::new(fetcher))
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_fetches_document() {
        let url = "https://www.sec.gov/Archives/edgar/data/1234567/000123456724000011/split.htm";
        let transport = Arc::new(StaticTransport::new());
        transport.respond(url, 200, format!("<html><body><p>{PRESS_RELEASE}</p></body></html>"));

        let facts = extractor(&transport).extract(&candidate(url)).await.unwrap();
        assert_eq!(facts.ratio.unwrap().ratio, ratio(1, 20));
        assert_eq!(facts.rounding_up, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_hard_failures() {
        let missing = "https://www.sec.gov/Archives/edgar/data/1/missing.htm";
        let empty = "https://www.sec.gov/Archives/edgar/data/1/empty.htm";
        let transport = Arc::new(StaticTransport::new());
        transport.respond(empty, 200, "<html><body></body></html>");

        let extractor = extractor(&transport);
        assert!(matches!(
            extractor.extract(&candidate(missing)).await,
            Err(ExtractionError::FetchFailed(_))
        ));
        assert!(matches!(
            extractor.extract(&candidate(empty)).await,
            Err(ExtractionError::UnparseableDocument { .. })
        ));
    }
}

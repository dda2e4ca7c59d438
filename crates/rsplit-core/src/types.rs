//! Core data types for reverse split tracking.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`Cik`] - EDGAR Central Index Key
//! - [`SplitRatio`] - Parsed "new-for-old" share ratio
//! - [`SplitRecord`] - One observed reverse split event
//! - [`CikMapping`] - Cached symbol to CIK resolution
//! - [`FormType`] - EDGAR filing form classification
//! - [`FilingCandidate`] - A filing under consideration for a split
//! - [`EdgarFilingRecord`] - A persisted, scored filing link
//! - [`DiscoveryWindow`] - Date window around a split's effective date

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SplitError;

/// Default lifetime of a cached CIK mapping.
pub const DEFAULT_CIK_TTL: Duration = Duration::from_secs(60 * 60);

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ticker reduced to ASCII alphanumerics, so `BRK.B`, `brk-b` and `BRKB`
    /// compare equal.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize_ticker(&self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Uppercases a ticker and strips everything but ASCII letters and digits.
#[must_use]
pub fn normalize_ticker(ticker: &str) -> String {
    ticker
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Store-assigned identifier of a [`SplitRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SplitId(pub i64);

impl fmt::Display for SplitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// EDGAR Central Index Key.
///
/// Displayed zero-padded to ten digits, the form used by the submissions API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cik(u64);

impl Cik {
    /// Largest value representable in ten digits.
    pub const MAX: u64 = 9_999_999_999;

    /// Creates a CIK from its numeric value.
    ///
    /// # Errors
    /// Returns an error if the value is zero or exceeds ten digits.
    pub fn new(value: u64) -> crate::Result<Self> {
        if value == 0 || value > Self::MAX {
            return Err(SplitError::InvalidParameter(format!(
                "CIK out of range: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Numeric value, as used in archive paths.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Ten-digit zero-padded form.
    #[must_use]
    pub fn padded(self) -> String {
        format!("{:0>10}", self.0)
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0>10}", self.0)
    }
}

impl FromStr for Cik {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("CIK")
            .or_else(|| trimmed.strip_prefix("cik"))
            .unwrap_or(trimmed);
        let value = digits
            .parse::<u64>()
            .map_err(|e| SplitError::Parse(format!("Invalid CIK {s:?}: {e}")))?;
        Self::new(value)
    }
}

// =============================================================================
// Split ratios
// =============================================================================

/// A share ratio expressed as `new_shares`-for-`old_shares`.
///
/// A 1-for-20 reverse split turns twenty old shares into one new share.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SplitRatio {
    /// Shares held after the split.
    pub new_shares: u32,
    /// Shares held before the split.
    pub old_shares: u32,
}

impl SplitRatio {
    /// Creates a ratio.
    ///
    /// # Errors
    /// Returns an error if either side is zero.
    pub fn new(new_shares: u32, old_shares: u32) -> crate::Result<Self> {
        if new_shares == 0 || old_shares == 0 {
            return Err(SplitError::InvalidParameter(format!(
                "degenerate split ratio {new_shares}-for-{old_shares}"
            )));
        }
        Ok(Self {
            new_shares,
            old_shares,
        })
    }

    /// True when fewer shares exist after the split.
    #[must_use]
    pub const fn is_reverse(&self) -> bool {
        self.new_shares < self.old_shares
    }

    /// True when both ratios consolidate, or both expand, the share count.
    #[must_use]
    pub fn same_direction(&self, other: &Self) -> bool {
        self.new_shares.cmp(&self.old_shares) == other.new_shares.cmp(&other.old_shares)
    }

    /// True when both sides look like calendar years ("2023-for-2024" in a
    /// fiscal comparison), which is never a real split ratio.
    #[must_use]
    pub fn is_year_like(&self) -> bool {
        let year = 1900..=2100;
        year.contains(&self.new_shares) && year.contains(&self.old_shares)
    }
}

impl fmt::Display for SplitRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-for-{}", self.new_shares, self.old_shares)
    }
}

impl FromStr for SplitRatio {
    type Err = SplitError;

    /// Accepts `1-for-20`, `1 for 20`, `one-for-twenty`, `1:20` and `1/20`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let unified = lowered
            .replace("-for-", ":")
            .replace(" for ", ":")
            .replace('/', ":");
        let mut parts = unified.split(':');
        let (Some(left), Some(right), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(SplitError::Parse(format!("Unrecognized split ratio: {s:?}")));
        };
        let new_shares = parse_share_count(left)
            .ok_or_else(|| SplitError::Parse(format!("Unrecognized split ratio: {s:?}")))?;
        let old_shares = parse_share_count(right)
            .ok_or_else(|| SplitError::Parse(format!("Unrecognized split ratio: {s:?}")))?;
        Self::new(new_shares, old_shares)
    }
}

/// Parses a share count written as digits (`"1,000"`) or English words
/// (`"one"`, `"twenty-five"`, `"one hundred"`).
#[must_use]
pub fn parse_share_count(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.chars().all(|c| c.is_ascii_digit() || c == ',') {
        return text.replace(',', "").parse().ok();
    }

    let mut total: u32 = 0;
    let mut current: u32 = 0;
    let mut seen = false;
    for word in text
        .split(|c: char| c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_ascii_lowercase();
        match word.as_str() {
            "and" if seen => {}
            "hundred" => current = current.max(1).checked_mul(100)?,
            "thousand" => {
                total = total.checked_add(current.max(1).checked_mul(1000)?)?;
                current = 0;
            }
            other => current = current.checked_add(small_number(other)?)?,
        }
        seen = true;
    }
    if seen {
        total.checked_add(current)
    } else {
        None
    }
}

fn small_number(word: &str) -> Option<u32> {
    let value = match word {
        "zero" => 0,
        "one" | "a" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

// =============================================================================
// Split records
// =============================================================================

/// Collector that first reported a split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitSource {
    /// stockanalysis.com
    StockAnalysis,
    /// tipranks.com
    TipRanks,
    /// hedgefollow.com
    HedgeFollow,
    /// Entered by hand.
    Manual,
}

impl SplitSource {
    /// Stable storage label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StockAnalysis => "stockanalysis",
            Self::TipRanks => "tipranks",
            Self::HedgeFollow => "hedgefollow",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for SplitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitSource {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stockanalysis" => Ok(Self::StockAnalysis),
            "tipranks" => Ok(Self::TipRanks),
            "hedgefollow" => Ok(Self::HedgeFollow),
            "manual" => Ok(Self::Manual),
            other => Err(SplitError::Parse(format!("Unknown split source: {other}"))),
        }
    }
}

/// Terminal state of one split's most recent linking attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkOutcome {
    /// A canonical filing was linked.
    Resolved,
    /// Candidates were examined but none cleared the acceptance threshold.
    NoQualifyingFiling,
    /// The symbol has no discoverable CIK.
    CikNotFound,
    /// A per-split failure; the split stays eligible for the next run.
    Errored,
    /// Already resolved and not forced, so nothing was done.
    Skipped,
}

impl LinkOutcome {
    /// Stable storage label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::NoQualifyingFiling => "no_qualifying_filing",
            Self::CikNotFound => "cik_not_found",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkOutcome {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resolved" => Ok(Self::Resolved),
            "no_qualifying_filing" => Ok(Self::NoQualifyingFiling),
            "cik_not_found" => Ok(Self::CikNotFound),
            "errored" => Ok(Self::Errored),
            "skipped" => Ok(Self::Skipped),
            other => Err(SplitError::Parse(format!("Unknown link outcome: {other}"))),
        }
    }
}

/// A split as reported by a collector, before it has a store identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSplitRecord {
    /// Ticker.
    pub symbol: Symbol,
    /// Company name, when the collector knows it.
    pub company_name: Option<String>,
    /// Ratio as reported, e.g. `"1-for-20"`.
    pub split_ratio: String,
    /// Date the split takes effect.
    pub effective_date: NaiveDate,
    /// Reporting collector.
    pub source: SplitSource,
}

impl NewSplitRecord {
    /// Creates a record with no company name.
    #[must_use]
    pub fn new(
        symbol: impl Into<Symbol>,
        split_ratio: impl Into<String>,
        effective_date: NaiveDate,
        source: SplitSource,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: None,
            split_ratio: split_ratio.into(),
            effective_date,
            source,
        }
    }

    /// Sets the company name.
    #[must_use]
    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }
}

/// One reverse split event, unique per (`symbol`, `effective_date`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRecord {
    /// Store identity.
    pub id: SplitId,
    /// Ticker.
    pub symbol: Symbol,
    /// Company name, when known.
    pub company_name: Option<String>,
    /// Ratio as reported by the collector.
    pub split_ratio: String,
    /// Date the split takes effect.
    pub effective_date: NaiveDate,
    /// Reporting collector.
    pub source: SplitSource,
    /// True once a canonical filing is linked.
    pub edgar_resolved: bool,
    /// Requests another linking pass even when resolved.
    pub force_reprocess: bool,
    /// Number of linking attempts so far.
    pub edgar_attempts: u32,
    /// Outcome of the latest attempt.
    pub last_outcome: Option<LinkOutcome>,
    /// Last modification time.
    pub last_updated: DateTime<Utc>,
}

impl SplitRecord {
    /// The collector's ratio, parsed. `None` when it is unreadable.
    #[must_use]
    pub fn parsed_ratio(&self) -> Option<SplitRatio> {
        self.split_ratio.parse().ok()
    }

    /// True when the link writer should look at this split.
    #[must_use]
    pub const fn needs_linking(&self) -> bool {
        !self.edgar_resolved || self.force_reprocess
    }
}

/// Cached resolution of a symbol to its CIK.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CikMapping {
    /// Ticker the mapping was resolved for.
    pub symbol: Symbol,
    /// Resolved key.
    pub cik: Cik,
    /// Registrant name from the ticker index.
    pub company_name: Option<String>,
    /// When the mapping was produced.
    pub resolved_at: DateTime<Utc>,
    /// How long the mapping may be trusted.
    pub ttl: Duration,
}

impl CikMapping {
    /// Creates a mapping resolved now with the default TTL.
    #[must_use]
    pub fn new(symbol: Symbol, cik: Cik) -> Self {
        Self {
            symbol,
            cik,
            company_name: None,
            resolved_at: Utc::now(),
            ttl: DEFAULT_CIK_TTL,
        }
    }

    /// Sets the registrant name.
    #[must_use]
    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    /// Overrides the TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// True when the mapping is older than its TTL at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let ttl = ChronoDuration::from_std(self.ttl).unwrap_or(ChronoDuration::MAX);
        now.signed_duration_since(self.resolved_at) >= ttl
    }

    /// True when the mapping is older than its TTL.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

// =============================================================================
// Filings
// =============================================================================

/// EDGAR form classification, amendments folded into their base form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// Current report.
    EightK,
    /// Foreign private issuer current report.
    SixK,
    /// Definitive proxy statement.
    Def14A,
    /// Other proxy or information statements (PRE 14A, DEFA14A, DEF 14C, ...).
    Proxy(String),
    /// Registration statements and prospectuses (S-1, S-3, 424B3, ...).
    Registration(String),
    /// Annual report.
    TenK,
    /// Quarterly report.
    TenQ,
    /// Foreign private issuer annual report.
    TwentyF,
    /// Anything else.
    Other(String),
}

impl FormType {
    /// Classifies a raw EDGAR form code.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        let upper = code.trim().to_ascii_uppercase();
        let base = upper.strip_suffix("/A").unwrap_or(&upper).trim();
        match base {
            "8-K" => Self::EightK,
            "6-K" => Self::SixK,
            "DEF 14A" => Self::Def14A,
            "10-K" => Self::TenK,
            "10-Q" => Self::TenQ,
            "20-F" => Self::TwentyF,
            "PRE 14A" | "DEFA14A" | "DEFM14A" | "DEF 14C" | "PRE 14C" | "DEFR14A" => {
                Self::Proxy(base.to_string())
            }
            "S-1" | "S-3" | "F-1" | "F-3" | "424B3" | "424B4" | "424B5" | "FWP" => {
                Self::Registration(base.to_string())
            }
            _ => Self::Other(upper),
        }
    }

    /// Canonical form code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::EightK => "8-K",
            Self::SixK => "6-K",
            Self::Def14A => "DEF 14A",
            Self::TenK => "10-K",
            Self::TenQ => "10-Q",
            Self::TwentyF => "20-F",
            Self::Proxy(code) | Self::Registration(code) | Self::Other(code) => code,
        }
    }

    /// True for form families known to carry split disclosures.
    #[must_use]
    pub const fn may_disclose_split(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// True for annual and quarterly reports, which only serve as fallback.
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        matches!(self, Self::TenK | Self::TenQ | Self::TwentyF)
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One EDGAR filing under consideration for a split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingCandidate {
    /// Filer.
    pub cik: Cik,
    /// Unique filing identifier, e.g. `0001234567-24-000012`.
    pub accession_number: String,
    /// Form classification.
    pub form_type: FormType,
    /// Date the filing was accepted.
    pub filing_date: NaiveDate,
    /// Primary document URL.
    pub document_url: String,
    /// 8-K item numbers declared in the index, e.g. `["5.03", "8.01"]`.
    pub items: Vec<String>,
}

/// Persisted, scored link between a split and one filing.
///
/// Unique per (`split_id`, `accession_number`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgarFilingRecord {
    /// Split this filing documents.
    pub split_id: SplitId,
    /// Filer.
    pub cik: Cik,
    /// Unique filing identifier.
    pub accession_number: String,
    /// Form code.
    pub form_type: String,
    /// Date the filing was accepted.
    pub filing_date: NaiveDate,
    /// Ratio found in the document, normalized to `N-for-M`.
    pub extracted_ratio: Option<String>,
    /// Effective date found in the document.
    pub extracted_effective_date: Option<NaiveDate>,
    /// Date the split was announced, when stated.
    pub announcement_date: Option<NaiveDate>,
    /// `Some(true)` for round-up, `Some(false)` for cash in lieu, `None` if unknown.
    pub rounding_up_flag: Option<bool>,
    /// Relevance in `[0, 1]`.
    pub relevance_score: f64,
    /// Primary document URL.
    pub url: String,
    /// True for the single authoritative link of the split.
    pub is_canonical: bool,
}

/// A split joined with its canonical filing, as read by dashboards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkedSplit {
    /// The split.
    pub split: SplitRecord,
    /// Its canonical filing, when resolved.
    pub canonical: Option<EdgarFilingRecord>,
}

/// Date window searched around a split's effective date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryWindow {
    /// Days searched before the target date.
    pub before_days: u32,
    /// Days searched after the target date.
    pub after_days: u32,
}

impl Default for DiscoveryWindow {
    fn default() -> Self {
        Self {
            before_days: 14,
            after_days: 30,
        }
    }
}

impl DiscoveryWindow {
    /// Creates a window.
    #[must_use]
    pub const fn new(before_days: u32, after_days: u32) -> Self {
        Self {
            before_days,
            after_days,
        }
    }

    /// Inclusive `(start, end)` dates around `target`.
    #[must_use]
    pub fn bounds(&self, target: NaiveDate) -> (NaiveDate, NaiveDate) {
        (
            target
                .checked_sub_signed(ChronoDuration::days(i64::from(self.before_days)))
                .unwrap_or(NaiveDate::MIN),
            target
                .checked_add_signed(ChronoDuration::days(i64::from(self.after_days)))
                .unwrap_or(NaiveDate::MAX),
        )
    }

    /// True when `date` lies within the inclusive window around `target`.
    #[must_use]
    pub fn contains(&self, target: NaiveDate, date: NaiveDate) -> bool {
        let (start, end) = self.bounds(target);
        start <= date && date <= end
    }

    /// Length of the window side `date` falls on.
    #[must_use]
    pub fn side_days(&self, target: NaiveDate, date: NaiveDate) -> u32 {
        if date < target {
            self.before_days
        } else {
            self.after_days
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_symbol_creation() {
        let symbol = Symbol::new("abcd");
        assert_eq!(symbol.as_str(), "ABCD");
        assert_eq!(Symbol::new("brk.b").normalized(), "BRKB");
        assert_eq!(Symbol::new("BRK-B").normalized(), "BRKB");
    }

    #[test]
    fn test_cik_padding() {
        let cik = Cik::new(320193).unwrap();
        assert_eq!(cik.to_string(), "0000320193");
        assert_eq!(cik.padded().len(), 10);
        assert_eq!("CIK0000320193".parse::<Cik>().unwrap(), cik);
        assert!(Cik::new(0).is_err());
        assert!("abc".parse::<Cik>().is_err());
    }

    #[test]
    fn test_split_ratio_forms() {
        let expected = SplitRatio::new(1, 20).unwrap();
        for text in ["1-for-20", "1 for 20", "one-for-twenty", "1:20", "1/20", " One-For-Twenty "] {
            assert_eq!(text.parse::<SplitRatio>().unwrap(), expected, "{text}");
        }
        assert_eq!(expected.to_string(), "1-for-20");
        assert!(expected.is_reverse());
        assert!("1-for-0".parse::<SplitRatio>().is_err());
        assert!("reverse".parse::<SplitRatio>().is_err());
    }

    #[test]
    fn test_split_ratio_direction_and_years() {
        let reverse = SplitRatio::new(1, 10).unwrap();
        let other_reverse = SplitRatio::new(1, 25).unwrap();
        let forward = SplitRatio::new(2, 1).unwrap();
        assert!(reverse.same_direction(&other_reverse));
        assert!(!reverse.same_direction(&forward));
        assert!(SplitRatio::new(2023, 2024).unwrap().is_year_like());
        assert!(!reverse.is_year_like());
    }

    #[test]
    fn test_parse_share_count_words() {
        assert_eq!(parse_share_count("twenty-five"), Some(25));
        assert_eq!(parse_share_count("one hundred"), Some(100));
        assert_eq!(parse_share_count("two hundred and fifty"), Some(250));
        assert_eq!(parse_share_count("1,000"), Some(1000));
        assert_eq!(parse_share_count("many"), None);
        assert_eq!(parse_share_count(""), None);
    }

    #[test]
    fn test_form_type_classification() {
        assert_eq!(FormType::parse("8-K"), FormType::EightK);
        assert_eq!(FormType::parse("8-k/a"), FormType::EightK);
        assert_eq!(FormType::parse("DEF 14A"), FormType::Def14A);
        assert_eq!(FormType::parse("PRE 14C"), FormType::Proxy("PRE 14C".into()));
        assert_eq!(FormType::parse("424B5"), FormType::Registration("424B5".into()));
        assert!(FormType::parse("10-Q").is_periodic());
        assert!(!FormType::parse("4").may_disclose_split());
        assert_eq!(FormType::parse("SC 13G").code(), "SC 13G");
    }

    #[test]
    fn test_discovery_window_is_inclusive() {
        let window = DiscoveryWindow::default();
        let target = date(2024, 3, 1);
        assert!(window.contains(target, date(2024, 2, 16)));
        assert!(!window.contains(target, date(2024, 2, 15)));
        assert!(window.contains(target, date(2024, 3, 31)));
        assert!(!window.contains(target, date(2024, 4, 1)));
        assert_eq!(window.side_days(target, date(2024, 2, 20)), 14);

        let huge = DiscoveryWindow::new(u32::MAX, u32::MAX);
        assert_eq!(huge.bounds(target), (NaiveDate::MIN, NaiveDate::MAX));
        assert!(huge.contains(target, date(1900, 1, 1)));
        assert_eq!(window.side_days(target, date(2024, 3, 5)), 30);
        assert_eq!(window.side_days(target, target), 30);
    }

    #[test]
    fn test_cik_mapping_expiry() {
        let mapping = CikMapping::new(Symbol::new("ABCD"), Cik::new(1).unwrap())
            .with_ttl(Duration::from_secs(60));
        let later = mapping.resolved_at + ChronoDuration::seconds(61);
        assert!(!mapping.is_expired_at(mapping.resolved_at));
        assert!(mapping.is_expired_at(later));
    }

    #[test]
    fn test_labels_round_trip() {
        for outcome in [
            LinkOutcome::Resolved,
            LinkOutcome::NoQualifyingFiling,
            LinkOutcome::CikNotFound,
            LinkOutcome::Errored,
            LinkOutcome::Skipped,
        ] {
            assert_eq!(outcome.as_str().parse::<LinkOutcome>().unwrap(), outcome);
        }
        assert_eq!("TipRanks".parse::<SplitSource>().unwrap(), SplitSource::TipRanks);
    }
}

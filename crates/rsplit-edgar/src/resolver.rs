//! Symbol and company-name resolution to EDGAR CIKs.

use rsplit_core::{
    Cik, CikMapping, DEFAULT_CIK_TTL, Result, SplitError, SplitStore, Symbol, normalize_ticker,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::fetcher::RateLimitedFetcher;
use crate::wire::{CompanyTickerInfo, EdgarEndpoints};

/// Trailing tokens dropped from company names before matching.
const NAME_SUFFIXES: &[&str] = &[
    "INC",
    "INCORPORATED",
    "CORP",
    "CORPORATION",
    "CO",
    "COMPANY",
    "LLC",
    "LP",
    "LTD",
    "LIMITED",
    "PLC",
    "HOLDINGS",
    "HOLDING",
    "GROUP",
    "SA",
    "NV",
    "AG",
];

/// Shortest normalized name allowed to take part in a substring match.
const MIN_SUBSTRING_LEN: usize = 4;

/// Uppercases, replaces punctuation with spaces, and drops legal suffixes.
///
/// `"Acme Widgets, Inc."` and `"ACME WIDGETS CORP"` both become `"ACME WIDGETS"`.
#[must_use]
pub fn normalize_company_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '&' {
                c.to_ascii_uppercase()
            } else {
                ' '
            }
        })
        .collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| NAME_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    if tokens.len() > 1 && tokens[0] == "THE" {
        tokens.remove(0);
    }
    tokens.join(" ")
}

#[derive(Debug, Clone)]
struct IndexEntry {
    cik: Cik,
    title: String,
}

/// In-memory form of `company_tickers.json`.
#[derive(Debug)]
struct TickerIndex {
    fetched_at: Instant,
    by_ticker: HashMap<String, IndexEntry>,
    by_name: Vec<(String, IndexEntry)>,
}

impl TickerIndex {
    fn build(raw: HashMap<String, CompanyTickerInfo>) -> Self {
        let mut by_ticker = HashMap::with_capacity(raw.len());
        let mut by_name = Vec::with_capacity(raw.len());

        for info in raw.into_values() {
            let Ok(cik) = Cik::new(info.cik_str) else {
                continue;
            };
            let entry = IndexEntry {
                cik,
                title: info.title.clone(),
            };
            // Several tickers can share a CIK; a ticker maps to one CIK. Keep the
            // smallest CIK on collisions so rebuilds are deterministic.
            by_ticker
                .entry(normalize_ticker(&info.ticker))
                .and_modify(|e: &mut IndexEntry| {
                    if cik < e.cik {
                        *e = entry.clone();
                    }
                })
                .or_insert_with(|| entry.clone());
            by_name.push((normalize_company_name(&info.title), entry));
        }
        by_name.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cik.cmp(&b.1.cik)));
        by_name.dedup_by(|a, b| a.0 == b.0 && a.1.cik == b.1.cik);

        Self {
            fetched_at: Instant::now(),
            by_ticker,
            by_name,
        }
    }

    fn by_ticker(&self, symbol: &Symbol) -> Option<&IndexEntry> {
        self.by_ticker.get(&symbol.normalized())
    }

    /// Exact normalized-name match first, then the closest-length substring
    /// match in either direction, then the smallest CIK.
    fn by_name(&self, company_name: &str) -> Option<&IndexEntry> {
        let wanted = normalize_company_name(company_name);
        if wanted.is_empty() {
            return None;
        }

        if let Some((_, entry)) = self.by_name.iter().find(|(name, _)| *name == wanted) {
            return Some(entry);
        }

        self.by_name
            .iter()
            .filter(|(name, _)| {
                name.len().min(wanted.len()) >= MIN_SUBSTRING_LEN
                    && (name.contains(wanted.as_str()) || wanted.contains(name.as_str()))
            })
            .min_by_key(|(name, entry)| (name.len().abs_diff(wanted.len()), entry.cik))
            .map(|(_, entry)| entry)
    }
}

/// Maps symbols (or, failing that, company names) to CIKs.
///
/// Resolved mappings are cached in the [`SplitStore`] with a TTL; the bulk
/// ticker index is held in memory and refetched after the same TTL.
#[derive(Debug)]
pub struct CikResolver {
    fetcher: Arc<RateLimitedFetcher>,
    store: Arc<dyn SplitStore>,
    endpoints: EdgarEndpoints,
    ttl: Duration,
    index: Mutex<Option<Arc<TickerIndex>>>,
}

impl CikResolver {
    /// Creates a resolver with the default one-hour TTL.
    #[must_use]
    pub fn new(
        fetcher: Arc<RateLimitedFetcher>,
        store: Arc<dyn SplitStore>,
        endpoints: EdgarEndpoints,
    ) -> Self {
        Self {
            fetcher,
            store,
            endpoints,
            ttl: DEFAULT_CIK_TTL,
            index: Mutex::new(None),
        }
    }

    /// Overrides how long mappings and the ticker index are trusted.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Resolves a symbol to its CIK.
    ///
    /// # Errors
    /// [`SplitError::CikNotFound`] when neither the ticker nor the company name
    /// matches; fetch and store errors otherwise.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn resolve(&self, symbol: &Symbol, company_name: Option<&str>) -> Result<Cik> {
        // Mappings are keyed by ticker, so name-only lookups bypass the cache.
        let cacheable = !symbol.as_str().is_empty();
        if !cacheable && company_name.is_none_or(|n| n.trim().is_empty()) {
            return Err(SplitError::InvalidParameter("Empty ticker".to_string()));
        }

        if cacheable {
            if let Some(mapping) = self.store.get_cik_mapping(symbol).await? {
                if !mapping.is_expired() {
                    debug!(cik = %mapping.cik, "Using cached CIK mapping");
                    return Ok(mapping.cik);
                }
                debug!("Cached CIK mapping expired");
            }
        }

        let index = self.index().await?;
        let entry = index
            .by_ticker(symbol)
            .or_else(|| company_name.and_then(|name| index.by_name(name)));

        let Some(entry) = entry else {
            return Err(SplitError::CikNotFound {
                symbol: symbol.to_string(),
                company_name: company_name.map(str::to_string),
            });
        };

        if cacheable {
            let mapping = CikMapping::new(symbol.clone(), entry.cik)
                .with_company_name(entry.title.clone())
                .with_ttl(self.ttl);
            self.store.put_cik_mapping(&mapping).await?;
        }
        debug!(cik = %entry.cik, "Resolved CIK");
        Ok(entry.cik)
    }

    /// Returns the ticker index, fetching it when absent or stale.
    ///
    /// The lock is held across the fetch so concurrent misses share one download.
    async fn index(&self) -> Result<Arc<TickerIndex>> {
        let mut slot = self.index.lock().await;
        if let Some(index) = slot.as_ref() {
            if index.fetched_at.elapsed() < self.ttl {
                return Ok(Arc::clone(index));
            }
        }

        let raw: HashMap<String, CompanyTickerInfo> = self
            .fetcher
            .fetch_json(&self.endpoints.ticker_index_url)
            .await?;
        let index = Arc::new(TickerIndex::build(raw));
        info!(tickers = index.by_ticker.len(), "Loaded SEC company ticker index");
        *slot = Some(Arc::clone(&index));
        Ok(index)
    }
}

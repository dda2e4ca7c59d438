//! Batch configuration.
//!
//! Every knob has a default suited to the SEC's fair-access policy. Values can
//! be overridden through `RSPLIT_*` environment variables with
//! [`BatchConfig::from_env`].

use rsplit_core::{DEFAULT_CIK_TTL, DiscoveryWindow, Result, SplitError};
use rsplit_edgar::{EdgarEndpoints, RetryPolicy, validate_user_agent};
use std::str::FromStr;
use std::time::Duration;

/// Highest request rate the SEC tolerates from one client.
pub const MAX_RATE_LIMIT: u32 = 10;

/// Upper bound on concurrent split resolutions.
pub const MAX_CONCURRENCY: usize = 4;

/// Upper bound on fetch attempts per registry request.
pub const MAX_ATTEMPTS: u32 = 10;

/// Widest filing window, in days, on either side of an effective date.
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Settings for one linking batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Registry requests per second, shared by all workers.
    pub rate_limit: u32,
    /// Filing window around each split's effective date.
    pub window: DiscoveryWindow,
    /// Lowest score a filing needs to be linked.
    pub min_score_threshold: f64,
    /// Cap on splits picked up per run. `None` processes all.
    pub max_splits: Option<usize>,
    /// Splits resolved concurrently.
    pub concurrency: usize,
    /// Candidates extracted per split, closest to the effective date first.
    pub max_candidates_per_split: usize,
    /// Lower-scoring filings persisted alongside the canonical one.
    pub runners_up: usize,
    /// Identifying `User-Agent` sent to the registry.
    pub user_agent: String,
    /// Registry URLs.
    pub endpoints: EdgarEndpoints,
    /// Retry behavior of the fetcher.
    pub retry: RetryPolicy,
    /// How long CIK mappings are trusted.
    pub cik_ttl: Duration,
    /// Stop picking up new splits after this long.
    pub time_budget: Option<Duration>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            rate_limit: 8,
            window: DiscoveryWindow::default(),
            min_score_threshold: 0.3,
            max_splits: None,
            concurrency: 1,
            max_candidates_per_split: 10,
            runners_up: 0,
            user_agent: String::new(),
            endpoints: EdgarEndpoints::default(),
            retry: RetryPolicy::default(),
            cik_ttl: DEFAULT_CIK_TTL,
            time_budget: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl BatchConfig {
    /// Reads overrides from the process environment.
    ///
    /// # Errors
    /// Returns [`SplitError::Config`] when a variable holds an unparseable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    /// Returns [`SplitError::Config`] when a variable holds an unparseable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(user_agent) = get("RSPLIT_USER_AGENT") {
            config.user_agent = user_agent;
        }
        if let Some(base) = get("RSPLIT_EDGAR_BASE_URL") {
            config.endpoints = EdgarEndpoints::with_base_url(&base);
        }
        if let Some(rate) = parsed(&get, "RSPLIT_RATE_LIMIT")? {
            config.rate_limit = rate;
        }
        if let Some(days) = parsed(&get, "RSPLIT_WINDOW_BEFORE_DAYS")? {
            config.window.before_days = days;
        }
        if let Some(days) = parsed(&get, "RSPLIT_WINDOW_AFTER_DAYS")? {
            config.window.after_days = days;
        }
        if let Some(score) = parsed(&get, "RSPLIT_MIN_SCORE")? {
            config.min_score_threshold = score;
        }
        if let Some(max) = parsed(&get, "RSPLIT_MAX_SPLITS")? {
            config.max_splits = Some(max);
        }
        if let Some(workers) = parsed(&get, "RSPLIT_CONCURRENCY")? {
            config.concurrency = workers;
        }
        if let Some(max) = parsed(&get, "RSPLIT_MAX_CANDIDATES")? {
            config.max_candidates_per_split = max;
        }
        if let Some(count) = parsed(&get, "RSPLIT_RUNNERS_UP")? {
            config.runners_up = count;
        }
        if let Some(secs) = parsed(&get, "RSPLIT_CIK_TTL_SECS")? {
            config.cik_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed(&get, "RSPLIT_TIME_BUDGET_SECS")? {
            config.time_budget = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = parsed(&get, "RSPLIT_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parsed(&get, "RSPLIT_MAX_ATTEMPTS")? {
            config.retry.max_attempts = attempts;
        }

        Ok(config)
    }

    /// Sets the identifying `User-Agent`.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the request rate ceiling.
    #[must_use]
    pub const fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.rate_limit = per_second;
        self
    }

    /// Sets the discovery window.
    #[must_use]
    pub const fn with_window(mut self, before_days: u32, after_days: u32) -> Self {
        self.window = DiscoveryWindow::new(before_days, after_days);
        self
    }

    /// Sets the acceptance threshold.
    #[must_use]
    pub const fn with_min_score(mut self, threshold: f64) -> Self {
        self.min_score_threshold = threshold;
        self
    }

    /// Caps the number of splits per run.
    #[must_use]
    pub const fn with_max_splits(mut self, max_splits: Option<usize>) -> Self {
        self.max_splits = max_splits;
        self
    }

    /// Sets the number of concurrent split resolutions.
    #[must_use]
    pub const fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    /// Sets how many candidates are examined per split.
    #[must_use]
    pub const fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates_per_split = max;
        self
    }

    /// Sets how many runners-up are persisted for audit.
    #[must_use]
    pub const fn with_runners_up(mut self, count: usize) -> Self {
        self.runners_up = count;
        self
    }

    /// Points every endpoint at another host.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EdgarEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the CIK cache TTL.
    #[must_use]
    pub const fn with_cik_ttl(mut self, ttl: Duration) -> Self {
        self.cik_ttl = ttl;
        self
    }

    /// Limits how long the batch keeps picking up new splits.
    #[must_use]
    pub const fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    /// Checks the configuration before any request is made.
    ///
    /// # Errors
    /// Returns [`SplitError::Config`] describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        validate_user_agent(&self.user_agent)?;
        if !(1..=MAX_RATE_LIMIT).contains(&self.rate_limit) {
            return Err(SplitError::Config(format!(
                "rate limit must be between 1 and {MAX_RATE_LIMIT} requests per second, got {}",
                self.rate_limit
            )));
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(SplitError::Config(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            )));
        }
        if !(1..=MAX_ATTEMPTS).contains(&self.retry.max_attempts) {
            return Err(SplitError::Config(format!(
                "fetch attempts must be between 1 and {MAX_ATTEMPTS}, got {}",
                self.retry.max_attempts
            )));
        }
        if self.window.before_days > MAX_WINDOW_DAYS || self.window.after_days > MAX_WINDOW_DAYS {
            return Err(SplitError::Config(format!(
                "filing window may span at most {MAX_WINDOW_DAYS} days per side, got {} before and {} after",
                self.window.before_days, self.window.after_days
            )));
        }
        if !(0.0..=1.0).contains(&self.min_score_threshold) {
            return Err(SplitError::Config(format!(
                "minimum score must lie in [0, 1], got {}",
                self.min_score_threshold
            )));
        }
        if self.max_candidates_per_split == 0 {
            return Err(SplitError::Config(
                "at least one candidate per split must be examined".into(),
            ));
        }
        Ok(())
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| SplitError::Config(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BatchConfig::default();
        assert_eq!(config.rate_limit, 8);
        assert_eq!(config.window, DiscoveryWindow::new(14, 30));
        assert_eq!(config.min_score_threshold, 0.3);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.max_candidates_per_split, 10);
        assert_eq!(config.runners_up, 0);
        assert_eq!(config.cik_ttl, Duration::from_secs(3600));
        assert_eq!(config.retry.max_attempts, 5);
        // No identifying header yet.
        assert!(matches!(config.validate(), Err(SplitError::Config(_))));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = BatchConfig::from_lookup(lookup(&[
            ("RSPLIT_USER_AGENT", "rsplit/0.1 (ops@example.com)"),
            ("RSPLIT_RATE_LIMIT", "5"),
            ("RSPLIT_WINDOW_BEFORE_DAYS", "7"),
            ("RSPLIT_WINDOW_AFTER_DAYS", " 21 "),
            ("RSPLIT_MIN_SCORE", "0.45"),
            ("RSPLIT_MAX_SPLITS", "100"),
            ("RSPLIT_CONCURRENCY", "3"),
            ("RSPLIT_TIME_BUDGET_SECS", "600"),
            ("RSPLIT_MAX_ATTEMPTS", "3"),
            ("RSPLIT_EDGAR_BASE_URL", "http://127.0.0.1:9000"),
            ("RSPLIT_RUNNERS_UP", ""),
        ]))
        .unwrap();

        assert_eq!(config.user_agent, "rsplit/0.1 (ops@example.com)");
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.window, DiscoveryWindow::new(7, 21));
        assert_eq!(config.min_score_threshold, 0.45);
        assert_eq!(config.max_splits, Some(100));
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.time_budget, Some(Duration::from_secs(600)));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(
            config.endpoints.ticker_index_url,
            "http://127.0.0.1:9000/files/company_tickers.json"
        );
        assert_eq!(config.runners_up, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_values_are_config_errors() {
        let err = BatchConfig::from_lookup(lookup(&[("RSPLIT_RATE_LIMIT", "fast")])).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("RSPLIT_RATE_LIMIT"));
    }

    #[test]
    fn test_validate_bounds() {
        let base = BatchConfig::default().with_user_agent("rsplit/0.1 (ops@example.com)");
        assert!(base.validate().is_ok());
        assert!(base.clone().with_rate_limit(11).validate().is_err());
        assert!(base.clone().with_rate_limit(0).validate().is_err());
        assert!(base.clone().with_concurrency(5).validate().is_err());
        assert!(base.clone().with_min_score(1.5).validate().is_err());
        assert!(base.clone().with_max_candidates(0).validate().is_err());

        let mut no_attempts = base.clone();
        no_attempts.retry.max_attempts = 0;
        assert!(no_attempts.validate().is_err());
        assert!(
            base.clone()
                .with_window(MAX_WINDOW_DAYS, MAX_WINDOW_DAYS)
                .validate()
                .is_ok()
        );
        assert!(base.with_window(0, MAX_WINDOW_DAYS + 1).validate().is_err());
    }

    #[test]
    fn test_out_of_range_env_values_fail_validation() {
        let agent = ("RSPLIT_USER_AGENT", "rsplit/0.1 (ops@example.com)");

        let config = BatchConfig::from_lookup(lookup(&[
            agent,
            ("RSPLIT_WINDOW_BEFORE_DAYS", "4000000000"),
        ]))
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("window"));

        let config =
            BatchConfig::from_lookup(lookup(&[agent, ("RSPLIT_MAX_ATTEMPTS", "1000")])).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("attempts"));
    }
}

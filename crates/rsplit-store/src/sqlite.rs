//! SQLite-based split store.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rsplit_core::{
    Cik, CikMapping, EdgarFilingRecord, LinkOutcome, LinkedSplit, NewSplitRecord, Result,
    SplitError, SplitId, SplitRecord, SplitStore, Symbol, validate_resolution,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, instrument};

const SPLIT_COLUMNS: &str = "id, symbol, company_name, split_ratio, effective_date, source, \
     edgar_resolved, force_reprocess, edgar_attempts, last_outcome, last_updated";

const FILING_COLUMNS: &str = "split_id, cik, accession_number, form_type, filing_date, \
     extracted_ratio, extracted_effective_date, announcement_date, rounding_up_flag, \
     relevance_score, url, is_canonical";

/// SQLite-backed [`SplitStore`].
///
/// Each trait call runs on a single connection under a mutex; multi-row writes
/// run inside a transaction, so a crash mid-commit leaves the split unresolved.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SplitError::Store(e.to_string()))
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS split_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                company_name TEXT,
                split_ratio TEXT NOT NULL,
                effective_date TEXT NOT NULL,
                source TEXT NOT NULL,
                edgar_resolved INTEGER NOT NULL DEFAULT 0,
                force_reprocess INTEGER NOT NULL DEFAULT 0,
                edgar_attempts INTEGER NOT NULL DEFAULT 0,
                last_outcome TEXT,
                last_updated TEXT NOT NULL,
                UNIQUE (symbol, effective_date)
            );

            CREATE INDEX IF NOT EXISTS idx_split_records_pending
                ON split_records(edgar_resolved, force_reprocess);

            CREATE TABLE IF NOT EXISTS cik_mappings (
                symbol TEXT PRIMARY KEY,
                cik INTEGER NOT NULL,
                company_name TEXT,
                resolved_at TEXT NOT NULL,
                ttl_secs INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS edgar_filings (
                split_id INTEGER NOT NULL REFERENCES split_records(id),
                cik INTEGER NOT NULL,
                accession_number TEXT NOT NULL,
                form_type TEXT NOT NULL,
                filing_date TEXT NOT NULL,
                extracted_ratio TEXT,
                extracted_effective_date TEXT,
                announcement_date TEXT,
                rounding_up_flag INTEGER,
                relevance_score REAL NOT NULL,
                url TEXT NOT NULL,
                is_canonical INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (split_id, accession_number)
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_edgar_filings_one_canonical
                ON edgar_filings(split_id) WHERE is_canonical = 1;",
        )
        .map_err(store_err)?;

        debug!("SQLite split store schema initialized");
        Ok(())
    }

    fn load_split(conn: &Connection, id: SplitId) -> Result<Option<SplitRecord>> {
        let sql = format!("SELECT {SPLIT_COLUMNS} FROM split_records WHERE id = ?1");
        conn.query_row(&sql, params![id.0], SplitRow::from_row)
            .optional()
            .map_err(store_err)?
            .map(SplitRow::into_record)
            .transpose()
    }

    fn load_filings(
        conn: &Connection,
        sql: &str,
        id: Option<SplitId>,
    ) -> Result<Vec<EdgarFilingRecord>> {
        let mut stmt = conn.prepare(sql).map_err(store_err)?;
        let rows = match id {
            Some(id) => stmt.query_map(params![id.0], FilingRow::from_row),
            None => stmt.query_map([], FilingRow::from_row),
        }
        .map_err(store_err)?;

        let mut filings = Vec::new();
        for row in rows {
            filings.push(row.map_err(store_err)?.into_record()?);
        }
        Ok(filings)
    }
}

#[async_trait]
impl SplitStore for SqliteStore {
    #[instrument(skip(self, split), fields(symbol = %split.symbol, effective_date = %split.effective_date))]
    async fn upsert_split(&self, split: &NewSplitRecord) -> Result<SplitRecord> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let id: i64 = conn
            .query_row(
                "INSERT INTO split_records
                    (symbol, company_name, split_ratio, effective_date, source, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(symbol, effective_date) DO UPDATE SET
                    company_name = COALESCE(excluded.company_name, split_records.company_name),
                    split_ratio = excluded.split_ratio,
                    source = excluded.source,
                    last_updated = excluded.last_updated
                 RETURNING id",
                params![
                    split.symbol.as_str(),
                    split.company_name,
                    split.split_ratio,
                    split.effective_date.to_string(),
                    split.source.as_str(),
                    now,
                ],
                |row| row.get(0),
            )
            .map_err(store_err)?;

        debug!(id, "Upserted split record");
        Self::load_split(&conn, SplitId(id))?
            .ok_or_else(|| SplitError::Store(format!("split {id} vanished after upsert")))
    }

    #[instrument(skip(self))]
    async fn get_split(&self, id: SplitId) -> Result<Option<SplitRecord>> {
        let conn = self.lock()?;
        Self::load_split(&conn, id)
    }

    #[instrument(skip(self))]
    async fn unresolved_splits(&self, limit: Option<usize>) -> Result<Vec<SplitRecord>> {
        let conn = self.lock()?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));

        let sql = format!(
            "SELECT {SPLIT_COLUMNS} FROM split_records
             WHERE edgar_resolved = 0 OR force_reprocess = 1
             ORDER BY id ASC
             LIMIT ?1"
        );
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt
            .query_map(params![limit], SplitRow::from_row)
            .map_err(store_err)?;

        let mut splits = Vec::new();
        for row in rows {
            splits.push(row.map_err(store_err)?.into_record()?);
        }
        debug!("Found {} splits awaiting EDGAR links", splits.len());
        Ok(splits)
    }

    #[instrument(skip(self))]
    async fn set_force_reprocess(&self, id: SplitId, force: bool) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE split_records SET force_reprocess = ?1, last_updated = ?2 WHERE id = ?3",
                params![force, Utc::now().to_rfc3339(), id.0],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(SplitError::InvalidParameter(format!("unknown split {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn get_cik_mapping(&self, symbol: &Symbol) -> Result<Option<CikMapping>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT symbol, cik, company_name, resolved_at, ttl_secs
                 FROM cik_mappings WHERE symbol = ?1",
                params![symbol.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(store_err)?;

        let Some((symbol, cik, company_name, resolved_at, ttl_secs)) = row else {
            return Ok(None);
        };
        Ok(Some(CikMapping {
            symbol: Symbol::new(symbol),
            cik: cik_from_db(cik)?,
            company_name,
            resolved_at: parse_timestamp(&resolved_at)?,
            ttl: Duration::from_secs(u64::try_from(ttl_secs).unwrap_or_default()),
        }))
    }

    #[instrument(skip(self, mapping), fields(symbol = %mapping.symbol, cik = %mapping.cik))]
    async fn put_cik_mapping(&self, mapping: &CikMapping) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO cik_mappings
                (symbol, cik, company_name, resolved_at, ttl_secs)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                mapping.symbol.as_str(),
                cik_to_db(mapping.cik),
                mapping.company_name,
                mapping.resolved_at.to_rfc3339(),
                i64::try_from(mapping.ttl.as_secs()).unwrap_or(i64::MAX),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    #[instrument(skip(self, filings), fields(filings = filings.len()))]
    async fn commit_resolution(
        &self,
        split_id: SplitId,
        filings: &[EdgarFilingRecord],
    ) -> Result<()> {
        validate_resolution(split_id, filings)?;
        let conn = self.lock()?;

        let tx = conn.unchecked_transaction().map_err(store_err)?;

        tx.execute(
            "UPDATE edgar_filings SET is_canonical = 0 WHERE split_id = ?1",
            params![split_id.0],
        )
        .map_err(store_err)?;

        for filing in filings {
            tx.execute(
                "INSERT INTO edgar_filings
                    (split_id, cik, accession_number, form_type, filing_date,
                     extracted_ratio, extracted_effective_date, announcement_date,
                     rounding_up_flag, relevance_score, url, is_canonical)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(split_id, accession_number) DO UPDATE SET
                    cik = excluded.cik,
                    form_type = excluded.form_type,
                    filing_date = excluded.filing_date,
                    extracted_ratio = excluded.extracted_ratio,
                    extracted_effective_date = excluded.extracted_effective_date,
                    announcement_date = excluded.announcement_date,
                    rounding_up_flag = excluded.rounding_up_flag,
                    relevance_score = excluded.relevance_score,
                    url = excluded.url,
                    is_canonical = excluded.is_canonical",
                params![
                    split_id.0,
                    cik_to_db(filing.cik),
                    filing.accession_number,
                    filing.form_type,
                    filing.filing_date.to_string(),
                    filing.extracted_ratio,
                    filing.extracted_effective_date.map(|d| d.to_string()),
                    filing.announcement_date.map(|d| d.to_string()),
                    filing.rounding_up_flag,
                    filing.relevance_score,
                    filing.url,
                    filing.is_canonical,
                ],
            )
            .map_err(store_err)?;
        }

        let changed = tx
            .execute(
                "UPDATE split_records SET
                    edgar_resolved = 1,
                    force_reprocess = 0,
                    edgar_attempts = edgar_attempts + 1,
                    last_outcome = ?1,
                    last_updated = ?2
                 WHERE id = ?3",
                params![
                    LinkOutcome::Resolved.as_str(),
                    Utc::now().to_rfc3339(),
                    split_id.0
                ],
            )
            .map_err(store_err)?;
        if changed == 0 {
            // Dropping the transaction rolls back the filing rows.
            return Err(SplitError::InvalidParameter(format!(
                "unknown split {split_id}"
            )));
        }

        tx.commit().map_err(store_err)?;
        debug!(split_id = %split_id, "Committed EDGAR resolution");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_outcome(&self, split_id: SplitId, outcome: LinkOutcome) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE split_records SET
                    edgar_attempts = edgar_attempts + 1,
                    last_outcome = ?1,
                    force_reprocess = CASE WHEN ?1 = 'errored' THEN force_reprocess ELSE 0 END,
                    last_updated = ?2
                 WHERE id = ?3",
                params![outcome.as_str(), Utc::now().to_rfc3339(), split_id.0],
            )
            .map_err(store_err)?;
        if changed == 0 {
            return Err(SplitError::InvalidParameter(format!(
                "unknown split {split_id}"
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn filings_for_split(&self, split_id: SplitId) -> Result<Vec<EdgarFilingRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {FILING_COLUMNS} FROM edgar_filings
             WHERE split_id = ?1
             ORDER BY is_canonical DESC, relevance_score DESC, filing_date ASC, accession_number ASC"
        );
        Self::load_filings(&conn, &sql, Some(split_id))
    }

    #[instrument(skip(self))]
    async fn canonical_filing(&self, split_id: SplitId) -> Result<Option<EdgarFilingRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {FILING_COLUMNS} FROM edgar_filings WHERE split_id = ?1 AND is_canonical = 1"
        );
        Ok(Self::load_filings(&conn, &sql, Some(split_id))?
            .into_iter()
            .next())
    }

    #[instrument(skip(self))]
    async fn linked_splits(&self) -> Result<Vec<LinkedSplit>> {
        let conn = self.lock()?;

        let sql = format!("SELECT {FILING_COLUMNS} FROM edgar_filings WHERE is_canonical = 1");
        let mut canonical: HashMap<SplitId, EdgarFilingRecord> =
            Self::load_filings(&conn, &sql, None)?
                .into_iter()
                .map(|f| (f.split_id, f))
                .collect();

        let sql = format!(
            "SELECT {SPLIT_COLUMNS} FROM split_records ORDER BY effective_date ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql).map_err(store_err)?;
        let rows = stmt.query_map([], SplitRow::from_row).map_err(store_err)?;

        let mut linked = Vec::new();
        for row in rows {
            let split = row.map_err(store_err)?.into_record()?;
            let canonical = canonical.remove(&split.id);
            linked.push(LinkedSplit { split, canonical });
        }
        Ok(linked)
    }
}

// =============================================================================
// Row conversion
// =============================================================================

struct SplitRow {
    id: i64,
    symbol: String,
    company_name: Option<String>,
    split_ratio: String,
    effective_date: String,
    source: String,
    edgar_resolved: bool,
    force_reprocess: bool,
    edgar_attempts: i64,
    last_outcome: Option<String>,
    last_updated: String,
}

impl SplitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            symbol: row.get(1)?,
            company_name: row.get(2)?,
            split_ratio: row.get(3)?,
            effective_date: row.get(4)?,
            source: row.get(5)?,
            edgar_resolved: row.get(6)?,
            force_reprocess: row.get(7)?,
            edgar_attempts: row.get(8)?,
            last_outcome: row.get(9)?,
            last_updated: row.get(10)?,
        })
    }

    fn into_record(self) -> Result<SplitRecord> {
        Ok(SplitRecord {
            id: SplitId(self.id),
            symbol: Symbol::new(self.symbol),
            company_name: self.company_name,
            split_ratio: self.split_ratio,
            effective_date: parse_date(&self.effective_date)?,
            source: self.source.parse()?,
            edgar_resolved: self.edgar_resolved,
            force_reprocess: self.force_reprocess,
            edgar_attempts: u32::try_from(self.edgar_attempts).unwrap_or(u32::MAX),
            last_outcome: self.last_outcome.as_deref().map(str::parse).transpose()?,
            last_updated: parse_timestamp(&self.last_updated)?,
        })
    }
}

struct FilingRow {
    split_id: i64,
    cik: i64,
    accession_number: String,
    form_type: String,
    filing_date: String,
    extracted_ratio: Option<String>,
    extracted_effective_date: Option<String>,
    announcement_date: Option<String>,
    rounding_up_flag: Option<bool>,
    relevance_score: f64,
    url: String,
    is_canonical: bool,
}

impl FilingRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            split_id: row.get(0)?,
            cik: row.get(1)?,
            accession_number: row.get(2)?,
            form_type: row.get(3)?,
            filing_date: row.get(4)?,
            extracted_ratio: row.get(5)?,
            extracted_effective_date: row.get(6)?,
            announcement_date: row.get(7)?,
            rounding_up_flag: row.get(8)?,
            relevance_score: row.get(9)?,
            url: row.get(10)?,
            is_canonical: row.get(11)?,
        })
    }

    fn into_record(self) -> Result<EdgarFilingRecord> {
        Ok(EdgarFilingRecord {
            split_id: SplitId(self.split_id),
            cik: cik_from_db(self.cik)?,
            accession_number: self.accession_number,
            form_type: self.form_type,
            filing_date: parse_date(&self.filing_date)?,
            extracted_ratio: self.extracted_ratio,
            extracted_effective_date: self
                .extracted_effective_date
                .as_deref()
                .map(parse_date)
                .transpose()?,
            announcement_date: self.announcement_date.as_deref().map(parse_date).transpose()?,
            rounding_up_flag: self.rounding_up_flag,
            relevance_score: self.relevance_score,
            url: self.url,
            is_canonical: self.is_canonical,
        })
    }
}

fn store_err(e: rusqlite::Error) -> SplitError {
    SplitError::Store(e.to_string())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse()
        .map_err(|e| SplitError::Parse(format!("Invalid stored date {s:?}: {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SplitError::Parse(format!("Invalid stored timestamp {s:?}: {e}")))
}

fn cik_to_db(cik: Cik) -> i64 {
    // Ten digits always fit.
    cik.value() as i64
}

fn cik_from_db(value: i64) -> Result<Cik> {
    let value = u64::try_from(value)
        .map_err(|_| SplitError::Parse(format!("Invalid stored CIK {value}")))?;
    Cik::new(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsplit_core::SplitSource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_split(symbol: &str) -> NewSplitRecord {
        NewSplitRecord::new(symbol, "1-for-20", date(2024, 3, 1), SplitSource::StockAnalysis)
    }

    fn filing(
        split_id: SplitId,
        accession: &str,
        score: f64,
        canonical: bool,
    ) -> EdgarFilingRecord {
        EdgarFilingRecord {
            split_id,
            cik: Cik::new(1234).unwrap(),
            accession_number: accession.to_string(),
            form_type: "8-K".into(),
            filing_date: date(2024, 2, 28),
            extracted_ratio: Some("1-for-20".into()),
            extracted_effective_date: Some(date(2024, 3, 1)),
            announcement_date: None,
            rounding_up_flag: Some(false),
            relevance_score: score,
            url: format!("https://www.sec.gov/Archives/edgar/data/1234/{accession}/doc.htm"),
            is_canonical: canonical,
        }
    }

    #[tokio::test]
    async fn test_sqlite_store_initialization() {
        let store = SqliteStore::in_memory();
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_upsert_split_is_keyed_by_symbol_and_date() {
        let store = SqliteStore::in_memory().unwrap();

        let first = store.upsert_split(&new_split("abcd")).await.unwrap();
        let again = store
            .upsert_split(&new_split("ABCD").with_company_name("Abcd Inc"))
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.symbol.as_str(), "ABCD");
        assert_eq!(again.company_name.as_deref(), Some("Abcd Inc"));
        assert!(!again.edgar_resolved);
        assert_eq!(store.unresolved_splits(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_never_resets_resolution() {
        let store = SqliteStore::in_memory().unwrap();
        let split = store.upsert_split(&new_split("ABCD")).await.unwrap();
        store
            .commit_resolution(split.id, &[filing(split.id, "0000001234-24-000001", 0.8, true)])
            .await
            .unwrap();

        let again = store.upsert_split(&new_split("ABCD")).await.unwrap();
        assert!(again.edgar_resolved);
        assert!(store.unresolved_splits(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_resolution_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let split = store.upsert_split(&new_split("ABCD")).await.unwrap();
        let rows = vec![
            filing(split.id, "0000001234-24-000001", 0.8, true),
            filing(split.id, "0000001234-24-000002", 0.4, false),
        ];

        store.commit_resolution(split.id, &rows).await.unwrap();
        let first = store.filings_for_split(split.id).await.unwrap();
        store.commit_resolution(split.id, &rows).await.unwrap();
        let second = store.filings_for_split(split.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
        assert!(second[0].is_canonical);

        let resolved = store.get_split(split.id).await.unwrap().unwrap();
        assert!(resolved.edgar_resolved);
        assert_eq!(resolved.last_outcome, Some(LinkOutcome::Resolved));
    }

    #[tokio::test]
    async fn test_canonical_moves_on_recommit() {
        let store = SqliteStore::in_memory().unwrap();
        let split = store.upsert_split(&new_split("ABCD")).await.unwrap();
        store
            .commit_resolution(split.id, &[filing(split.id, "A-1", 0.5, true)])
            .await
            .unwrap();
        store
            .commit_resolution(split.id, &[filing(split.id, "A-2", 0.9, true)])
            .await
            .unwrap();

        let canonical = store.canonical_filing(split.id).await.unwrap().unwrap();
        assert_eq!(canonical.accession_number, "A-2");
        let all = store.filings_for_split(split.id).await.unwrap();
        assert_eq!(all.iter().filter(|f| f.is_canonical).count(), 1);
    }

    #[tokio::test]
    async fn test_commit_rejects_two_canonical_rows() {
        let store = SqliteStore::in_memory().unwrap();
        let split = store.upsert_split(&new_split("ABCD")).await.unwrap();
        let result = store
            .commit_resolution(
                split.id,
                &[filing(split.id, "A-1", 0.5, true), filing(split.id, "A-2", 0.5, true)],
            )
            .await;
        assert!(matches!(result, Err(SplitError::InvalidParameter(_))));
        assert!(store.filings_for_split(split.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_force_reprocess_and_outcomes() {
        let store = SqliteStore::in_memory().unwrap();
        let split = store.upsert_split(&new_split("ABCD")).await.unwrap();
        store
            .commit_resolution(split.id, &[filing(split.id, "A-1", 0.5, true)])
            .await
            .unwrap();
        assert!(store.unresolved_splits(None).await.unwrap().is_empty());

        store.set_force_reprocess(split.id, true).await.unwrap();
        let pending = store.unresolved_splits(Some(10)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].force_reprocess);

        store
            .record_outcome(split.id, LinkOutcome::Errored)
            .await
            .unwrap();
        let after_error = store.get_split(split.id).await.unwrap().unwrap();
        assert!(after_error.force_reprocess);
        assert!(after_error.edgar_resolved);

        store
            .record_outcome(split.id, LinkOutcome::NoQualifyingFiling)
            .await
            .unwrap();
        let after_miss = store.get_split(split.id).await.unwrap().unwrap();
        assert!(!after_miss.force_reprocess);
        assert_eq!(after_miss.edgar_attempts, 3);

        assert!(store.set_force_reprocess(SplitId(999), true).await.is_err());
    }

    #[tokio::test]
    async fn test_unresolved_limit_and_order() {
        let store = SqliteStore::in_memory().unwrap();
        for symbol in ["AAA", "BBB", "CCC"] {
            store.upsert_split(&new_split(symbol)).await.unwrap();
        }
        let pending = store.unresolved_splits(Some(2)).await.unwrap();
        let symbols: Vec<_> = pending.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, ["AAA", "BBB"]);
    }

    #[tokio::test]
    async fn test_cik_mapping_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let symbol = Symbol::new("ABCD");
        assert!(store.get_cik_mapping(&symbol).await.unwrap().is_none());

        let mapping = CikMapping::new(symbol.clone(), Cik::new(320193).unwrap())
            .with_company_name("Abcd Inc")
            .with_ttl(Duration::from_secs(120));
        store.put_cik_mapping(&mapping).await.unwrap();

        let cached = store.get_cik_mapping(&symbol).await.unwrap().unwrap();
        assert_eq!(cached.cik, mapping.cik);
        assert_eq!(cached.ttl, Duration::from_secs(120));
        assert_eq!(cached.company_name.as_deref(), Some("Abcd Inc"));
    }

    #[tokio::test]
    async fn test_linked_splits_join() {
        let store = SqliteStore::in_memory().unwrap();
        let resolved = store.upsert_split(&new_split("AAA")).await.unwrap();
        store.upsert_split(&new_split("BBB")).await.unwrap();
        store
            .commit_resolution(
                resolved.id,
                &[
                    filing(resolved.id, "A-1", 0.9, true),
                    filing(resolved.id, "A-2", 0.4, false),
                ],
            )
            .await
            .unwrap();

        let linked = store.linked_splits().await.unwrap();
        assert_eq!(linked.len(), 2);
        let aaa = linked.iter().find(|l| l.split.symbol.as_str() == "AAA").unwrap();
        assert_eq!(aaa.canonical.as_ref().unwrap().accession_number, "A-1");
        let bbb = linked.iter().find(|l| l.split.symbol.as_str() == "BBB").unwrap();
        assert!(bbb.canonical.is_none());
    }
}

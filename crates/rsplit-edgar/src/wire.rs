//! SEC endpoint layout and response types.

use rsplit_core::Cik;
use serde::Deserialize;

/// SEC company tickers URL
pub const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// SEC EDGAR submissions API base URL
pub const SUBMISSIONS_BASE_URL: &str = "https://data.sec.gov/submissions";

/// SEC EDGAR filing archive base URL
pub const ARCHIVES_BASE_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// Registry URLs, overridable for mirrors and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgarEndpoints {
    /// Bulk ticker index (`company_tickers.json`).
    pub ticker_index_url: String,
    /// Base of the per-CIK submissions API.
    pub submissions_base: String,
    /// Base of the document archive.
    pub archives_base: String,
}

impl Default for EdgarEndpoints {
    fn default() -> Self {
        Self {
            ticker_index_url: COMPANY_TICKERS_URL.to_string(),
            submissions_base: SUBMISSIONS_BASE_URL.to_string(),
            archives_base: ARCHIVES_BASE_URL.to_string(),
        }
    }
}

impl EdgarEndpoints {
    /// Places every endpoint under one host, mirroring the SEC path layout.
    #[must_use]
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            ticker_index_url: format!("{base}/files/company_tickers.json"),
            submissions_base: format!("{base}/submissions"),
            archives_base: format!("{base}/Archives/edgar/data"),
        }
    }

    /// Submissions document for a CIK.
    #[must_use]
    pub fn submissions_url(&self, cik: Cik) -> String {
        format!("{}/CIK{}.json", self.submissions_base, cik.padded())
    }

    /// Older submissions page listed under `filings.files`.
    #[must_use]
    pub fn submissions_page_url(&self, name: &str) -> String {
        format!("{}/{}", self.submissions_base, name)
    }

    /// Primary document of a filing.
    #[must_use]
    pub fn document_url(
        &self,
        cik: Cik,
        accession_number: &str,
        primary_document: &str,
    ) -> String {
        format!(
            "{}/{}/{}/{}",
            self.archives_base,
            cik.value(),
            accession_number.replace('-', ""),
            primary_document
        )
    }
}

// =============================================================================
// SEC API Response Types
// =============================================================================

/// Company ticker information from SEC JSON.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    pub(crate) cik_str: u64,
    /// Ticker symbol
    pub(crate) ticker: String,
    /// Company name
    pub(crate) title: String,
}

/// Company submissions/filings metadata.
#[derive(Debug, Deserialize)]
pub(crate) struct CompanySubmissions {
    /// Company name
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) filings: SubmissionFilings,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionFilings {
    pub(crate) recent: FilingColumns,
    #[serde(default)]
    pub(crate) files: Vec<SubmissionPage>,
}

/// Pointer to an older page of filings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmissionPage {
    pub(crate) name: String,
    pub(crate) filing_from: String,
    pub(crate) filing_to: String,
}

/// Filings as parallel arrays, one entry per filing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilingColumns {
    #[serde(default)]
    pub(crate) accession_number: Vec<String>,
    #[serde(default)]
    pub(crate) filing_date: Vec<String>,
    #[serde(default)]
    pub(crate) form: Vec<String>,
    #[serde(default)]
    pub(crate) primary_document: Vec<String>,
    #[serde(default)]
    pub(crate) items: Vec<String>,
}

/// One row of [`FilingColumns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FilingRow<'a> {
    pub(crate) accession_number: &'a str,
    pub(crate) filing_date: &'a str,
    pub(crate) form: &'a str,
    pub(crate) primary_document: &'a str,
    pub(crate) items: &'a str,
}

impl FilingColumns {
    /// Rows where every required column is present.
    pub(crate) fn rows(&self) -> impl Iterator<Item = FilingRow<'_>> {
        (0..self.accession_number.len()).filter_map(|i| {
            Some(FilingRow {
                accession_number: self.accession_number.get(i)?,
                filing_date: self.filing_date.get(i)?,
                form: self.form.get(i)?,
                primary_document: self.primary_document.get(i)?,
                items: self.items.get(i).map_or("", String::as_str),
            })
        })
    }
}

//! Tabular view of linked splits for dashboards and exports.

use polars::prelude::*;

use crate::{
    error::{Result, SplitError},
    types::LinkedSplit,
};

/// Renders splits joined with their canonical filings as a [`DataFrame`].
///
/// Columns: `symbol`, `company_name`, `split_ratio`, `effective_date`,
/// `edgar_resolved`, `accession_number`, `form_type`, `filing_date`,
/// `extracted_ratio`, `extracted_effective_date`, `rounding_up_flag`,
/// `relevance_score`, `url`. Filing columns are null for unresolved splits.
///
/// # Errors
/// Returns an error if polars rejects the columns.
pub fn linked_splits_frame(rows: &[LinkedSplit]) -> Result<DataFrame> {
    let mut symbols = Vec::with_capacity(rows.len());
    let mut names: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut ratios = Vec::with_capacity(rows.len());
    let mut effective = Vec::with_capacity(rows.len());
    let mut resolved = Vec::with_capacity(rows.len());
    let mut accessions: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut forms: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut filed: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut extracted_ratios: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut extracted_dates: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut rounding: Vec<Option<bool>> = Vec::with_capacity(rows.len());
    let mut scores: Vec<Option<f64>> = Vec::with_capacity(rows.len());
    let mut urls: Vec<Option<String>> = Vec::with_capacity(rows.len());

    for row in rows {
        let split = &row.split;
        symbols.push(split.symbol.to_string());
        names.push(split.company_name.clone());
        ratios.push(split.split_ratio.clone());
        effective.push(split.effective_date.to_string());
        resolved.push(split.edgar_resolved);

        let filing = row.canonical.as_ref();
        accessions.push(filing.map(|f| f.accession_number.clone()));
        forms.push(filing.map(|f| f.form_type.clone()));
        filed.push(filing.map(|f| f.filing_date.to_string()));
        extracted_ratios.push(filing.and_then(|f| f.extracted_ratio.clone()));
        extracted_dates.push(
            filing
                .and_then(|f| f.extracted_effective_date)
                .map(|d| d.to_string()),
        );
        rounding.push(filing.and_then(|f| f.rounding_up_flag));
        scores.push(filing.map(|f| f.relevance_score));
        urls.push(filing.map(|f| f.url.clone()));
    }

    let df = DataFrame::new(vec![
        Column::new("symbol".into(), symbols),
        Column::new("company_name".into(), names),
        Column::new("split_ratio".into(), ratios),
        Column::new("effective_date".into(), effective),
        Column::new("edgar_resolved".into(), resolved),
        Column::new("accession_number".into(), accessions),
        Column::new("form_type".into(), forms),
        Column::new("filing_date".into(), filed),
        Column::new("extracted_ratio".into(), extracted_ratios),
        Column::new("extracted_effective_date".into(), extracted_dates),
        Column::new("rounding_up_flag".into(), rounding),
        Column::new("relevance_score".into(), scores),
        Column::new("url".into(), urls),
    ])
    .map_err(|e| SplitError::Other(e.to_string()))?;

    df.lazy()
        .with_columns([
            col("effective_date").cast(DataType::Date),
            col("filing_date").cast(DataType::Date),
            col("extracted_effective_date").cast(DataType::Date),
        ])
        .collect()
        .map_err(|e| SplitError::Other(e.to_string()))
}

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::calendar::{Calendar, Document};
use crate::storage::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("CSV header must contain 'date' and 'calendars' columns, found: {0}")]
    MissingColumns(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub date: NaiveDate,
    pub calendars: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCsv {
    pub rows: Vec<ImportRow>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub rows_imported: usize,
    pub rows_skipped: usize,
    pub calendars_created: Vec<String>,
    pub assigned_dates: usize,
    pub active_id: Option<String>,
}

fn date_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"))
}

pub fn parse_csv(text: &str) -> Result<ParsedCsv, CsvImportError> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let Some(header) = lines.next() else {
        return Ok(ParsedCsv::default());
    };

    let columns: Vec<String> = header.split(',').map(|c| c.trim().to_lowercase()).collect();
    let date_idx = columns.iter().position(|c| c == "date");
    let calendars_idx = columns.iter().position(|c| c == "calendars");
    let (Some(date_idx), Some(calendars_idx)) = (date_idx, calendars_idx) else {
        return Err(CsvImportError::MissingColumns(header.to_string()));
    };

    let mut parsed = ParsedCsv::default();
    for line in lines {
        match parse_row(line, date_idx, calendars_idx) {
            Some(row) => parsed.rows.push(row),
            None => {
                tracing::warn!("Skipping malformed CSV row: {}", line);
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}

fn parse_row(line: &str, date_idx: usize, calendars_idx: usize) -> Option<ImportRow> {
    let parts: Vec<&str> = line.split(',').collect();

    let raw_date = parts.get(date_idx)?.trim();
    if !date_pattern().is_match(raw_date) {
        return None;
    }
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").ok()?;

    let calendars: Vec<String> = parts
        .get(calendars_idx)?
        .split(';')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect();

    if calendars.is_empty() {
        return None;
    }

    Some(ImportRow { date, calendars })
}

/// Merges rows into `document`: unknown calendar ids are created, assignment
/// lists are unioned, and the active calendar falls back to the first one.
pub fn merge_rows(document: &mut Document, rows: &[ImportRow], default_color: &str) -> ImportSummary {
    let mut summary = ImportSummary {
        rows_imported: rows.len(),
        ..ImportSummary::default()
    };

    let mut seen = BTreeSet::new();
    for id in rows.iter().flat_map(|row| row.calendars.iter()) {
        if seen.insert(id.as_str()) && !document.has_calendar(id) {
            document.calendars.push(Calendar::from_id(id, default_color));
            summary.calendars_created.push(id.clone());
        }
    }

    for row in rows {
        let assigned = document.assignments.entry(row.date).or_default();
        for id in &row.calendars {
            if !assigned.contains(id) {
                assigned.push(id.clone());
            }
        }
    }

    if document.active_id.is_none() {
        document.active_id = document.calendars.first().map(|c| c.id.clone());
    }

    summary.assigned_dates = document.assignments.len();
    summary.active_id = document.active_id.clone();
    summary
}

pub async fn import_csv(
    store: &dyn DocumentStore,
    text: &str,
    default_color: &str,
) -> Result<ImportSummary, CsvImportError> {
    let parsed = parse_csv(text)?;
    if parsed.rows.is_empty() {
        tracing::info!("No rows to import");
        return Ok(ImportSummary {
            rows_skipped: parsed.skipped,
            ..ImportSummary::default()
        });
    }

    let mut document = store.read().await?;
    let mut summary = merge_rows(&mut document, &parsed.rows, default_color);
    summary.rows_skipped = parsed.skipped;
    store.write(&document).await?;

    tracing::info!(
        "Imported {} rows into {} ({} skipped, {} calendars created)",
        summary.rows_imported,
        store.describe(),
        summary.rows_skipped,
        summary.calendars_created.len()
    );

    Ok(summary)
}

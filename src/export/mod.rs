//! CSV export of a job's result set.
//!
//! Columns are fixed: `Title,Company,Location,Email,Phone,URL,Description`.
//! Every data field is double-quoted with embedded quotes doubled, and absent
//! fields are written as empty strings. An empty result set is refused with
//! [`ExportError::NothingToExport`] before any file is touched.

use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;
use tracing::info;

use crate::api::models::ScrapeResult;

pub const CSV_HEADER: [&str; 7] = [
    "Title",
    "Company",
    "Location",
    "Email",
    "Phone",
    "URL",
    "Description",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No results to export")]
    NothingToExport,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// `scraping_results_{job_id}.csv`
pub fn csv_filename(job_id: &str) -> String {
    format!("scraping_results_{}.csv", job_id)
}

fn row(result: &ScrapeResult) -> [String; 7] {
    let url = result
        .url
        .clone()
        .or_else(|| result.text_field("url"))
        .unwrap_or_default();

    [
        result.text_field("title").unwrap_or_default(),
        result.text_field("company").unwrap_or_default(),
        result.text_field("location").unwrap_or_default(),
        result.contact_field("email").unwrap_or_default(),
        result.contact_field("phone").unwrap_or_default(),
        url,
        result.text_field("description").unwrap_or_default(),
    ]
}

/// Serializes results to a CSV document
pub fn to_csv(results: &[ScrapeResult]) -> Result<String> {
    if results.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut header = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    header.write_record(CSV_HEADER)?;
    let buffer = header.into_inner().map_err(|e| e.into_error())?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(buffer);
    for result in results {
        writer.write_record(row(result))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;

    String::from_utf8(bytes)
        .map_err(|e| ExportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Writes `scraping_results_{job_id}.csv` under `dir` and returns its path.
/// Nothing is created when `results` is empty.
pub fn write_csv(job_id: &str, results: &[ScrapeResult], dir: &Path) -> Result<PathBuf> {
    let document = to_csv(results)?;

    std::fs::create_dir_all(dir)?;
    let path = dir.join(csv_filename(job_id));
    std::fs::write(&path, document)?;

    info!(job_id = %job_id, rows = results.len(), path = %path.display(), "Results exported");
    Ok(path)
}

use reqwest::Url;
use thiserror::Error;

use super::models::{CreateJobRequest, ScrapeRequest};

pub const MAX_RESULTS_LIMIT: u32 = 500;

/// Client-side input errors; these block submission before any request is sent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("search query is required")]
    EmptyQuery,
    #[error("at least one URL is required")]
    EmptyUrlList,
    #[error("'{0}' is not a valid http/https URL")]
    InvalidUrl(String),
    #[error("max_results must be between 1 and 500, got {0}")]
    MaxResultsOutOfRange(u32),
    #[error("job id is required")]
    EmptyJobId,
    #[error("adapter name is required")]
    EmptyAdapter,
}

/// URLs split out of a free-form, newline-separated text input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlInput {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

/// Splits on newlines, trims, drops blank lines and sorts entries into valid/invalid
pub fn normalize_urls(raw: &str) -> UrlInput {
    let mut input = UrlInput::default();
    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if is_valid_url(line) {
            input.valid.push(line.to_string());
        } else {
            input.invalid.push(line.to_string());
        }
    }
    input
}

pub fn is_valid_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

pub fn validate_create_job(request: &CreateJobRequest) -> Result<(), ValidationError> {
    match request {
        CreateJobRequest::Search { query, max_results } => {
            validate_query(query)?;
            validate_max_results(*max_results)
        }
        CreateJobRequest::Scrape {
            urls, adapter_name, ..
        } => {
            if urls.is_empty() {
                return Err(ValidationError::EmptyUrlList);
            }
            if let Some(bad) = urls.iter().find(|url| !is_valid_url(url)) {
                return Err(ValidationError::InvalidUrl(bad.clone()));
            }
            if adapter_name.trim().is_empty() {
                return Err(ValidationError::EmptyAdapter);
            }
            Ok(())
        }
    }
}

pub fn validate_scrape_request(request: &ScrapeRequest) -> Result<(), ValidationError> {
    validate_query(&request.query)?;
    validate_max_results(request.max_results)
}

pub fn validate_job_id(job_id: &str) -> Result<(), ValidationError> {
    if job_id.trim().is_empty() {
        return Err(ValidationError::EmptyJobId);
    }
    Ok(())
}

fn validate_query(query: &str) -> Result<(), ValidationError> {
    if query.trim().is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    Ok(())
}

fn validate_max_results(max_results: u32) -> Result<(), ValidationError> {
    if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
        return Err(ValidationError::MaxResultsOutOfRange(max_results));
    }
    Ok(())
}

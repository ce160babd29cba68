//! Wire models for the scraper backend's HTTP contract.
//!
//! The backend owns every record here; the client holds read-only copies:
//! - [`Job`] is returned by `GET /api/jobs/{id}/status` and listed by `GET /api/jobs`
//! - [`ScrapeResult`] rows come from `GET /api/jobs/{id}/results`
//! - [`CreateJobRequest`] is the `POST /api/jobs` body
//!
//! # Job payload
//!
//! ```json
//! {
//!   "_id": "65f1c0de9a1b2c3d4e5f6789",
//!   "type": "scrape",
//!   "status": "running",
//!   "progress": 40,
//!   "total_urls": 10,
//!   "completed_urls": 4,
//!   "failed_urls": 0,
//!   "results_count": 12,
//!   "error_message": null,
//!   "created_at": "Tue, 05 Mar 2024 10:00:00 GMT"
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Job lifecycle status. No transition ever leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Capitalized label for status badges ("Running")
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Pending => "Pending",
            JobStatus::Running => "Running",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// Treats an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integer or fractional percentages, rounded and clamped to 0..=100
fn progress_percent<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or_default();
    if value.is_nan() {
        return Ok(0);
    }
    Ok(value.round().clamp(0.0, 100.0) as u32)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub status: JobStatus,
    /// Percentage, meaningful only while running; may move backwards on retry
    #[serde(default, deserialize_with = "progress_percent")]
    pub progress: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_urls: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed_urls: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub failed_urls: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(
        rename = "type",
        alias = "job_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Job {
    /// Placeholder for a freshly submitted job whose record has not been fetched yet
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            progress: 0,
            total_urls: 0,
            completed_urls: 0,
            failed_urls: 0,
            results_count: 0,
            error_message: None,
            job_type: None,
            query: None,
            urls: Vec::new(),
            max_results: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// First eight characters of the id, as shown in notifications
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// One scraped record. `data` is opaque and passed through untouched;
/// any other top-level fields (title, company, contact_info, ...) land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScrapeResult {
    /// Text of a top-level field, falling back to the same key inside `data`
    pub fn text_field(&self, key: &str) -> Option<String> {
        self.extra
            .get(key)
            .or_else(|| self.data.get(key))
            .and_then(value_as_text)
    }

    /// Text of `contact_info.<key>` at top level or inside `data`
    pub fn contact_field(&self, key: &str) -> Option<String> {
        self.extra
            .get("contact_info")
            .or_else(|| self.data.get("contact_info"))
            .and_then(|info| info.get(key))
            .and_then(value_as_text)
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Contact extractors sometimes return lists; first entry wins
        Value::Array(items) => items.first().and_then(value_as_text),
        Value::Null | Value::Object(_) => None,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobResults {
    #[serde(default)]
    pub job: Option<Job>,
    #[serde(default)]
    pub results: Vec<ScrapeResult>,
}

/// `POST /api/jobs` body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CreateJobRequest {
    Search {
        query: String,
        max_results: u32,
    },
    Scrape {
        urls: Vec<String>,
        adapter_name: String,
        task_type: String,
    },
}

pub const DEFAULT_MAX_RESULTS: u32 = 20;
pub const DEFAULT_ADAPTER: &str = "default";
pub const DEFAULT_TASK_TYPE: &str = "general";

#[derive(Debug, Clone, Deserialize)]
pub struct JobAccepted {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// `POST /api/scrape/jobs` and `POST /api/scrape/leads` body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeRequest {
    pub query: String,
    pub max_results: u32,
}

/// Generic acknowledgment payload (`{ message }`, `{ job_id, status }`, ...)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Acknowledgement {
    pub fn summary(&self) -> String {
        match (&self.message, &self.job_id) {
            (Some(message), _) => message.clone(),
            (None, Some(job_id)) => format!("accepted job {}", job_id),
            (None, None) => self
                .status
                .clone()
                .unwrap_or_else(|| "ok".to_string()),
        }
    }
}

/// `GET /api/stats` aggregate counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_jobs: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed_jobs: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub running_jobs: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub failed_jobs: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_results: u64,
    #[serde(default)]
    pub success_rate: Option<f64>,
}

impl Stats {
    /// Reported success rate, or completed/total when the backend omits it
    pub fn effective_success_rate(&self) -> f64 {
        match self.success_rate {
            Some(rate) => rate,
            None if self.total_jobs == 0 => 0.0,
            None => self.completed_jobs as f64 * 100.0 / self.total_jobs as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adapter {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdaptersResponse {
    #[serde(default)]
    pub adapters: Vec<Adapter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Backend error body (`{ "error": "..." }`)
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

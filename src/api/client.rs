//! HTTP client for the scraper backend

use bytes::Bytes;
use reqwest::{Client, Method, RequestBuilder, Url, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::error::{ClientError, Result, error_message};
use super::models::{
    Acknowledgement, Adapter, AdaptersResponse, CreateJobRequest, Job, JobAccepted, JobResults,
    JobsResponse, ScrapeRequest, SearchRequest, SearchResponse, Stats,
};
use super::validation;
use crate::config::ApiConfig;

/// Server-side export formats for `GET /api/job/{id}/export/{format}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime(self) -> mime::Mime {
        match self {
            ExportFormat::Csv => mime::TEXT_CSV,
            ExportFormat::Json => mime::APPLICATION_JSON,
        }
    }

    /// Download filename used for server-side exports
    pub fn filename(self, job_id: &str) -> String {
        format!("job_{}_results.{}", job_id, self.as_str())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unsupported export format '{}'", other)),
        }
    }
}

/// Typed client over the backend's REST contract
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client; every request is bounded by `config.request_timeout`
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout.as_duration())
            .timeout(config.request_timeout.as_duration())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/jobs`
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let response: JobsResponse = self.get_json(&["api", "jobs"]).await?;
        Ok(response.jobs)
    }

    /// `GET /api/jobs/{id}/status`
    pub async fn job_status(&self, job_id: &str) -> Result<Job> {
        validation::validate_job_id(job_id)?;
        self.get_json(&["api", "jobs", job_id, "status"]).await
    }

    /// `GET /api/jobs/{id}/results`
    pub async fn job_results(&self, job_id: &str) -> Result<JobResults> {
        validation::validate_job_id(job_id)?;
        self.get_json(&["api", "jobs", job_id, "results"]).await
    }

    /// `POST /api/jobs`; input is validated before anything is sent
    pub async fn create_job(&self, request: &CreateJobRequest) -> Result<JobAccepted> {
        validation::validate_create_job(request)?;
        self.post_json(&["api", "jobs"], Some(request)).await
    }

    /// `POST /api/scrape/jobs`
    pub async fn scrape_jobs(&self, request: &ScrapeRequest) -> Result<Acknowledgement> {
        validation::validate_scrape_request(request)?;
        self.post_json(&["api", "scrape", "jobs"], Some(request)).await
    }

    /// `POST /api/scrape/leads`
    pub async fn scrape_leads(&self, request: &ScrapeRequest) -> Result<Acknowledgement> {
        validation::validate_scrape_request(request)?;
        self.post_json(&["api", "scrape", "leads"], Some(request)).await
    }

    /// `GET /api/stats`
    pub async fn stats(&self) -> Result<Stats> {
        self.get_json(&["api", "stats"]).await
    }

    /// `GET /api/adapters`
    pub async fn adapters(&self) -> Result<Vec<Adapter>> {
        let response: AdaptersResponse = self.get_json(&["api", "adapters"]).await?;
        Ok(response.adapters)
    }

    /// `GET /api/health`
    pub async fn health(&self) -> Result<serde_json::Value> {
        self.get_json(&["api", "health"]).await
    }

    /// `POST /api/search`
    pub async fn search(&self, query: &str, max_results: u32) -> Result<Vec<serde_json::Value>> {
        let request = ScrapeRequest {
            query: query.to_string(),
            max_results,
        };
        validation::validate_scrape_request(&request)?;

        let body = SearchRequest {
            query: request.query,
            max_results: request.max_results,
        };
        let response: SearchResponse = self.post_json(&["api", "search"], Some(&body)).await?;
        Ok(response.results)
    }

    /// `POST /admin/clear-data`
    pub async fn clear_data(&self) -> Result<Acknowledgement> {
        self.post_json::<(), _>(&["admin", "clear-data"], None).await
    }

    /// `POST /api/job/{id}/cancel`, returning the backend's message
    pub async fn cancel_job(&self, job_id: &str) -> Result<String> {
        validation::validate_job_id(job_id)?;
        let ack: Acknowledgement = self
            .post_json::<(), _>(&["api", "job", job_id, "cancel"], None)
            .await?;
        Ok(ack.summary())
    }

    /// `GET /api/job/{id}/export/{format}`, returning the raw file bytes
    pub async fn export_job(&self, job_id: &str, format: ExportFormat) -> Result<Bytes> {
        validation::validate_job_id(job_id)?;
        let request = self
            .request(Method::GET, &["api", "job", job_id, "export", format.as_str()])?
            .header(header::ACCEPT, format.mime().essence_str());
        self.send(request).await
    }

    /// Joins path segments onto the base URL; each segment is percent-encoded,
    /// so an opaque job id can never add path levels or a query string
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Network(format!("invalid base URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Network(format!("base URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self.client.request(method, self.endpoint(segments)?))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let request = self
            .request(Method::GET, segments)?
            .header(header::ACCEPT, mime::APPLICATION_JSON.essence_str());
        let body = self.send(request).await?;
        decode(&body)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T> {
        let mut request = self
            .request(Method::POST, segments)?
            .header(header::ACCEPT, mime::APPLICATION_JSON.essence_str())
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.essence_str());

        if let Some(body) = body {
            let payload = serde_json::to_vec(body)
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            request = request.body(payload);
        }

        let body = self.send(request).await?;
        decode(&body)
    }

    /// Send once (no retry) and return the body of a success response
    async fn send(&self, request: RequestBuilder) -> Result<Bytes> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = request.url().to_string();
        debug!(%method, url = %url, "Sending request");

        let response = self.client.execute(request).await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            debug!(%method, url = %url, status = status.as_u16(), "Backend returned error status");
            return Err(ClientError::from_response(status, &body));
        }

        debug!(%method, url = %url, size = body.len(), "Request completed");
        Ok(body)
    }
}

/// Decode a success body; an `{ "error": ... }` payload becomes a backend error
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| match error_message(body) {
        Some(message) => ClientError::Backend {
            status: 200,
            message,
        },
        None => ClientError::Decode(e.to_string()),
    })
}

//! Job status source used by the poll scheduler

use async_trait::async_trait;
use thiserror::Error;

use crate::api::models::{Job, Stats};
use crate::api::{ApiClient, ClientError};

/// A status fetch that did not produce a record. Never means "no change".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("status request timed out")]
    Timeout,
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("invalid status payload: {0}")]
    Decode(String),
}

impl From<ClientError> for FetchError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::Network(message) => FetchError::Network(message),
            ClientError::Timeout => FetchError::Timeout,
            ClientError::Backend { status, message } => FetchError::Backend { status, message },
            ClientError::Decode(message) => FetchError::Decode(message),
            ClientError::Validation(e) => FetchError::Backend {
                status: 0,
                message: e.to_string(),
            },
        }
    }
}

/// Fetches the current status record of one job
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<Job, FetchError>;
}

/// Fetches aggregate dashboard counters
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch_stats(&self) -> Result<Stats, FetchError>;
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, job_id: &str) -> Result<Job, FetchError> {
        let job = self.job_status(job_id).await?;
        if job.id != job_id {
            return Err(FetchError::Decode(format!(
                "status for '{}' returned record '{}'",
                job_id, job.id
            )));
        }
        Ok(job)
    }
}

#[async_trait]
impl StatsSource for ApiClient {
    async fn fetch_stats(&self) -> Result<Stats, FetchError> {
        Ok(self.stats().await?)
    }
}

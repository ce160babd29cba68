//! Pure lifecycle reduction for one job observation.
//!
//! `reduce` never performs I/O. It compares the last-known record with the
//! newest observation and returns what should happen:
//!
//! | previous → observed            | patch | notification | stop | reload |
//! |--------------------------------|-------|--------------|------|--------|
//! | non-terminal → pending/running | yes   | –            | no   | no     |
//! | non-terminal → completed       | yes   | success      | yes  | yes    |
//! | non-terminal → failed          | yes   | error        | yes  | no     |
//! | non-terminal → cancelled       | yes   | info         | yes  | no     |
//! | fetch error                    | –     | –            | no   | no     |
//! | terminal → anything            | –     | –            | yes  | no     |

use std::fmt;

use super::status::FetchError;
use crate::api::models::{Job, JobStatus, short_id};

/// Outcome of one status fetch
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Fetched(Job),
    Failed(FetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
        };
        f.write_str(name)
    }
}

/// One-time, user-visible notice about a terminal transition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Notification {
    pub job_id: String,
    pub kind: NotificationKind,
    pub message: String,
}

/// Field-level changes to apply to a job's view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPatch {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: u32,
    pub results_count: u64,
    pub completed_urls: u64,
    pub failed_urls: u64,
    pub error_message: Option<String>,
}

impl JobPatch {
    fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            results_count: job.results_count,
            completed_urls: job.completed_urls,
            failed_urls: job.failed_urls,
            error_message: match job.status {
                JobStatus::Failed => job.error_message.clone(),
                _ => None,
            },
        }
    }

    /// Applies the patch to a cached record; counters are replaced, never summed
    pub fn apply_to(&self, job: &mut Job) {
        job.status = self.status;
        job.progress = self.progress;
        job.results_count = self.results_count;
        job.completed_urls = self.completed_urls;
        job.failed_urls = self.failed_urls;
        job.error_message = self.error_message.clone();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decision {
    pub patch: Option<JobPatch>,
    pub notification: Option<Notification>,
    pub stop_polling: bool,
    pub schedule_reload: bool,
}

impl Decision {
    /// Keep polling, change nothing
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn is_terminal(&self) -> bool {
        self.stop_polling
    }
}

pub fn reduce(previous: Option<&Job>, observation: &Observation) -> Decision {
    let job = match observation {
        Observation::Fetched(job) => job,
        Observation::Failed(_) => return Decision::unchanged(),
    };

    // Terminal states are final: late or repeated observations change nothing
    if let Some(previous) = previous {
        if previous.status.is_terminal() {
            return Decision {
                stop_polling: true,
                ..Decision::default()
            };
        }
    }

    let patch = Some(JobPatch::from_job(job));
    let short = short_id(&job.id);

    match job.status {
        JobStatus::Pending | JobStatus::Running => Decision {
            patch,
            ..Decision::default()
        },
        JobStatus::Completed => Decision {
            patch,
            notification: Some(Notification {
                job_id: job.id.clone(),
                kind: NotificationKind::Success,
                message: format!("Job {}... completed successfully!", short),
            }),
            stop_polling: true,
            schedule_reload: true,
        },
        JobStatus::Failed => {
            let message = match job.error_message.as_deref() {
                Some(reason) if !reason.is_empty() => {
                    format!("Job {}... failed: {}", short, reason)
                }
                _ => format!("Job {}... failed.", short),
            };
            Decision {
                patch,
                notification: Some(Notification {
                    job_id: job.id.clone(),
                    kind: NotificationKind::Error,
                    message,
                }),
                stop_polling: true,
                schedule_reload: false,
            }
        }
        JobStatus::Cancelled => Decision {
            patch,
            notification: Some(Notification {
                job_id: job.id.clone(),
                kind: NotificationKind::Info,
                message: format!("Job {}... was cancelled.", short),
            }),
            stop_polling: true,
            schedule_reload: false,
        },
    }
}

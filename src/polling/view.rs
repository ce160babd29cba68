use crate::api::models::{Job, JobStatus};

/// Badge color class for a status
pub fn status_color(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "secondary",
        JobStatus::Running => "primary",
        JobStatus::Completed => "success",
        JobStatus::Failed => "danger",
        JobStatus::Cancelled => "warning",
    }
}

/// Render-ready state of one job row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub job_id: String,
    pub status: JobStatus,
    pub badge: &'static str,
    pub label: &'static str,
    /// Clamped to 0..=100
    pub progress: u32,
    pub results_count: u64,
    pub completed_urls: u64,
    pub failed_urls: u64,
    pub error_message: Option<String>,
}

impl JobView {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            badge: status_color(job.status),
            label: job.status.label(),
            progress: job.progress.min(100),
            results_count: job.results_count,
            completed_urls: job.completed_urls,
            failed_urls: job.failed_urls,
            // Only failed jobs show an error block
            error_message: match job.status {
                JobStatus::Failed => job.error_message.clone(),
                _ => None,
            },
        }
    }

    /// One-line rendering used by the terminal dashboard
    pub fn render_line(&self) -> String {
        let mut line = format!(
            "{:<26} [{:<9}] {:>3}%  results={} completed={} failed={}",
            self.job_id,
            self.label,
            self.progress,
            self.results_count,
            self.completed_urls,
            self.failed_urls
        );
        if let Some(error) = &self.error_message {
            line.push_str("  error=");
            line.push_str(error);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors() {
        assert_eq!(status_color(JobStatus::Pending), "secondary");
        assert_eq!(status_color(JobStatus::Running), "primary");
        assert_eq!(status_color(JobStatus::Completed), "success");
        assert_eq!(status_color(JobStatus::Failed), "danger");
        assert_eq!(status_color(JobStatus::Cancelled), "warning");
    }

    #[test]
    fn test_view_clamps_progress_and_hides_stale_errors() {
        let mut job = Job::pending("job-1");
        job.status = JobStatus::Running;
        job.progress = 140;
        job.error_message = Some("retrying".to_string());

        let view = JobView::from_job(&job);
        assert_eq!(view.progress, 100);
        assert_eq!(view.label, "Running");
        assert!(view.error_message.is_none());

        job.status = JobStatus::Failed;
        let view = JobView::from_job(&job);
        assert_eq!(view.error_message.as_deref(), Some("retrying"));
        assert!(view.render_line().ends_with("error=retrying"));
    }
}

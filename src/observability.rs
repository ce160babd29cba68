//! Poll metrics (counters logged at the end of a watch session)

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording poll counters
#[derive(Debug, Default)]
pub struct Metrics {
    polls_issued: AtomicU64,
    fetch_failures: AtomicU64,
    discarded_results: AtomicU64,
    notifications: AtomicU64,
    reloads: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll_issued(&self) {
        self.polls_issued.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "polls_issued", "Metric incremented");
    }

    pub fn fetch_failed(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "fetch_failures", "Metric incremented");
    }

    pub fn result_discarded(&self) {
        self.discarded_results.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "discarded_results", "Metric incremented");
    }

    pub fn notification_emitted(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "notifications", "Metric incremented");
    }

    pub fn reload_fired(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "reloads", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls_issued: self.polls_issued.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            discarded_results: self.discarded_results.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub polls_issued: u64,
    pub fetch_failures: u64,
    pub discarded_results: u64,
    pub notifications: u64,
    pub reloads: u64,
}

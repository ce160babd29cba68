use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;

use super::reducer::Notification;
use super::view::JobView;
use crate::api::models::Stats;

/// Presentation layer the scheduler reports into.
///
/// Calls arrive only while the owning scheduler is alive. `apply_patch` and
/// `notify` run with the view state locked and must not call back into the
/// scheduler; `reload` runs unlocked.
#[async_trait]
pub trait RefreshSink: Send + Sync {
    /// A job row changed
    fn apply_patch(&self, view: &JobView);

    /// A terminal transition happened (at most once per job)
    fn notify(&self, notification: &Notification);

    /// Deferred full-data refresh after a completed job
    async fn reload(&self);

    /// Aggregate counters were refreshed
    fn stats_updated(&self, _stats: &Stats, _at: DateTime<Utc>) {}
}

/// Everything a [`RecordingSink`] has seen, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Patch(JobView),
    Notify(Notification),
    Reload,
    Stats(Stats),
}

/// Sink that keeps every call in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: SinkEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn reload_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, SinkEvent::Reload))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

#[async_trait]
impl RefreshSink for RecordingSink {
    fn apply_patch(&self, view: &JobView) {
        self.push(SinkEvent::Patch(view.clone()));
    }

    fn notify(&self, notification: &Notification) {
        self.push(SinkEvent::Notify(notification.clone()));
    }

    async fn reload(&self) {
        self.push(SinkEvent::Reload);
    }

    fn stats_updated(&self, stats: &Stats, _at: DateTime<Utc>) {
        self.push(SinkEvent::Stats(stats.clone()));
    }
}

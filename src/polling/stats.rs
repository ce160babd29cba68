use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::sink::RefreshSink;
use super::status::{FetchError, StatsSource};
use crate::api::models::Stats;

struct StatsShared {
    source: Arc<dyn StatsSource>,
    sink: Arc<dyn RefreshSink>,
    last: Mutex<Option<(Stats, DateTime<Utc>)>>,
}

/// Refreshes aggregate counters on its own cadence, independent of status
/// polling. At most one timer exists per poller.
pub struct StatsPoller {
    shared: Arc<StatsShared>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl StatsPoller {
    pub fn new(
        source: Arc<dyn StatsSource>,
        sink: Arc<dyn RefreshSink>,
        interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(StatsShared {
                source,
                sink,
                last: Mutex::new(None),
            }),
            interval,
            timer: Mutex::new(None),
        }
    }

    /// Starts the refresh timer, replacing any previous one
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        *timer = Some(tokio::spawn(run_stats_timer(
            Arc::downgrade(&self.shared),
            self.interval,
        )));
        debug!(interval_ms = self.interval.as_millis() as u64, "Stats refresh started");
    }

    pub fn stop(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
            debug!("Stats refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Fetches stats once and reports them to the sink
    pub async fn refresh_once(&self) -> Result<Stats, FetchError> {
        self.shared.refresh().await
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.shared.lock_last().as_ref().map(|(_, at)| *at)
    }

    pub fn latest(&self) -> Option<Stats> {
        self.shared.lock_last().as_ref().map(|(stats, _)| stats.clone())
    }
}

impl Drop for StatsPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

impl StatsShared {
    fn lock_last(&self) -> std::sync::MutexGuard<'_, Option<(Stats, DateTime<Utc>)>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn refresh(&self) -> Result<Stats, FetchError> {
        match self.source.fetch_stats().await {
            Ok(stats) => {
                let now = Utc::now();
                *self.lock_last() = Some((stats.clone(), now));
                self.sink.stats_updated(&stats, now);
                Ok(stats)
            }
            Err(e) => {
                warn!(error = %e, "Stats refresh failed");
                Err(e)
            }
        }
    }
}

async fn run_stats_timer(shared: Weak<StatsShared>, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let _ = shared.refresh().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polling::sink::{RecordingSink, SinkEvent};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStats {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl StatsSource for CountingStats {
        async fn fetch_stats(&self) -> Result<Stats, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            if self.fail {
                return Err(FetchError::Network("down".to_string()));
            }
            Ok(Stats {
                total_jobs: n + 1,
                ..Stats::default()
            })
        }
    }

    fn poller(fail: bool) -> (StatsPoller, Arc<CountingStats>, Arc<RecordingSink>) {
        let source = Arc::new(CountingStats {
            calls: AtomicUsize::new(0),
            fail,
        });
        let sink = Arc::new(RecordingSink::new());
        let poller = StatsPoller::new(source.clone(), sink.clone(), Duration::from_secs(30));
        (poller, source, sink)
    }

    #[tokio::test]
    async fn test_refresh_once_reports_to_sink() {
        let (poller, _source, sink) = poller(false);
        let stats = poller.refresh_once().await.unwrap();

        assert_eq!(stats.total_jobs, 1);
        assert!(poller.last_updated().is_some());
        assert_eq!(sink.events(), vec![SinkEvent::Stats(stats)]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_stats() {
        let (poller, _source, sink) = poller(true);
        assert!(poller.refresh_once().await.is_err());

        assert!(poller.latest().is_none());
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_runs_on_its_own_cadence() {
        let (poller, source, _sink) = poller(false);
        poller.start();
        poller.start();

        time::sleep(Duration::from_secs(29)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(62)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);

        poller.stop();
        assert!(!poller.is_running());
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }
}

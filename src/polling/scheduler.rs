//! Poll scheduler: one repeating timer per mounted view.
//!
//! The scheduler owns the [`PollState`] of a view. Each tick snapshots the
//! active ids that have no fetch outstanding, fetches their status
//! concurrently, and applies each outcome through the lifecycle reducer as it
//! arrives. The timer runs if and only if the active set is non-empty.
//!
//! Teardown (explicit or on drop) clears the timer synchronously. Fetches
//! already in flight are allowed to finish; their results are dropped by the
//! liveness check in the apply step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::reducer::Observation;
use super::sink::RefreshSink;
use super::state::PollState;
use super::status::StatusSource;
use super::view::JobView;
use crate::api::models::Job;
use crate::config::PollingConfig;
use crate::observability::{Metrics, MetricsSnapshot};

/// Scheduler timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub status_interval: Duration,
    pub reload_delay: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(5),
            reload_delay: Duration::from_secs(2),
        }
    }
}

impl From<&PollingConfig> for SchedulerSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            status_interval: config.status_interval.as_duration(),
            reload_delay: config.reload_delay.as_duration(),
        }
    }
}

/// Fetches started by one tick
#[derive(Debug, Default)]
pub struct Tick {
    handles: Vec<JoinHandle<()>>,
}

impl Tick {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits until every fetch of this tick has been applied or discarded
    pub async fn join(self) {
        for handle in self.handles {
            report_join(handle.await, "status fetch");
        }
    }
}

struct Inner {
    state: PollState,
    timer: Option<JoinHandle<()>>,
    reloads: Vec<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    alive: AtomicBool,
    source: Arc<dyn StatusSource>,
    sink: Arc<dyn RefreshSink>,
    settings: SchedulerSettings,
    metrics: Metrics,
    active_tx: watch::Sender<usize>,
}

/// Owned by exactly one view; dropping it tears polling down.
///
/// Must be used from within a Tokio runtime. Sink calls are made while the
/// view state is locked, so sinks must not call back into the scheduler.
pub struct PollScheduler {
    shared: Arc<Shared>,
}

impl PollScheduler {
    pub fn new(
        source: Arc<dyn StatusSource>,
        sink: Arc<dyn RefreshSink>,
        settings: SchedulerSettings,
    ) -> Self {
        let (active_tx, _) = watch::channel(0);
        let shared = Shared {
            inner: Mutex::new(Inner {
                state: PollState::new(),
                timer: None,
                reloads: Vec::new(),
            }),
            alive: AtomicBool::new(true),
            source,
            sink,
            settings,
            metrics: Metrics::new(),
            active_tx,
        };

        Self {
            shared: Arc::new(shared),
        }
    }

    /// Mounts the view: caches every job and polls the non-terminal ones.
    /// Returns the size of the active set.
    pub fn mount(&self, jobs: impl IntoIterator<Item = Job>) -> usize {
        let mut inner = self.shared.lock();
        if !self.shared.is_alive() {
            return 0;
        }

        for job in jobs {
            inner.state.track(job);
        }

        let active = inner.state.active_count();
        if active > 0 {
            Shared::ensure_timer(&self.shared, &mut inner);
        }
        self.shared.publish(&inner);
        info!(active, "View mounted");
        active
    }

    /// Starts polling a job (typically one the user just submitted)
    pub fn register(&self, job_id: impl Into<String>) {
        let job_id = job_id.into();
        let mut inner = self.shared.lock();
        if !self.shared.is_alive() {
            warn!(job_id = %job_id, "Register after teardown ignored");
            return;
        }

        let known_status = inner.state.job(&job_id).map(|job| job.status);
        match known_status {
            Some(status) if status.is_terminal() => {
                debug!(job_id = %job_id, status = %status, "Job already terminal, not polling");
                return;
            }
            Some(_) if inner.state.is_active(&job_id) => {}
            _ => {
                inner.state.track(Job::pending(job_id.clone()));
                debug!(job_id = %job_id, "Job registered for polling");
            }
        }

        Shared::ensure_timer(&self.shared, &mut inner);
        self.shared.publish(&inner);
    }

    /// Re-patches cached records from a fresh job listing and polls any newly
    /// discovered non-terminal jobs
    pub fn refresh(&self, jobs: Vec<Job>) -> Vec<String> {
        let mut inner = self.shared.lock();
        if !self.shared.is_alive() {
            return Vec::new();
        }

        let activated = inner.state.refresh(jobs);
        if !inner.state.is_idle() {
            Shared::ensure_timer(&self.shared, &mut inner);
        }
        self.shared.publish(&inner);
        activated
    }

    /// Runs one poll round immediately (the timer calls this on each interval)
    pub fn tick(&self) -> Tick {
        Shared::tick(&self.shared)
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().timer.is_some()
    }

    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.shared.lock().state.active_ids()
    }

    pub fn view(&self, job_id: &str) -> Option<JobView> {
        self.shared.lock().state.view(job_id).cloned()
    }

    pub fn views(&self) -> Vec<JobView> {
        self.shared.lock().state.views().cloned().collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Resolves once the active set is empty (or the scheduler is torn down)
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.active_tx.subscribe();
        let _ = rx.wait_for(|active| *active == 0).await;
    }

    /// Waits for every reload scheduled so far. Reloads taken over here are no
    /// longer cancelled by [`teardown`](Self::teardown).
    pub async fn flush_reloads(&self) {
        let reloads = std::mem::take(&mut self.shared.lock().reloads);
        for reload in reloads {
            report_join(reload.await, "reload");
        }
    }

    /// Stops polling for this view. Idempotent.
    pub fn teardown(&self) {
        let mut inner = self.shared.lock();
        if !self.shared.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        for reload in inner.reloads.drain(..) {
            reload.abort();
        }
        inner.state.deactivate_all();
        self.shared.publish(&inner);
        info!("Polling torn down");
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn publish(&self, inner: &Inner) {
        self.active_tx.send_replace(inner.state.active_count());
    }

    /// Starts the timer unless one is already running; a stale handle is
    /// always cleared before a new timer is created
    fn ensure_timer(shared: &Arc<Shared>, inner: &mut Inner) {
        if inner.timer.as_ref().is_some_and(|timer| !timer.is_finished()) {
            return;
        }
        if let Some(stale) = inner.timer.take() {
            stale.abort();
        }

        let period = shared.settings.status_interval;
        inner.timer = Some(tokio::spawn(run_timer(Arc::downgrade(shared), period)));
        info!(interval_ms = period.as_millis() as u64, "Status polling started");
    }

    fn stop_timer(&self, inner: &mut Inner) {
        if let Some(timer) = inner.timer.take() {
            timer.abort();
            info!("No active jobs left, status polling stopped");
        }
    }

    fn tick(shared: &Arc<Shared>) -> Tick {
        let job_ids = {
            let mut inner = shared.lock();
            if !shared.is_alive() {
                return Tick::default();
            }
            if inner.state.is_idle() {
                shared.stop_timer(&mut inner);
                return Tick::default();
            }
            inner.state.begin_fetch()
        };

        if job_ids.is_empty() {
            debug!("Every active job still has a fetch in flight");
            return Tick::default();
        }
        debug!(count = job_ids.len(), "Polling job statuses");

        let handles = job_ids
            .into_iter()
            .map(|job_id| {
                shared.metrics.poll_issued();
                let shared = Arc::clone(shared);
                tokio::spawn(async move {
                    let observation = match shared.source.fetch_status(&job_id).await {
                        Ok(job) => Observation::Fetched(job),
                        Err(e) => {
                            shared.metrics.fetch_failed();
                            warn!(job_id = %job_id, error = %e, "Status fetch failed, keeping last known state");
                            Observation::Failed(e)
                        }
                    };
                    shared.apply(&job_id, observation);
                })
            })
            .collect();

        Tick { handles }
    }

    fn apply(self: &Arc<Self>, job_id: &str, observation: Observation) {
        let mut inner = self.lock();
        if !self.is_alive() {
            inner.state.abandon_fetch(job_id);
            self.metrics.result_discarded();
            debug!(job_id = %job_id, "Scheduler torn down, discarding status result");
            return;
        }

        let applied = inner.state.apply(job_id, observation);

        if applied.decision.stop_polling {
            debug!(job_id = %job_id, "Job settled, removed from active set");
        }
        if inner.state.is_idle() {
            self.stop_timer(&mut inner);
        }
        if applied.decision.schedule_reload {
            inner.reloads.retain(|reload| !reload.is_finished());
            let reload = self.spawn_reload();
            inner.reloads.push(reload);
        }
        self.publish(&inner);

        if let Some(view) = &applied.view {
            self.sink.apply_patch(view);
        }
        if let Some(notification) = &applied.decision.notification {
            self.metrics.notification_emitted();
            info!(job_id = %job_id, kind = %notification.kind, "Job reached terminal state");
            self.sink.notify(notification);
        }
    }

    fn spawn_reload(self: &Arc<Self>) -> JoinHandle<()> {
        let shared = Arc::downgrade(self);
        let delay = self.settings.reload_delay;
        tokio::spawn(async move {
            time::sleep(delay).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            if !shared.is_alive() {
                return;
            }
            shared.metrics.reload_fired();
            debug!("Reloading job data");
            shared.sink.reload().await;
        })
    }
}

/// Panicked tasks are logged; cancelled ones are expected after teardown
fn report_join(result: Result<(), JoinError>, task: &str) {
    if let Err(e) = result {
        if e.is_panic() {
            warn!(task, error = %e, "Polling task panicked");
        }
    }
}

async fn run_timer(shared: Weak<Shared>, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        if !shared.is_alive() {
            break;
        }
        // Fire and forget; results are applied as they arrive
        let _ = Shared::tick(&shared);
    }
}

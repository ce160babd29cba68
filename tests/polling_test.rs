use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use scrapewatch::api::models::{Job, JobStatus};
use scrapewatch::polling::{
    FetchError, NotificationKind, Observation, PollScheduler, PollState, RecordingSink,
    SchedulerSettings, SinkEvent, StatusSource,
};

type Outcome = Result<Job, FetchError>;

/// Status source that replays a per-job script. Once a script runs dry the
/// last successful record is repeated.
#[derive(Default)]
struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    last: Mutex<HashMap<String, Job>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self::default()
    }

    /// Every fetch waits for a permit on `gate`
    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn script(self, job_id: &str, outcomes: Vec<Outcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), outcomes.into());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch_status(&self, job_id: &str) -> Result<Job, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(|script| script.pop_front());

        match next {
            Some(Ok(job)) => {
                self.last.lock().unwrap().insert(job_id.to_string(), job.clone());
                Ok(job)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .get(job_id)
                .cloned()
                .ok_or_else(|| FetchError::Backend {
                    status: 404,
                    message: "Job not found".to_string(),
                }),
        }
    }
}

fn job(id: &str, status: JobStatus, progress: u32) -> Job {
    let mut job = Job::pending(id);
    job.status = status;
    job.progress = progress;
    job
}

fn settings() -> SchedulerSettings {
    SchedulerSettings {
        status_interval: Duration::from_secs(5),
        reload_delay: Duration::from_secs(2),
    }
}

fn scheduler_with(source: ScriptedSource) -> (PollScheduler, Arc<ScriptedSource>, Arc<RecordingSink>) {
    let source = Arc::new(source);
    let sink = Arc::new(RecordingSink::new());
    let scheduler = PollScheduler::new(source.clone(), sink.clone(), settings());
    (scheduler, source, sink)
}

#[tokio::test(start_paused = true)]
async fn completion_notifies_once_and_reloads_once() {
    let source = ScriptedSource::new().script(
        "job-a",
        vec![
            Ok(job("job-a", JobStatus::Running, 50)),
            Ok(job("job-a", JobStatus::Completed, 100)),
        ],
    );
    let (scheduler, _source, sink) = scheduler_with(source);
    scheduler.register("job-a");

    scheduler.tick().join().await;
    assert!(sink.notifications().is_empty());

    scheduler.tick().join().await;
    let notifications = sink.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Success);
    assert_eq!(notifications[0].message, "Job job-a... completed successfully!");

    // Late duplicates of the terminal record change nothing
    scheduler.refresh(vec![job("job-a", JobStatus::Running, 10)]);
    assert!(scheduler.tick().is_empty());

    assert_eq!(sink.reload_count(), 0);
    tokio::time::sleep(Duration::from_millis(1900)).await;
    assert_eq!(sink.reload_count(), 0);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(sink.reload_count(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(sink.notifications().len(), 1);
    assert_eq!(sink.reload_count(), 1);
    assert_eq!(scheduler.metrics().reloads, 1);
}

#[tokio::test]
async fn failed_job_notifies_without_reload() {
    let mut failed = job("job-f", JobStatus::Failed, 30);
    failed.error_message = Some("Adapter crashed".to_string());
    let source = ScriptedSource::new().script("job-f", vec![Ok(failed)]);
    let (scheduler, _source, sink) = scheduler_with(source);
    scheduler.register("job-f");

    scheduler.tick().join().await;

    let notifications = sink.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert!(notifications[0].message.contains("Adapter crashed"));
    assert_eq!(
        scheduler.view("job-f").unwrap().error_message.as_deref(),
        Some("Adapter crashed")
    );
    assert!(!scheduler.is_running());
    assert_eq!(scheduler.metrics().reloads, 0);
}

#[tokio::test]
async fn consecutive_fetch_failures_keep_last_known_state() {
    let mut script: Vec<Outcome> = vec![Ok(job("job-r", JobStatus::Running, 40))];
    script.push(Err(FetchError::Network("connection reset".to_string())));
    script.push(Err(FetchError::Timeout));
    script.push(Err(FetchError::Backend {
        status: 500,
        message: "Internal Server Error".to_string(),
    }));
    script.push(Err(FetchError::Decode("expected value".to_string())));
    let source = ScriptedSource::new().script("job-r", script);
    let (scheduler, source, sink) = scheduler_with(source);
    scheduler.register("job-r");

    scheduler.tick().join().await;
    let before = scheduler.view("job-r").unwrap();
    let events_before = sink.events().len();

    for _ in 0..4 {
        scheduler.tick().join().await;
    }

    assert_eq!(source.calls(), 5);
    assert_eq!(scheduler.view("job-r").unwrap(), before);
    assert_eq!(scheduler.active_ids(), vec!["job-r"]);
    assert!(scheduler.is_running());
    assert!(sink.notifications().is_empty());
    assert_eq!(sink.events().len(), events_before);
    assert_eq!(scheduler.metrics().fetch_failures, 4);
}

#[tokio::test]
async fn timer_runs_only_while_jobs_are_active() {
    let source = ScriptedSource::new()
        .script("a", vec![Ok(job("a", JobStatus::Completed, 100))])
        .script("b", vec![Ok(job("b", JobStatus::Running, 10)), Ok(job("b", JobStatus::Cancelled, 10))]);
    let (scheduler, _source, sink) = scheduler_with(source);
    assert!(!scheduler.is_running());

    scheduler.mount(vec![job("a", JobStatus::Running, 0), job("b", JobStatus::Pending, 0)]);
    assert!(scheduler.is_running());

    scheduler.tick().join().await;
    assert_eq!(scheduler.active_ids(), vec!["b"]);
    assert!(scheduler.is_running());

    scheduler.tick().join().await;
    assert!(scheduler.active_ids().is_empty());
    assert!(!scheduler.is_running());

    let kinds: Vec<NotificationKind> = sink.notifications().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NotificationKind::Success, NotificationKind::Info]);

    scheduler.register("c");
    assert!(scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn timer_polls_on_the_status_cadence() {
    let source = ScriptedSource::new().script("job-t", vec![Ok(job("job-t", JobStatus::Running, 5))]);
    let (scheduler, source, _sink) = scheduler_with(source);
    scheduler.register("job-t");

    tokio::time::sleep(Duration::from_millis(4900)).await;
    assert_eq!(source.calls(), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(source.calls(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.calls(), 3);

    scheduler.teardown();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn timer_stops_fetching_once_last_job_settles() {
    let source = ScriptedSource::new().script(
        "job-d",
        vec![
            Ok(job("job-d", JobStatus::Running, 33)),
            Ok(job("job-d", JobStatus::Completed, 100)),
        ],
    );
    let (scheduler, source, sink) = scheduler_with(source);
    scheduler.register("job-d");

    tokio::time::sleep(Duration::from_millis(10_100)).await;
    assert_eq!(source.calls(), 2);
    assert!(!scheduler.is_running());
    assert!(scheduler.active_ids().is_empty());
    assert_eq!(sink.notifications().len(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(sink.notifications().len(), 1);
    assert_eq!(sink.reload_count(), 1);
}

#[tokio::test]
async fn in_flight_job_is_not_fetched_again() {
    let gate = Arc::new(Semaphore::new(0));
    let source = ScriptedSource::gated(gate.clone())
        .script("slow", vec![Ok(job("slow", JobStatus::Running, 20))]);
    let (scheduler, source, _sink) = scheduler_with(source);
    scheduler.register("slow");

    let first = scheduler.tick();
    assert_eq!(first.len(), 1);
    assert!(scheduler.tick().is_empty());

    gate.add_permits(1);
    first.join().await;
    assert_eq!(source.calls(), 1);
    assert_eq!(scheduler.view("slow").unwrap().progress, 20);

    let next = scheduler.tick();
    assert_eq!(next.len(), 1);
    gate.add_permits(1);
    next.join().await;
}

#[tokio::test]
async fn teardown_discards_in_flight_results() {
    let gate = Arc::new(Semaphore::new(0));
    let source = ScriptedSource::gated(gate.clone())
        .script("job-x", vec![Ok(job("job-x", JobStatus::Completed, 100))]);
    let (scheduler, _source, sink) = scheduler_with(source);
    scheduler.register("job-x");

    let tick = scheduler.tick();
    scheduler.teardown();
    gate.add_permits(1);
    tick.join().await;

    assert!(sink.is_empty());
    assert!(!scheduler.is_running());
    assert_eq!(scheduler.metrics().discarded_results, 1);
    assert_eq!(scheduler.metrics().notifications, 0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_scheduler_cancels_pending_reload() {
    let source = ScriptedSource::new().script("job-d", vec![Ok(job("job-d", JobStatus::Completed, 100))]);
    let (scheduler, _source, sink) = scheduler_with(source);
    scheduler.register("job-d");

    scheduler.tick().join().await;
    assert_eq!(sink.notifications().len(), 1);

    drop(scheduler);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(sink.reload_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn wait_idle_resolves_when_last_job_settles() {
    let source = ScriptedSource::new().script("job-w", vec![
        Ok(job("job-w", JobStatus::Running, 50)),
        Ok(job("job-w", JobStatus::Completed, 100)),
    ]);
    let (scheduler, _source, sink) = scheduler_with(source);
    scheduler.register("job-w");

    tokio::time::timeout(Duration::from_secs(60), scheduler.wait_idle())
        .await
        .expect("scheduler went idle");
    scheduler.flush_reloads().await;

    assert_eq!(sink.notifications().len(), 1);
    assert_eq!(sink.reload_count(), 1);
}

/// Per-job observations applied in any interleaving give the same result
#[test]
fn reduction_is_order_independent_across_jobs() {
    let observations = vec![
        ("a", Observation::Fetched(job("a", JobStatus::Completed, 100))),
        ("b", Observation::Failed(FetchError::Timeout)),
        ("c", Observation::Fetched(job("c", JobStatus::Running, 70))),
        ("d", Observation::Fetched(job("d", JobStatus::Cancelled, 0))),
    ];
    let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1]];

    let mut outcomes = Vec::new();
    for order in orders {
        let mut state = PollState::new();
        for id in ["a", "b", "c", "d"] {
            state.track(job(id, JobStatus::Running, 10));
        }

        let mut notifications = Vec::new();
        for index in order {
            let (id, observation) = &observations[index];
            if let Some(n) = state.apply(id, observation.clone()).decision.notification {
                notifications.push(n);
            }
        }
        notifications.sort_by(|x, y| x.job_id.cmp(&y.job_id));

        let views: Vec<_> = state.views().cloned().collect();
        outcomes.push((views, state.active_ids(), notifications));
    }

    assert!(outcomes.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(outcomes[0].1, vec!["b", "c"]);
    assert_eq!(outcomes[0].2.len(), 2);
}

#[tokio::test]
async fn patches_are_reported_for_every_fetched_record() {
    let source = ScriptedSource::new().script("job-p", vec![
        Ok(job("job-p", JobStatus::Running, 10)),
        Ok(job("job-p", JobStatus::Running, 5)),
    ]);
    let (scheduler, _source, sink) = scheduler_with(source);
    scheduler.register("job-p");

    scheduler.tick().join().await;
    scheduler.tick().join().await;

    let progress: Vec<u32> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            SinkEvent::Patch(view) => Some(view.progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![10, 5]);
}

use std::collections::{BTreeMap, HashSet};

use super::reducer::{Decision, Observation, reduce};
use super::view::JobView;
use crate::api::models::Job;

/// Result of applying one observation to the poll state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Decision after the already-notified filter
    pub decision: Decision,
    /// Updated view when the observation changed anything
    pub view: Option<JobView>,
}

/// Client-owned state of one mounted view: known jobs, the active poll set,
/// the per-id in-flight flags and the already-notified set.
///
/// Every mutation happens in a single `&mut self` call, so the active set and
/// the notified set always move together.
#[derive(Debug, Default)]
pub struct PollState {
    jobs: BTreeMap<String, Job>,
    views: BTreeMap<String, JobView>,
    active: BTreeMap<String, Job>,
    in_flight: HashSet<String>,
    notified: HashSet<String>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caches a job record and makes it active if its status is non-terminal.
    /// Returns whether the job is being polled afterwards.
    pub fn track(&mut self, job: Job) -> bool {
        let id = job.id.clone();
        self.views.insert(id.clone(), JobView::from_job(&job));

        let active = !job.status.is_terminal();
        if active {
            // Re-tracking a known active job keeps its in-flight flag
            self.active.insert(id.clone(), job.clone());
        } else {
            self.active.remove(&id);
        }
        self.jobs.insert(id, job);
        active
    }

    /// Marks every active id that has no fetch outstanding as in flight and
    /// returns those ids
    pub fn begin_fetch(&mut self) -> Vec<String> {
        let ready: Vec<String> = self
            .active
            .keys()
            .filter(|id| !self.in_flight.contains(*id))
            .cloned()
            .collect();
        self.in_flight.extend(ready.iter().cloned());
        ready
    }

    /// Clears the in-flight flag without applying anything
    pub fn abandon_fetch(&mut self, job_id: &str) {
        self.in_flight.remove(job_id);
    }

    pub fn apply(&mut self, job_id: &str, observation: Observation) -> Applied {
        self.in_flight.remove(job_id);

        let previous = self.active.get(job_id).or_else(|| self.jobs.get(job_id));
        let mut decision = reduce(previous, &observation);

        if decision.notification.is_some() && !self.notified.insert(job_id.to_string()) {
            decision.notification = None;
            decision.schedule_reload = false;
        }

        if decision.stop_polling {
            self.active.remove(job_id);
        }

        let mut view = None;
        if let (Some(patch), Observation::Fetched(fetched)) = (&decision.patch, &observation) {
            let cached = self
                .jobs
                .entry(job_id.to_string())
                .or_insert_with(|| fetched.clone());
            patch.apply_to(cached);

            if let Some(active) = self.active.get_mut(job_id) {
                patch.apply_to(active);
            }

            let updated = JobView::from_job(cached);
            self.views.insert(job_id.to_string(), updated.clone());
            view = Some(updated);
        }

        Applied { decision, view }
    }

    /// Replaces cached records from a fresh job listing. Jobs already seen as
    /// terminal stay terminal; returns the ids that became active.
    pub fn refresh(&mut self, jobs: Vec<Job>) -> Vec<String> {
        let mut activated = Vec::new();
        for job in jobs {
            let settled = self
                .jobs
                .get(&job.id)
                .is_some_and(|known| known.status.is_terminal());
            if settled {
                continue;
            }
            let id = job.id.clone();
            let was_active = self.active.contains_key(&id);
            if self.track(job) && !was_active {
                activated.push(id);
            }
        }
        activated
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.active.contains_key(job_id)
    }

    pub fn is_in_flight(&self, job_id: &str) -> bool {
        self.in_flight.contains(job_id)
    }

    pub fn was_notified(&self, job_id: &str) -> bool {
        self.notified.contains(job_id)
    }

    pub fn job(&self, job_id: &str) -> Option<&Job> {
        self.jobs.get(job_id)
    }

    pub fn view(&self, job_id: &str) -> Option<&JobView> {
        self.views.get(job_id)
    }

    pub fn views(&self) -> impl Iterator<Item = &JobView> {
        self.views.values()
    }

    /// Drops the active set and in-flight flags; cached views stay readable
    pub fn deactivate_all(&mut self) {
        self.active.clear();
        self.in_flight.clear();
    }
}

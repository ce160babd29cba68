//! Job status polling and lifecycle handling.
//!
//! A mounted view owns one [`PollScheduler`]. The scheduler fetches status
//! for every non-terminal job on a fixed cadence, folds each result through
//! [`reduce`], and reports patches, one-time notifications and deferred
//! reloads to a [`RefreshSink`]. Aggregate stats refresh on an independent
//! cadence through [`StatsPoller`].

pub mod reducer;
pub mod scheduler;
pub mod sink;
pub mod state;
pub mod stats;
pub mod status;
pub mod view;

pub use reducer::{Decision, JobPatch, Notification, NotificationKind, Observation, reduce};
pub use scheduler::{PollScheduler, SchedulerSettings, Tick};
pub use sink::{RecordingSink, RefreshSink, SinkEvent};
pub use state::{Applied, PollState};
pub use stats::StatsPoller;
pub use status::{FetchError, StatsSource, StatusSource};
pub use view::{JobView, status_color};

//! Shared fixtures for the integration suites.

use std::sync::Arc;
use std::time::Duration;

use stageflow::schedulers::{Scheduler, SchedulerConfig};
use stageflow::utils::testing::ManualReactor;

/// A scheduler over a hand-driven reactor, plus the reactor for firing
/// timers deterministically. Event sends go to a dropped receiver, which
/// the scheduler tolerates.
pub fn manual_scheduler() -> (Scheduler, Arc<ManualReactor>) {
    let reactor = Arc::new(ManualReactor::new());
    let (events, _) = flume::unbounded();
    let scheduler = Scheduler::with_config(
        reactor.clone(),
        events,
        SchedulerConfig {
            tick_interval: Duration::from_millis(1),
        },
    );
    (scheduler, reactor)
}

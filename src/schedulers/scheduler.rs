//! The process-wide cooperative scheduler.
//!
//! The scheduler owns a FIFO queue of [`WorkItem`]s and a drain tick that
//! it keeps rescheduling on the external reactor. Timers and I/O handlers
//! inject `(None, stage)` items into the same queue the drain consumes, so
//! externally-triggered work interleaves fairly with internally-generated
//! graph traversal. All dispatch happens inside the drain — one logical
//! thread of control — so stage-local state needs no locking.
//!
//! # Lifecycle
//!
//! Two states: **Stopped** (initial) and **Running**. `start` arms pending
//! registrations and schedules the tick; `stop` cancels the tick and every
//! owned timer/handler but *retains* queued items, so a stop/start cycle
//! resumes exactly where it left off. Registrations do not survive a stop.
//! A tick that fires while Stopped calls `start` — self-healing against a
//! stop/start race.
//!
//! # Ordering
//!
//! Items are processed strictly FIFO. Because a split enqueues its
//! branches instead of calling them, sibling branches interleave with all
//! other pending work; callers must not assume one sibling completes
//! before another starts.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::event_bus::Event;
use crate::graphs::pipeline::Pipeline;
use crate::graphs::WorkItem;
use crate::message::Message;
use crate::reactor::{Interest, IoWatch, Reactor, TimerId};
use crate::types::{StageHandle, StageId};

/// Scheduler tuning knobs, constructed by the process entry point.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Delay between drain ticks while the queue is empty. Bounded-latency
    /// polling, never a busy spin.
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
        }
    }
}

enum RegKind {
    Periodic(Duration),
    Delayed(Duration),
    // The watch moves into the reactor when armed.
    Handler(Option<(Box<dyn IoWatch>, Interest)>),
}

struct Registration {
    stage: StageId,
    kind: RegKind,
    armed: Option<TimerId>,
}

#[derive(Default)]
struct RunState {
    running: bool,
    tick: Option<TimerId>,
    registrations: Vec<Registration>,
}

impl RunState {
    fn new() -> Self {
        Self::default()
    }
}

struct SchedulerInner {
    config: SchedulerConfig,
    reactor: Arc<dyn Reactor>,
    pipeline: Mutex<Pipeline>,
    queue_tx: flume::Sender<WorkItem>,
    queue_rx: flume::Receiver<WorkItem>,
    events: flume::Sender<Event>,
    state: Mutex<RunState>,
}

/// Handle to the process scheduler. Cheap to clone; every clone drives the
/// same queue and pipeline.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Creates a stopped scheduler over the given reactor, reporting
    /// dropped work items to `events`.
    #[must_use]
    pub fn new(reactor: Arc<dyn Reactor>, events: flume::Sender<Event>) -> Self {
        Self::with_config(reactor, events, SchedulerConfig::default())
    }

    #[must_use]
    pub fn with_config(
        reactor: Arc<dyn Reactor>,
        events: flume::Sender<Event>,
        config: SchedulerConfig,
    ) -> Self {
        let (queue_tx, queue_rx) = flume::unbounded();
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                reactor,
                pipeline: Mutex::new(Pipeline::new()),
                queue_tx,
                queue_rx,
                events,
                state: Mutex::new(RunState::new()),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Stopped → Running. Arms pending registrations and schedules the
    /// drain tick. A no-op while already running.
    pub fn start(&self) {
        let mut state = self.lock_state();
        if state.running {
            return;
        }
        state.running = true;
        for registration in &mut state.registrations {
            if registration.armed.is_none() {
                Self::arm(&self.inner, registration);
            }
        }
        state.tick = Some(Self::schedule_tick(&self.inner));
        drop(state);

        tracing::info!("scheduler started");
        let _ = self.inner.events.send(Event::diagnostic("scheduler", "started"));
    }

    /// Running → Stopped. Cancels the tick and all owned timers/handlers;
    /// queued items are retained, not discarded. A no-op while stopped.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        if !state.running {
            return;
        }
        state.running = false;
        if let Some(tick) = state.tick.take() {
            self.inner.reactor.remove_timer(tick);
        }
        for registration in state.registrations.drain(..) {
            if let Some(id) = registration.armed {
                self.inner.reactor.remove_timer(id);
            }
        }
        drop(state);

        tracing::info!(queued = self.queued(), "scheduler stopped; queued items retained");
        let _ = self.inner.events.send(Event::diagnostic("scheduler", "stopped"));
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_state().running
    }

    /// Number of work items currently queued.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.inner.queue_rx.len()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Fires `(None, stage)` into the queue every `every`.
    pub fn periodic(&self, stage: StageHandle, every: Duration) {
        self.register(stage.id(), RegKind::Periodic(every));
    }

    /// Fires `(None, stage)` into the queue once, `after` from arming.
    pub fn delayed(&self, stage: StageHandle, after: Duration) {
        self.register(stage.id(), RegKind::Delayed(after));
    }

    /// Fires `(None, stage)` into the queue on each readiness notification
    /// for `watch`.
    pub fn handler(&self, stage: StageHandle, watch: Box<dyn IoWatch>, interest: Interest) {
        self.register(stage.id(), RegKind::Handler(Some((watch, interest))));
    }

    /// Injects a work item directly; the entry point for stages driven by
    /// neither timers nor upstream wiring.
    pub fn enqueue(&self, message: Option<Message>, stage: StageHandle) {
        let _ = self.inner.queue_tx.send(WorkItem {
            message,
            origin: None,
            stage: stage.id(),
        });
    }

    fn register(&self, stage: StageId, kind: RegKind) {
        let mut registration = Registration {
            stage,
            kind,
            armed: None,
        };
        let mut state = self.lock_state();
        if state.running {
            Self::arm(&self.inner, &mut registration);
        }
        state.registrations.push(registration);
    }

    fn arm(inner: &Arc<SchedulerInner>, registration: &mut Registration) {
        let stage = registration.stage;
        let tx = inner.queue_tx.clone();
        let enqueue = move || {
            let _ = tx.send(WorkItem {
                message: None,
                origin: None,
                stage,
            });
        };
        let id = match &mut registration.kind {
            RegKind::Periodic(every) => {
                inner.reactor.add_periodic_timer(*every, Box::new(enqueue))
            }
            RegKind::Delayed(after) => inner.reactor.add_timer(*after, Box::new(enqueue)),
            RegKind::Handler(slot) => match slot.take() {
                Some((watch, interest)) => {
                    inner.reactor.add_io_handler(watch, interest, Box::new(enqueue))
                }
                None => return,
            },
        };
        registration.armed = Some(id);
    }

    // ------------------------------------------------------------------
    // Draining
    // ------------------------------------------------------------------

    /// Drains every currently-queued item synchronously, returning how many
    /// were processed. This is the drain-tick body exposed for embedders
    /// and tests that drive the scheduler without a reactor.
    pub fn drain_now(&self) -> usize {
        Self::drain(&self.inner)
    }

    fn drain(inner: &Arc<SchedulerInner>) -> usize {
        let mut processed = 0;
        while let Ok(item) = inner.queue_rx.try_recv() {
            processed += 1;
            let outcome = inner
                .pipeline
                .lock()
                .expect("pipeline poisoned")
                .dispatch(item);
            match outcome {
                Ok(followups) => {
                    for followup in followups {
                        let _ = inner.queue_tx.send(followup);
                    }
                }
                Err(error) => {
                    // Per-item isolation: one malformed message must not
                    // starve the graph.
                    tracing::error!(stage = %error.stage, error = %error.source, "work item dropped");
                    let _ = inner
                        .events
                        .send(Event::dispatch_failed(&error.stage, error.source.to_string()));
                }
            }
        }
        processed
    }

    fn schedule_tick(inner: &Arc<SchedulerInner>) -> TimerId {
        let weak = Arc::downgrade(inner);
        inner.reactor.add_timer(
            inner.config.tick_interval,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Self::tick(&inner);
                }
            }),
        )
    }

    fn tick(inner: &Arc<SchedulerInner>) {
        let running = inner
            .state
            .lock()
            .expect("scheduler state poisoned")
            .running;
        if !running {
            // A tick that outlives stop() revives the loop rather than
            // silently dying between a racing stop/start pair.
            Scheduler {
                inner: inner.clone(),
            }
            .start();
            return;
        }
        Self::drain(inner);
        let tick = Self::schedule_tick(inner);
        inner
            .state
            .lock()
            .expect("scheduler state poisoned")
            .tick = Some(tick);
    }

    pub(crate) fn pipeline(&self) -> &Mutex<Pipeline> {
        &self.inner.pipeline
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RunState> {
        self.inner.state.lock().expect("scheduler state poisoned")
    }
}

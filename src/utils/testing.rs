//! Test-support stages and a hand-driven reactor.
//!
//! These are ordinary stage implementations — nothing in the engine treats
//! them specially — kept here so integration tests and downstream crates
//! can wire deterministic graphs without hand-rolling fixtures.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde_json::{json, Value};
use tokio::sync::Notify;

use crate::message::Message;
use crate::reactor::{Interest, IoWatch, Reactor, ReactorCallback, TimerId};
use crate::stage::{Action, Condition, Event, Source, StageError, Target};

// ============================================================================
// Sources
// ============================================================================

/// Emits a fixed list of messages, then `None` forever.
pub struct CannedSource {
    items: VecDeque<Message>,
}

impl CannedSource {
    pub fn new(items: Vec<Message>) -> Self {
        Self {
            items: items.into(),
        }
    }
}

impl Source for CannedSource {
    fn receive(&mut self) -> Result<Option<Message>, StageError> {
        Ok(self.items.pop_front())
    }
}

/// Emits `0, 1, 2, …` as JSON number bodies.
#[derive(Default)]
pub struct CountingSource {
    next: u64,
}

impl Source for CountingSource {
    fn receive(&mut self) -> Result<Option<Message>, StageError> {
        let value = self.next;
        self.next += 1;
        Ok(Some(Message::new(json!(value))))
    }
}

// ============================================================================
// Targets
// ============================================================================

/// Shared view into what a [`RecordingTarget`] has seen.
#[derive(Clone, Default)]
pub struct Recorded {
    entries: Arc<Mutex<Vec<Option<Message>>>>,
}

impl Recorded {
    pub fn snapshot(&self) -> Vec<Option<Message>> {
        self.entries.lock().expect("recorded poisoned").clone()
    }

    /// Bodies of the non-empty messages, in arrival order.
    pub fn bodies(&self) -> Vec<Value> {
        self.snapshot()
            .into_iter()
            .flatten()
            .map(|message| message.body)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("recorded poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records every message it is sent.
#[derive(Default)]
pub struct RecordingTarget {
    seen: Recorded,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the recorded messages; grab it before the target moves
    /// into the graph.
    pub fn records(&self) -> Recorded {
        self.seen.clone()
    }
}

impl Target for RecordingTarget {
    fn send(&mut self, message: Option<&Message>) -> Result<(), StageError> {
        self.seen
            .entries
            .lock()
            .expect("recorded poisoned")
            .push(message.cloned());
        Ok(())
    }
}

// ============================================================================
// Conditions, events, actions
// ============================================================================

/// Always answers with its fixed verdict.
pub struct FlagCondition(pub bool);

impl Condition for FlagCondition {
    fn satisfy(&mut self, _message: Option<&Message>) -> Result<bool, StageError> {
        Ok(self.0)
    }
}

/// Forwards its input unchanged.
pub struct PassEvent;

impl Event for PassEvent {
    fn occur(&mut self, message: Option<Message>) -> Result<Option<Message>, StageError> {
        Ok(message)
    }
}

/// Never fires: every input is a false alarm.
pub struct NullEvent;

impl Event for NullEvent {
    fn occur(&mut self, _message: Option<Message>) -> Result<Option<Message>, StageError> {
        Ok(None)
    }
}

/// Wraps the body under a fixed key, preserving the epoch.
pub struct StampAction(pub &'static str);

impl Action for StampAction {
    fn execute(&mut self, message: Option<Message>) -> Result<Option<Message>, StageError> {
        Ok(message.map(|message| {
            let mut wrapped = serde_json::Map::new();
            wrapped.insert(self.0.to_string(), message.body);
            Message {
                epoch: message.epoch,
                body: Value::Object(wrapped),
            }
        }))
    }
}

/// Fails every time; for exercising per-item error isolation.
pub struct FailingAction;

impl Action for FailingAction {
    fn execute(&mut self, _message: Option<Message>) -> Result<Option<Message>, StageError> {
        Err(StageError::Failed("injected failure".into()))
    }
}

// ============================================================================
// Reactor fixtures
// ============================================================================

struct ManualEntry {
    id: TimerId,
    periodic: bool,
    callback: ReactorCallback,
}

/// Reactor driven by hand: registrations queue up and fire only when the
/// test calls [`fire`](Self::fire). I/O handlers are treated like periodic
/// timers — readiness is whatever the test says it is.
#[derive(Default)]
pub struct ManualReactor {
    entries: Mutex<Vec<ManualEntry>>,
    removed: Mutex<FxHashSet<TimerId>>,
}

impl ManualReactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live registrations.
    pub fn pending(&self) -> usize {
        self.entries.lock().expect("manual reactor poisoned").len()
    }

    /// Fires every live registration once, returning how many fired.
    /// One-shot timers are retired; periodic timers and handlers re-queue.
    pub fn fire(&self) -> usize {
        // Take the entries out before invoking: a callback may register new
        // timers (the drain tick reschedules itself).
        let due: Vec<ManualEntry> = self
            .entries
            .lock()
            .expect("manual reactor poisoned")
            .drain(..)
            .collect();
        let mut fired = 0;
        for mut entry in due {
            if self
                .removed
                .lock()
                .expect("manual reactor poisoned")
                .contains(&entry.id)
            {
                continue;
            }
            (entry.callback)();
            fired += 1;
            if entry.periodic {
                self.entries
                    .lock()
                    .expect("manual reactor poisoned")
                    .push(entry);
            }
        }
        fired
    }

    fn insert(&self, periodic: bool, callback: ReactorCallback) -> TimerId {
        let id = TimerId::new();
        self.entries
            .lock()
            .expect("manual reactor poisoned")
            .push(ManualEntry {
                id,
                periodic,
                callback,
            });
        id
    }
}

impl Reactor for ManualReactor {
    fn add_timer(&self, _after: Duration, callback: ReactorCallback) -> TimerId {
        self.insert(false, callback)
    }

    fn add_periodic_timer(&self, _every: Duration, callback: ReactorCallback) -> TimerId {
        self.insert(true, callback)
    }

    fn add_io_handler(
        &self,
        _watch: Box<dyn IoWatch>,
        _interest: Interest,
        callback: ReactorCallback,
    ) -> TimerId {
        self.insert(true, callback)
    }

    fn remove_timer(&self, id: TimerId) {
        self.removed
            .lock()
            .expect("manual reactor poisoned")
            .insert(id);
        self.entries
            .lock()
            .expect("manual reactor poisoned")
            .retain(|entry| entry.id != id);
    }
}

/// [`IoWatch`] over a [`Notify`]: each `notify_one` is one readiness
/// notification. Lets tests stand in for socket readiness.
pub struct NotifyWatch {
    notify: Arc<Notify>,
}

impl NotifyWatch {
    /// The watch and the handle used to signal readiness.
    pub fn new() -> (Self, Arc<Notify>) {
        let notify = Arc::new(Notify::new());
        (
            Self {
                notify: notify.clone(),
            },
            notify,
        )
    }
}

#[async_trait]
impl IoWatch for NotifyWatch {
    async fn ready(&mut self, _interest: Interest) -> io::Result<()> {
        self.notify.notified().await;
        Ok(())
    }
}

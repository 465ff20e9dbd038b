//! Epoch-ordered priority queue and its gate stages.
//!
//! Messages are keyed by their offset from J2000 (lower epoch first);
//! insertion order breaks ties so equal epochs stay FIFO. The queue is
//! shared between a `put` gate in one scenario and a `get`/`peek` gate in
//! another via cheap clones.
//!
//! None of the gates ever block or fail on capacity: `put` on a full queue
//! and `get`/`peek` on an empty one route to the alternate branch, because
//! the cooperative scheduler must never stall a stage.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};

use crate::message::Message;
use crate::stage::StageError;

struct Entry {
    key: i64,
    seq: u64,
    message: Message,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.key, self.seq).cmp(&(other.key, other.seq))
    }
}

struct Inner {
    heap: BinaryHeap<Reverse<Entry>>,
    capacity: Option<usize>,
    seq: u64,
}

/// Shared epoch-priority queue.
///
/// # Examples
///
/// ```
/// use chrono::TimeDelta;
/// use serde_json::json;
/// use stageflow::control::EpochQueue;
/// use stageflow::message::{j2000, Message};
///
/// let queue = EpochQueue::unbounded();
/// queue.offer(&Message::at(j2000() + TimeDelta::seconds(10), json!("late"))).unwrap();
/// queue.offer(&Message::at(j2000() + TimeDelta::seconds(5), json!("early"))).unwrap();
///
/// assert_eq!(queue.pop().unwrap().body, json!("early"));
/// assert_eq!(queue.pop().unwrap().body, json!("late"));
/// assert!(queue.pop().is_none());
/// ```
#[derive(Clone)]
pub struct EpochQueue {
    inner: Arc<Mutex<Inner>>,
}

impl EpochQueue {
    /// A queue that refuses new entries beyond `capacity`.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                heap: BinaryHeap::new(),
                capacity: Some(capacity),
                seq: 0,
            })),
        }
    }

    /// A queue without a capacity limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                heap: BinaryHeap::new(),
                capacity: None,
                seq: 0,
            })),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().heap.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        let inner = self.lock();
        inner
            .capacity
            .is_some_and(|capacity| inner.heap.len() >= capacity)
    }

    /// Attempts to enqueue a message, returning `Ok(false)` when the queue
    /// is full. The message must carry an epoch.
    pub fn offer(&self, message: &Message) -> Result<bool, StageError> {
        let key = message
            .priority_key()
            .ok_or(StageError::MissingEpoch)?;
        let mut inner = self.lock();
        if inner
            .capacity
            .is_some_and(|capacity| inner.heap.len() >= capacity)
        {
            return Ok(false);
        }
        let seq = inner.seq;
        inner.seq += 1;
        inner.heap.push(Reverse(Entry {
            key,
            seq,
            message: message.clone(),
        }));
        tracing::debug!(priority = key, "queued message");
        Ok(true)
    }

    /// Removes and returns the lowest-epoch message.
    #[must_use]
    pub fn pop(&self) -> Option<Message> {
        let entry = self.lock().heap.pop()?;
        tracing::debug!(priority = entry.0.key, "dequeued message");
        Some(entry.0.message)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("epoch queue poisoned")
    }
}

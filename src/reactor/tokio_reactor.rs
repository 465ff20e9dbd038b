//! Tokio-backed reactor implementation.

use std::sync::Mutex;
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Interest, IoWatch, Reactor, ReactorCallback, TimerId};

/// Reactor built on a Tokio runtime.
///
/// Each registration spawns a lightweight task on the runtime; removal
/// aborts the task. The reactor only drives callbacks — all pipeline work
/// still happens inside the scheduler's drain tick, so a multi-threaded
/// runtime is safe here.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use stageflow::reactor::{Reactor, TokioReactor};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let reactor = Arc::new(TokioReactor::new());
/// let id = reactor.add_timer(
///     std::time::Duration::from_millis(10),
///     Box::new(|| tracing::debug!("fired")),
/// );
/// reactor.remove_timer(id);
/// # }
/// ```
pub struct TokioReactor {
    handle: Handle,
    tasks: Mutex<FxHashMap<TimerId, JoinHandle<()>>>,
}

impl TokioReactor {
    /// Creates a reactor on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime context; use
    /// [`with_handle`](Self::with_handle) from plain threads.
    #[must_use]
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Creates a reactor driving callbacks on an explicit runtime handle.
    #[must_use]
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            tasks: Mutex::new(FxHashMap::default()),
        }
    }

    /// Number of live registrations.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.tasks
            .lock()
            .expect("reactor task table poisoned")
            .len()
    }

    fn track(&self, id: TimerId, task: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().expect("reactor task table poisoned");
        // Expired one-shot timers leave finished handles behind; purge them
        // opportunistically instead of keeping a side channel per task.
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(id, task);
    }
}

impl Reactor for TokioReactor {
    fn add_timer(&self, after: Duration, mut callback: ReactorCallback) -> TimerId {
        let id = TimerId::new();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(after).await;
            callback();
        });
        self.track(id, task);
        id
    }

    fn add_periodic_timer(&self, every: Duration, mut callback: ReactorCallback) -> TimerId {
        let id = TimerId::new();
        let task = self.handle.spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately; swallow that so the first
            // callback lands one full period after registration.
            tick.tick().await;
            loop {
                tick.tick().await;
                callback();
            }
        });
        self.track(id, task);
        id
    }

    fn add_io_handler(
        &self,
        mut watch: Box<dyn IoWatch>,
        interest: Interest,
        mut callback: ReactorCallback,
    ) -> TimerId {
        let id = TimerId::new();
        let task = self.handle.spawn(async move {
            loop {
                match watch.ready(interest).await {
                    Ok(()) => callback(),
                    Err(error) => {
                        tracing::warn!(%error, "io watch failed; handler retired");
                        break;
                    }
                }
            }
        });
        self.track(id, task);
        id
    }

    fn remove_timer(&self, id: TimerId) {
        if let Some(task) = self
            .tasks
            .lock()
            .expect("reactor task table poisoned")
            .remove(&id)
        {
            task.abort();
        }
    }
}

impl Drop for TokioReactor {
    fn drop(&mut self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for (_, task) in tasks.drain() {
                task.abort();
            }
        }
    }
}

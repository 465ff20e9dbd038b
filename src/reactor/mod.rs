//! The minimal reactor surface the scheduler is built on.
//!
//! The engine never owns an event loop of its own: timers and I/O-readiness
//! callbacks come from an external reactor consumed through the
//! [`Reactor`] trait. [`TokioReactor`] is the implementation used by
//! segment processes; tests may substitute a hand-driven reactor (see
//! `utils::testing::ManualReactor`) to fire timers deterministically.

mod tokio_reactor;

pub use tokio_reactor::TokioReactor;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Identity of a reactor-owned timer or handler registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(Uuid);

impl TimerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// I/O readiness direction for handler registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
}

/// Callback invoked by the reactor when a timer fires or a handle becomes
/// ready. One-shot timers call it at most once; periodic timers and I/O
/// handlers call it repeatedly.
pub type ReactorCallback = Box<dyn FnMut() + Send>;

/// Readiness contract for I/O-driven sources.
///
/// The reactor awaits `ready` in a loop and invokes the registered callback
/// after each completion. An implementation typically wraps a socket's
/// readiness future; returning `Err` retires the handler.
#[async_trait]
pub trait IoWatch: Send + 'static {
    async fn ready(&mut self, interest: Interest) -> std::io::Result<()>;
}

/// External event loop surface.
///
/// Registration is synchronous; the callbacks fire on the reactor's own
/// thread(s). Removing an unknown id is a no-op, so callers may keep stale
/// ids for registrations that have already expired.
pub trait Reactor: Send + Sync {
    /// Arm a one-shot timer.
    fn add_timer(&self, after: Duration, callback: ReactorCallback) -> TimerId;

    /// Arm a recurring timer with a fixed period.
    fn add_periodic_timer(&self, every: Duration, callback: ReactorCallback) -> TimerId;

    /// Watch an I/O handle, invoking `callback` on each readiness
    /// notification.
    fn add_io_handler(
        &self,
        watch: Box<dyn IoWatch>,
        interest: Interest,
        callback: ReactorCallback,
    ) -> TimerId;

    /// Cancel a timer or handler registration.
    fn remove_timer(&self, id: TimerId);
}

//! Cooperative scheduling over an external reactor.
//!
//! One [`Scheduler`] per process drives every scenario graph through a
//! single FIFO work queue. See [`scheduler`] for the lifecycle and drain
//! semantics.

pub mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig};

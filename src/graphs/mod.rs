//! Graph definition and dispatch for pipeline execution.
//!
//! This module holds the two halves of the pipeline graph:
//!
//! - [`Program`] — the fluent builder wiring stages into behavior/scenario
//!   chains, with role adjacency enforced at construction time.
//! - the pipeline arena and its uniform dispatcher (crate-internal; the
//!   scheduler drives it one work item at a time and re-enqueues the
//!   follow-ups it returns).
//!
//! The graph is built once at segment startup and is immutable afterwards,
//! except for the epoch-window reference cells
//! ([`crate::control::window`]) and ordinary stage instance state.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use stageflow::event_bus::EventBus;
//! use stageflow::graphs::Program;
//! use stageflow::schedulers::Scheduler;
//! use stageflow::utils::testing::{CountingSource, ManualReactor, RecordingTarget};
//!
//! # fn main() -> Result<(), stageflow::graphs::GraphError> {
//! let bus = EventBus::default();
//! let scheduler = Scheduler::new(Arc::new(ManualReactor::new()), bus.get_sender());
//! let mut program = Program::new("demo", &scheduler);
//!
//! let counter = program.add_source("counter", CountingSource::default());
//! let recorder = RecordingTarget::new();
//! let records = recorder.records();
//! let sink = program.add_target("sink", recorder);
//!
//! program
//!     .behavior("demo")
//!     .scenario("count once")
//!     .from("counter emits", counter)?
//!     .to("record the value", sink)?;
//!
//! scheduler.enqueue(None, counter);
//! scheduler.drain_now();
//! assert_eq!(records.len(), 1);
//! # Ok(())
//! # }
//! ```

mod builder;
mod errors;
pub(crate) mod pipeline;

#[cfg(test)]
mod tests;

pub use builder::Program;
pub use errors::{DispatchError, GraphError};
pub use pipeline::WorkItem;

//! # Stageflow: Dataflow Pipelines for Simulation Segments
//!
//! Stageflow is the execution core shared by the segments of a distributed
//! simulation (clock, ground station, spacecraft, viewer): each segment
//! expresses its internal behavior as a declaratively-wired graph of
//! message-processing stages, driven by one cooperative scheduler over an
//! external reactor.
//!
//! ## Core Concepts
//!
//! - **Stages**: one-method units of work in five roles — Source, Target,
//!   Condition, Event, Action ([`stage`])
//! - **Messages**: epoch-optional JSON payloads ([`message`])
//! - **Programs**: fluent behavior/scenario wiring with role adjacency
//!   enforced at build time ([`graphs`])
//! - **Control stages**: split/merge fan-out and fan-in, epoch windows,
//!   priority-queue gates ([`control`])
//! - **Scheduler**: a single FIFO work queue drained by a self-rescheduling
//!   reactor tick ([`schedulers`], [`reactor`])
//!
//! ## Quick Start
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
//!
//! let mut program = Program::new("demo", &scheduler);
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
//!
//! In a real segment the reactor is [`reactor::TokioReactor`], sources are
//! socket wrappers or clock generators registered with periodic/delayed/
//! I/O triggers, and `scheduler.start()` replaces the manual drain.
//!
//! ## Error Handling
//!
//! Wiring mistakes fail at the builder call that caused them
//! ([`graphs::GraphError`]) — a malformed graph never reaches the
//! scheduler. Stage failures at run time are isolated per work item: the
//! drain logs them, reports them to the [`event_bus`], drops the item, and
//! keeps going.
//!
//! ## Module Guide
//!
//! - [`message`] - payloads and epoch utilities
//! - [`stage`] - the five role contracts and stage errors
//! - [`types`] - stage identities and the role tag set
//! - [`graphs`] - program builder and the pipeline dispatcher
//! - [`control`] - split/merge, epoch windows, priority-queue gates
//! - [`schedulers`] - the cooperative scheduler
//! - [`reactor`] - the external reactor surface and the Tokio impl
//! - [`event_bus`] - observability events and sinks
//! - [`telemetry`] - tracing setup and event formatting
//! - [`utils`] - test-support stages and fixtures

pub mod control;
pub mod event_bus;
pub mod graphs;
pub mod message;
pub mod reactor;
pub mod schedulers;
pub mod stage;
pub mod telemetry;
pub mod types;
pub mod utils;

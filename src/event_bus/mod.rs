//! Observability fan-out: events, the bus, and sinks.
//!
//! The engine never prints: the scheduler and interested stages emit
//! [`Event`]s through a flume channel, and the [`EventBus`] broadcasts
//! them to whatever sinks the process configured. Dispatch failures land
//! here as well as in the logs, so a dropped work item is always visible
//! to whatever is watching the segment.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, StageEvent};
pub use sink::{ChannelSink, EventSink, MemorySink, StdErrSink};

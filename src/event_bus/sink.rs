use std::io::{self, Result as IoResult, Stderr, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::event::Event;
use crate::telemetry::{PlainFormatter, TelemetryFormatter};

/// Abstraction over an output target that consumes full [`Event`] objects.
pub trait EventSink: Sync + Send {
    /// Handle a structured event. The sink decides how to format it.
    fn handle(&mut self, event: &Event) -> IoResult<()>;
}

/// Stderr sink with pluggable formatting.
pub struct StdErrSink<F: TelemetryFormatter = PlainFormatter> {
    handle: Stderr,
    formatter: F,
}

impl Default for StdErrSink {
    fn default() -> Self {
        Self {
            handle: io::stderr(),
            formatter: PlainFormatter::new(),
        }
    }
}

impl<F: TelemetryFormatter> StdErrSink<F> {
    pub fn with_formatter(formatter: F) -> Self {
        Self {
            handle: io::stderr(),
            formatter,
        }
    }
}

impl<F: TelemetryFormatter> EventSink for StdErrSink<F> {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        let rendered = self.formatter.render_event(event);
        self.handle.write_all(rendered.as_bytes())?;
        self.handle.flush()
    }
}

/// In-memory sink for tests and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured events.
    pub fn snapshot(&self) -> Vec<Event> {
        self.entries.lock().expect("memory sink poisoned").clone()
    }

    pub fn clear(&self) {
        self.entries.lock().expect("memory sink poisoned").clear();
    }
}

impl EventSink for MemorySink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.entries
            .lock()
            .expect("memory sink poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// Channel-based sink for streaming to async consumers (e.g. a viewer
/// segment's web feed). Events are forwarded without blocking.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn handle(&mut self, event: &Event) -> IoResult<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel receiver dropped"))
    }
}

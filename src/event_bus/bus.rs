use std::sync::{Arc, Mutex};
use tokio::{sync::oneshot, task};

use super::event::Event;
use super::sink::{EventSink, StdErrSink};

/// Receives events from the engine and broadcasts them to sinks.
///
/// The bus hands out cloneable senders ([`get_sender`](Self::get_sender));
/// the scheduler and any stage wanting observability emit through them. A
/// background listener task (started with
/// [`listen_for_events`](Self::listen_for_events)) fans received events
/// out to every registered sink.
pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    channel: (flume::Sender<Event>, flume::Receiver<Event>),
    listener: Mutex<Option<ListenerState>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdErrSink::default())
    }
}

impl EventBus {
    /// Creates a bus with a single sink.
    pub fn with_sink<T>(sink: T) -> Self
    where
        T: EventSink + 'static,
    {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Creates a bus with multiple sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            channel: flume::unbounded(),
            listener: Mutex::new(None),
        }
    }

    /// Adds a sink at runtime (useful for per-session streaming).
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks
            .lock()
            .expect("sink table poisoned")
            .push(Box::new(sink));
    }

    /// A sender producers use to emit events.
    pub fn get_sender(&self) -> flume::Sender<Event> {
        self.channel.0.clone()
    }

    /// Spawns the background listener that broadcasts received events to
    /// all sinks. Idempotent. Must be called inside a Tokio runtime.
    pub fn listen_for_events(&self) {
        let mut guard = self.listener.lock().expect("listener poisoned");
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sinks = self.sinks.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    recv = receiver.recv_async() => match recv {
                        Err(error) => {
                            tracing::warn!(%error, "event bus receiver closed");
                            break;
                        }
                        Ok(event) => {
                            let mut sinks = sinks.lock().expect("sink table poisoned");
                            for sink in sinks.iter_mut() {
                                if let Err(error) = sink.handle(&event) {
                                    tracing::warn!(%error, "event sink failed");
                                }
                            }
                        }
                    }
                }
            }
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stops the background listener, waiting for it to finish.
    pub async fn stop_listener(&self) {
        let state = {
            let mut guard = self.listener.lock().expect("listener poisoned");
            guard.take()
        };
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.listener.lock() {
            if let Some(state) = guard.take() {
                let _ = state.shutdown_tx.send(());
                state.handle.abort();
            }
        }
    }
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}

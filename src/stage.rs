//! Stage contracts for the stageflow pipeline engine.
//!
//! A stage is the unit of work in a pipeline: one node in one of five
//! roles, each a one-method contract. The engine's uniform dispatcher (in
//! [`crate::graphs`]) applies the role-specific forwarding rules; stage
//! implementations only supply the role operation itself.
//!
//! # Design Principles
//!
//! - **Stateful but synchronous**: a stage may carry instance state (an
//!   interpolator's cache, a merge's pending map), but each operation must
//!   return promptly. Long-running work belongs behind a reactor-driven
//!   source, never inside a dispatch call.
//! - **No recursive scheduling**: stage operations must not call back into
//!   the scheduler; routing intent is expressed entirely through return
//!   values.
//! - **Errors are per-item**: returning `Err` is fatal to the work item
//!   being processed, not to the pipeline. The drain loop logs the failure,
//!   reports it to the event bus, and keeps going.
//!
//! # Examples
//!
//! ```
//! use stageflow::message::Message;
//! use stageflow::stage::{Action, StageError};
//! use serde_json::json;
//!
//! /// Wraps every payload in an envelope naming this segment.
//! struct Envelope {
//!     segment: &'static str,
//! }
//!
//! impl Action for Envelope {
//!     fn execute(&mut self, message: Option<Message>) -> Result<Option<Message>, StageError> {
//!         let message = message.ok_or(StageError::MissingInput { what: "payload" })?;
//!         Ok(Some(Message {
//!             epoch: message.epoch,
//!             body: json!({"segment": self.segment, "payload": message.body}),
//!         }))
//!     }
//! }
//! ```

use miette::Diagnostic;
use thiserror::Error;

use crate::message::Message;

// ============================================================================
// Role contracts
// ============================================================================

/// Produces messages. A source ignores its input entirely; it is driven by
/// the scheduler (periodic/delayed timers, I/O readiness) or by an upstream
/// trigger, and whatever it returns — including `None` — is forwarded to
/// its single downstream.
pub trait Source: Send {
    fn receive(&mut self) -> Result<Option<Message>, StageError>;
}

/// Consumes messages as a side effect (a socket write, a log line). The
/// *same* message is forwarded to the target's downstream, which is what
/// makes target chaining work.
pub trait Target: Send {
    fn send(&mut self, message: Option<&Message>) -> Result<(), StageError>;
}

/// Routes a message. The unchanged message is forwarded to the true- or
/// false-branch according to the verdict.
pub trait Condition: Send {
    fn satisfy(&mut self, message: Option<&Message>) -> Result<bool, StageError>;
}

/// Detects an occurrence, transforming the message when it fires. Returning
/// `Ok(None)` is a silent "false alarm": the branch halts without error.
pub trait Event: Send {
    fn occur(&mut self, message: Option<Message>) -> Result<Option<Message>, StageError>;
}

/// Transforms a message. The output is forwarded unconditionally, even when
/// it is `None`.
pub trait Action: Send {
    fn execute(&mut self, message: Option<Message>) -> Result<Option<Message>, StageError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by stage operations during dispatch.
///
/// A `StageError` is fatal to the work item being processed: the drain loop
/// drops that item, reports it, and continues with the rest of the queue.
/// Backpressure and emptiness are *not* errors — the queue gates route them
/// as ordinary branches.
#[derive(Debug, Error, Diagnostic)]
pub enum StageError {
    /// Expected payload data was absent.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(stageflow::stage::missing_input),
        help("Check that the upstream stage produced the required payload.")
    )]
    MissingInput { what: &'static str },

    /// The message lacks the epoch required for time-gated routing.
    #[error("message lacks the epoch required for time-gated routing")]
    #[diagnostic(
        code(stageflow::stage::missing_epoch),
        help("Stamp an epoch on any payload that crosses a window predicate or priority queue.")
    )]
    MissingEpoch,

    /// A transport endpoint wrapped as a stage failed.
    #[error("transport error ({endpoint}): {message}")]
    #[diagnostic(code(stageflow::stage::transport))]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    /// Payload encoding or decoding failed.
    #[error(transparent)]
    #[diagnostic(code(stageflow::stage::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Free-form stage failure.
    #[error("stage failed: {0}")]
    #[diagnostic(code(stageflow::stage::failed))]
    Failed(String),
}

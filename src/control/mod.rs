//! Built-in control stages.
//!
//! Control stages shape the flow of messages without doing domain work:
//!
//! - **Split / Merge / Block** ([`fan`]): fan a message out to several
//!   branches through the work queue, collect one message per upstream into
//!   a single downstream emission, or swallow a branch explicitly.
//! - **Epoch windows** ([`window`]): `Before`/`After`/`Around` predicates
//!   comparing a message's epoch against a mutable reference cell with a
//!   fixed margin.
//! - **Priority queue gates** ([`queue`]): `put`/`get`/`peek` over an
//!   epoch-ordered queue, routing fullness and emptiness as branches
//!   instead of blocking or failing.
//!
//! Split and Merge are registered through
//! [`Program::add_split`](crate::graphs::Program::add_split) /
//! [`Program::add_merge`](crate::graphs::Program::add_merge) and carry the
//! [`SplitJoin`](crate::types::StageKind::SplitJoin) kind; the windows are
//! ordinary [`Condition`](crate::stage::Condition) implementations; the
//! queue gates are condition-shaped and bound with the builder's
//! `given(..)` / `is(..)` verbs.

pub mod fan;
pub mod queue;
pub mod window;

pub use queue::EpochQueue;
pub use window::{epoch_cell, After, Around, Before, EpochReader, EpochWriter};

//! Core identity types for the stageflow pipeline engine.
//!
//! This module defines the small value types used to name stages inside a
//! pipeline graph. The executable contracts live in [`crate::stage`]; the
//! graph itself lives in [`crate::graphs`].
//!
//! # Key Types
//!
//! - [`StageId`]: arena index identifying one stage slot in a pipeline
//! - [`StageKind`]: the closed set of stage roles
//! - [`StageHandle`]: a copyable (id, kind) pair handed out by the builder

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a stage slot within a pipeline graph.
///
/// Stage ids are handed out by the graph builder and stay valid for the
/// lifetime of the pipeline; they are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId(pub(crate) usize);

impl StageId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

/// The closed set of stage roles.
///
/// Every stage in a pipeline is exactly one of these. The first five map
/// one-to-one onto the role traits in [`crate::stage`]; [`SplitJoin`]
/// covers the built-in fan-out/fan-in hybrids (Split, Merge), which are
/// accepted wherever a Source or a Target is required.
///
/// The queue gates (`Put`/`Get`/`Peek`) and the epoch-window predicates
/// report themselves as [`Condition`]: they route a message to one of two
/// branches.
///
/// [`SplitJoin`]: StageKind::SplitJoin
/// [`Condition`]: StageKind::Condition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Produces messages; ignores its input.
    Source,
    /// Consumes messages as a side effect, forwarding them unchanged.
    Target,
    /// Routes an unchanged message to a true- or false-branch.
    Condition,
    /// Transforms a message, or swallows it as a "false alarm".
    Event,
    /// Transforms a message unconditionally.
    Action,
    /// Fan-out/fan-in hybrid; valid both as a chain source and as a sink.
    SplitJoin,
}

impl StageKind {
    /// Whether this kind may open a scenario chain (`from` verb).
    #[must_use]
    pub fn acts_as_source(self) -> bool {
        matches!(self, StageKind::Source | StageKind::SplitJoin)
    }

    /// Whether this kind may terminate a scenario chain (`to` verb).
    #[must_use]
    pub fn acts_as_target(self) -> bool {
        matches!(self, StageKind::Target | StageKind::SplitJoin)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Source => "Source",
            StageKind::Target => "Target",
            StageKind::Condition => "Condition",
            StageKind::Event => "Event",
            StageKind::Action => "Action",
            StageKind::SplitJoin => "SplitJoin",
        };
        write!(f, "{name}")
    }
}

/// Copyable reference to a registered stage.
///
/// Returned by the `add_*` registration methods on
/// [`Program`](crate::graphs::Program) and accepted by every builder verb
/// and by the scheduler's registration API. The same handle may appear in
/// several scenarios; that is how one stage (a Split, say) is sealed into
/// one chain and opened in another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StageHandle {
    pub(crate) id: StageId,
    pub(crate) kind: StageKind,
}

impl StageHandle {
    /// The stage's arena id.
    #[must_use]
    pub fn id(&self) -> StageId {
        self.id
    }

    /// The stage's role.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        self.kind
    }
}

impl fmt::Display for StageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.kind)
    }
}

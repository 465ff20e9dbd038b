//! The pipeline graph: stage slots, links, and the uniform dispatcher.
//!
//! The pipeline is an arena of stage slots indexed by [`StageId`]. Each
//! slot carries the stage body (one of the role contracts or a built-in
//! control stage), its downstream links shaped by role, its upstream list,
//! and — for sources — an optional external trigger consumed when the
//! builder registers the stage with the scheduler.
//!
//! Dispatch applies the role-specific forwarding rules and returns the
//! follow-up work items; it never executes a downstream stage directly.
//! The scheduler feeds items in one at a time, so the graph needs no
//! locking of its own beyond the mutex the scheduler wraps it in.

use std::time::Duration;

use crate::control::fan::Merge;
use crate::control::queue::EpochQueue;
use crate::message::Message;
use crate::reactor::{Interest, IoWatch};
use crate::stage::{Action, Condition, Event, Source, StageError, Target};
use crate::types::{StageHandle, StageId, StageKind};

use super::errors::{DispatchError, GraphError};

/// A queued (message, stage) pair awaiting dispatch.
///
/// `origin` names the inbound edge; merges use it to attribute arrivals to
/// upstreams. Items are created when dispatch yields follow-ups, consumed
/// exactly once by the drain tick, and never persisted.
#[derive(Debug)]
pub struct WorkItem {
    pub message: Option<Message>,
    pub origin: Option<StageId>,
    pub stage: StageId,
}

/// External trigger carried by a source until `from(..)` registers it.
pub(crate) enum Trigger {
    Periodic(Duration),
    Delayed(Duration),
    Handler {
        watch: Box<dyn IoWatch>,
        interest: Interest,
    },
}

pub(crate) enum StageBody {
    Source(Box<dyn Source>),
    Target(Box<dyn Target>),
    Condition(Box<dyn Condition>),
    Event(Box<dyn Event>),
    Action(Box<dyn Action>),
    Split,
    Merge(Merge),
    Block,
    Put(EpochQueue),
    Get(EpochQueue),
    Peek(EpochQueue),
}

impl StageBody {
    pub(crate) fn kind(&self) -> StageKind {
        match self {
            StageBody::Source(_) => StageKind::Source,
            StageBody::Target(_) | StageBody::Block => StageKind::Target,
            StageBody::Condition(_)
            | StageBody::Put(_)
            | StageBody::Get(_)
            | StageBody::Peek(_) => StageKind::Condition,
            StageBody::Event(_) => StageKind::Event,
            StageBody::Action(_) => StageKind::Action,
            StageBody::Split | StageBody::Merge(_) => StageKind::SplitJoin,
        }
    }

    fn links(&self) -> Links {
        match self.kind() {
            StageKind::Condition => Links::Branch {
                on_true: None,
                on_false: None,
            },
            StageKind::SplitJoin => match self {
                StageBody::Split => Links::Fanout {
                    children: Vec::new(),
                },
                _ => Links::Single { next: None },
            },
            _ => Links::Single { next: None },
        }
    }
}

enum Links {
    Single { next: Option<StageId> },
    Branch {
        on_true: Option<StageId>,
        on_false: Option<StageId>,
    },
    Fanout { children: Vec<StageId> },
}

struct Slot {
    label: String,
    body: StageBody,
    links: Links,
    upstreams: Vec<StageId>,
    trigger: Option<Trigger>,
    pending_branch: Option<bool>,
}

/// The stage arena for one process.
#[derive(Default)]
pub(crate) struct Pipeline {
    slots: Vec<Slot>,
}

impl Pipeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &mut self,
        label: &str,
        body: StageBody,
        trigger: Option<Trigger>,
    ) -> StageHandle {
        let id = StageId(self.slots.len());
        let kind = body.kind();
        let links = body.links();
        self.slots.push(Slot {
            label: label.to_string(),
            body,
            links,
            upstreams: Vec::new(),
            trigger,
            pending_branch: None,
        });
        tracing::debug!(stage = label, %kind, %id, "stage registered");
        StageHandle { id, kind }
    }

    pub(crate) fn label(&self, id: StageId) -> &str {
        &self.slots[id.index()].label
    }

    pub(crate) fn take_trigger(&mut self, id: StageId) -> Option<Trigger> {
        self.slots[id.index()].trigger.take()
    }

    /// Selects which branch of a condition the next link occupies.
    pub(crate) fn select_branch(&mut self, id: StageId, branch: bool) -> Result<(), GraphError> {
        let slot = &mut self.slots[id.index()];
        match slot.links {
            Links::Branch { .. } => {
                slot.pending_branch = Some(branch);
                Ok(())
            }
            _ => Err(GraphError::IsOutsideGiven { value: branch }),
        }
    }

    /// Binds `to` downstream of `from` and records the upstream edge.
    ///
    /// Bound links are immutable: rebinding a single child or a condition
    /// branch is a hard error, never an overwrite.
    pub(crate) fn link(&mut self, from: StageId, to: StageId) -> Result<(), GraphError> {
        {
            let slot = &mut self.slots[from.index()];
            match &mut slot.links {
                Links::Single { next } => {
                    if next.is_some() {
                        return Err(GraphError::TargetRebound {
                            stage: slot.label.clone(),
                        });
                    }
                    *next = Some(to);
                }
                Links::Branch { on_true, on_false } => {
                    let Some(branch) = slot.pending_branch else {
                        return Err(GraphError::BranchUnselected {
                            stage: slot.label.clone(),
                        });
                    };
                    let bound = if branch { on_true } else { on_false };
                    if bound.is_some() {
                        return Err(GraphError::BranchRebound {
                            stage: slot.label.clone(),
                            branch,
                        });
                    }
                    *bound = Some(to);
                }
                Links::Fanout { children } => {
                    if children.contains(&to) {
                        tracing::warn!(
                            split = %slot.label,
                            "branch already fanned out; duplicate added"
                        );
                    }
                    children.push(to);
                }
            }
        }

        let slot = &mut self.slots[to.index()];
        slot.upstreams.push(from);
        if let StageBody::Merge(merge) = &mut slot.body {
            merge.register_upstream(from);
        } else if slot.upstreams.len() > 1 {
            tracing::warn!(
                stage = %slot.label,
                upstreams = slot.upstreams.len(),
                "multiple upstreams feed a single-input stage"
            );
        }
        Ok(())
    }

    /// Applies the role-specific dispatch rule for one work item.
    pub(crate) fn dispatch(&mut self, item: WorkItem) -> Result<Vec<WorkItem>, DispatchError> {
        let WorkItem {
            message,
            origin,
            stage,
        } = item;
        let Some(slot) = self.slots.get_mut(stage.index()) else {
            return Err(DispatchError::new(
                &stage.to_string(),
                StageError::Failed("unknown stage id".into()),
            ));
        };
        let Slot {
            label, body, links, ..
        } = slot;
        tracing::debug!(stage = %label, kind = %body.kind(), "processing work item");

        let followups = match body {
            StageBody::Source(source) => {
                let produced = source
                    .receive()
                    .map_err(|e| DispatchError::new(label, e))?;
                forward(links, produced, stage)
            }
            StageBody::Target(target) => {
                target
                    .send(message.as_ref())
                    .map_err(|e| DispatchError::new(label, e))?;
                forward(links, message, stage)
            }
            StageBody::Condition(condition) => {
                let verdict = condition
                    .satisfy(message.as_ref())
                    .map_err(|e| DispatchError::new(label, e))?;
                route(links, verdict, message, stage, label)
            }
            StageBody::Event(event) => {
                match event
                    .occur(message)
                    .map_err(|e| DispatchError::new(label, e))?
                {
                    Some(out) => forward(links, Some(out), stage),
                    None => {
                        tracing::debug!(stage = %label, "false alarm; branch halted");
                        Vec::new()
                    }
                }
            }
            StageBody::Action(action) => {
                let out = action
                    .execute(message)
                    .map_err(|e| DispatchError::new(label, e))?;
                forward(links, out, stage)
            }
            StageBody::Split => {
                let Links::Fanout { children } = links else {
                    return Ok(Vec::new());
                };
                tracing::debug!(stage = %label, branches = children.len(), "fanning out");
                children
                    .iter()
                    .map(|child| WorkItem {
                        message: message.clone(),
                        origin: Some(stage),
                        stage: *child,
                    })
                    .collect()
            }
            StageBody::Merge(merge) => match merge.accept(label, origin, message) {
                Some(merged) => forward(links, Some(merged), stage),
                None => Vec::new(),
            },
            StageBody::Block => {
                tracing::debug!(stage = %label, "message blocked");
                forward(links, None, stage)
            }
            StageBody::Put(queue) => {
                let msg = message.ok_or_else(|| {
                    DispatchError::new(label, StageError::MissingInput { what: "message" })
                })?;
                let accepted = queue
                    .offer(&msg)
                    .map_err(|e| DispatchError::new(label, e))?;
                if !accepted {
                    tracing::debug!(stage = %label, "queue full; routing to alternate");
                }
                route(links, accepted, Some(msg), stage, label)
            }
            StageBody::Get(queue) => match queue.pop() {
                Some(popped) => route(links, true, Some(popped), stage, label),
                None => route(links, false, message, stage, label),
            },
            StageBody::Peek(queue) => {
                let available = !queue.is_empty();
                route(links, available, message, stage, label)
            }
        };
        Ok(followups)
    }
}

fn forward(links: &Links, message: Option<Message>, origin: StageId) -> Vec<WorkItem> {
    match links {
        Links::Single { next: Some(next) } => vec![WorkItem {
            message,
            origin: Some(origin),
            stage: *next,
        }],
        _ => Vec::new(),
    }
}

fn route(
    links: &Links,
    verdict: bool,
    message: Option<Message>,
    origin: StageId,
    label: &str,
) -> Vec<WorkItem> {
    let Links::Branch { on_true, on_false } = links else {
        return Vec::new();
    };
    let chosen = if verdict { on_true } else { on_false };
    match chosen {
        Some(next) => vec![WorkItem {
            message,
            origin: Some(origin),
            stage: *next,
        }],
        None => {
            tracing::trace!(stage = label, verdict, "selected branch unbound; halting");
            Vec::new()
        }
    }
}

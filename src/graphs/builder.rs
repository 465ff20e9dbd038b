//! The fluent graph builder.
//!
//! A [`Program`] wires stages into scenario chains against a scheduler.
//! Stages are registered once (`add_*`), yielding copyable handles; the
//! chain verbs then link them:
//!
//! ```text
//! program
//!     .behavior("telemetry handling")
//!     .scenario("downlink pass")
//!     .from("telemetry arrives", downlink)?     // Source (or Split/Merge)
//!     .when("frame decoded", decoder)?          // Event
//!     .given("inside the pass window", window)? // Condition
//!     .is(true)?
//!     .then("update state vector", propagate)?  // Action
//!     .to("publish state", publisher)?;         // Target — seals the chain
//! ```
//!
//! Role adjacency is enforced at each call: a verb handed the wrong stage
//! role, a verb out of sequence, or a rebinding of an already-bound link
//! fails synchronously with a descriptive [`GraphError`], so a malformed
//! graph can never reach the scheduler. `and(..)` repeats the previous
//! verb's role requirement, chaining another same-role stage off the
//! cursor (targets chain because a target forwards its input unchanged).
//!
//! `behavior(..)` is purely organizational; `scenario(..)` opens an
//! independent chain and resets the cursor. A source registered with a
//! trigger (periodic, delayed, I/O readiness) is registered with the
//! scheduler by the `from(..)` verb that first names it — not deferred to
//! run time.

use std::time::Duration;

use crate::control::queue::EpochQueue;
use crate::reactor::{Interest, IoWatch};
use crate::schedulers::Scheduler;
use crate::stage::{Action, Condition, Event, Source, Target};
use crate::types::{StageHandle, StageId, StageKind};

use super::errors::GraphError;
use super::pipeline::{StageBody, Trigger};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Verb {
    From,
    When,
    Given,
    Then,
    To,
}

impl Verb {
    fn name(self) -> &'static str {
        match self {
            Verb::From => "from",
            Verb::When => "when",
            Verb::Given => "given",
            Verb::Then => "then",
            Verb::To => "to",
        }
    }

    fn expects(self) -> &'static str {
        match self {
            Verb::From => "a Source (or a Split/Merge hybrid)",
            Verb::When => "an Event",
            Verb::Given => "a Condition",
            Verb::Then => "an Action",
            Verb::To => "a Target (or a Split/Merge hybrid)",
        }
    }

    fn accepts(self, kind: StageKind) -> bool {
        match self {
            Verb::From => kind.acts_as_source(),
            Verb::When => kind == StageKind::Event,
            Verb::Given => kind == StageKind::Condition,
            Verb::Then => kind == StageKind::Action,
            Verb::To => kind.acts_as_target(),
        }
    }
}

#[derive(Clone, Copy)]
enum Cursor {
    Empty,
    At {
        stage: StageId,
        kind: StageKind,
        verb: Verb,
    },
}

/// Builder for one segment's scenario graph.
///
/// See the [module docs](self) for the verb grammar. A program holds a
/// clone of the scheduler it builds against, so several programs may wire
/// into the same scheduler (typically one program per segment).
pub struct Program {
    name: String,
    scheduler: Scheduler,
    behavior: Option<String>,
    scenario: Option<String>,
    cursor: Cursor,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("name", &self.name)
            .field("behavior", &self.behavior)
            .field("scenario", &self.scenario)
            .finish_non_exhaustive()
    }
}

impl Program {
    pub fn new(name: impl Into<String>, scheduler: &Scheduler) -> Self {
        Self {
            name: name.into(),
            scheduler: scheduler.clone(),
            behavior: None,
            scenario: None,
            cursor: Cursor::Empty,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------
    // Stage registration
    // ------------------------------------------------------------------

    /// Registers a plain source, driven by upstream wiring or by direct
    /// scheduler injection.
    pub fn add_source(&mut self, label: &str, stage: impl Source + 'static) -> StageHandle {
        self.insert(label, StageBody::Source(Box::new(stage)), None)
    }

    /// Registers a source fired by a recurring timer.
    pub fn add_periodic_source(
        &mut self,
        label: &str,
        stage: impl Source + 'static,
        every: Duration,
    ) -> StageHandle {
        self.insert(
            label,
            StageBody::Source(Box::new(stage)),
            Some(Trigger::Periodic(every)),
        )
    }

    /// Registers a source fired once after a delay.
    pub fn add_delayed_source(
        &mut self,
        label: &str,
        stage: impl Source + 'static,
        after: Duration,
    ) -> StageHandle {
        self.insert(
            label,
            StageBody::Source(Box::new(stage)),
            Some(Trigger::Delayed(after)),
        )
    }

    /// Registers a source fired on I/O readiness.
    pub fn add_io_source(
        &mut self,
        label: &str,
        stage: impl Source + 'static,
        watch: Box<dyn IoWatch>,
        interest: Interest,
    ) -> StageHandle {
        self.insert(
            label,
            StageBody::Source(Box::new(stage)),
            Some(Trigger::Handler { watch, interest }),
        )
    }

    pub fn add_target(&mut self, label: &str, stage: impl Target + 'static) -> StageHandle {
        self.insert(label, StageBody::Target(Box::new(stage)), None)
    }

    pub fn add_condition(&mut self, label: &str, stage: impl Condition + 'static) -> StageHandle {
        self.insert(label, StageBody::Condition(Box::new(stage)), None)
    }

    pub fn add_event(&mut self, label: &str, stage: impl Event + 'static) -> StageHandle {
        self.insert(label, StageBody::Event(Box::new(stage)), None)
    }

    pub fn add_action(&mut self, label: &str, stage: impl Action + 'static) -> StageHandle {
        self.insert(label, StageBody::Action(Box::new(stage)), None)
    }

    /// Registers a fan-out stage; every chain that names it as a target
    /// adds an upstream, every chain that opens `from` it adds a branch.
    pub fn add_split(&mut self, label: &str) -> StageHandle {
        self.insert(label, StageBody::Split, None)
    }

    /// Registers a fan-in barrier; arity is the number of upstreams wired
    /// into it.
    pub fn add_merge(&mut self, label: &str) -> StageHandle {
        self.insert(label, StageBody::Merge(crate::control::fan::Merge::new()), None)
    }

    /// Registers a branch terminator: swallows its input and forwards an
    /// empty message downstream.
    pub fn add_block(&mut self, label: &str) -> StageHandle {
        self.insert(label, StageBody::Block, None)
    }

    /// Registers a priority-queue put gate. Routes true on acceptance,
    /// false when the queue is full.
    pub fn add_put(&mut self, label: &str, queue: &EpochQueue) -> StageHandle {
        self.insert(label, StageBody::Put(queue.clone()), None)
    }

    /// Registers a priority-queue get gate. Routes the popped message true,
    /// or the triggering message false when the queue is empty.
    pub fn add_get(&mut self, label: &str, queue: &EpochQueue) -> StageHandle {
        self.insert(label, StageBody::Get(queue.clone()), None)
    }

    /// Registers a non-consuming queue probe. Routes true while the queue
    /// holds messages.
    pub fn add_peek(&mut self, label: &str, queue: &EpochQueue) -> StageHandle {
        self.insert(label, StageBody::Peek(queue.clone()), None)
    }

    fn insert(&mut self, label: &str, body: StageBody, trigger: Option<Trigger>) -> StageHandle {
        self.scheduler
            .pipeline()
            .lock()
            .expect("pipeline poisoned")
            .insert(label, body, trigger)
    }

    // ------------------------------------------------------------------
    // Grouping
    // ------------------------------------------------------------------

    /// Opens an organizational group. No runtime effect.
    pub fn behavior(&mut self, name: &str) -> &mut Self {
        tracing::debug!(program = %self.name, behavior = name, "opening behavior");
        self.behavior = Some(name.to_string());
        self
    }

    /// Opens an independent scenario chain, resetting the cursor.
    pub fn scenario(&mut self, name: &str) -> &mut Self {
        tracing::debug!(
            program = %self.name,
            behavior = self.behavior.as_deref(),
            scenario = name,
            "opening scenario"
        );
        self.scenario = Some(name.to_string());
        self.cursor = Cursor::Empty;
        self
    }

    // ------------------------------------------------------------------
    // Chain verbs
    // ------------------------------------------------------------------

    /// Opens the chain at a source. If the source carries an external
    /// trigger it is registered with the scheduler here, exactly once.
    pub fn from(&mut self, label: &str, stage: StageHandle) -> Result<&mut Self, GraphError> {
        self.require_scenario("from", label)?;
        match self.cursor {
            Cursor::Empty => {}
            Cursor::At { verb: Verb::To, .. } => {
                return Err(GraphError::SealedScenario {
                    label: label.to_string(),
                })
            }
            Cursor::At { verb, .. } => {
                return Err(GraphError::MisplacedVerb {
                    verb: "from",
                    label: label.to_string(),
                    previous: verb.name(),
                })
            }
        }
        self.check_role(Verb::From, "from", label, stage)?;
        self.register_trigger(stage);
        self.cursor = Cursor::At {
            stage: stage.id(),
            kind: stage.kind(),
            verb: Verb::From,
        };
        Ok(self)
    }

    /// Attaches an event to a `from`/`when` cursor.
    pub fn when(&mut self, label: &str, stage: StageHandle) -> Result<&mut Self, GraphError> {
        self.chain("when", Verb::When, &[Verb::From, Verb::When], label, stage)
    }

    /// Attaches a condition; must be followed by [`is`](Self::is).
    pub fn given(&mut self, label: &str, stage: StageHandle) -> Result<&mut Self, GraphError> {
        self.chain(
            "given",
            Verb::Given,
            &[Verb::From, Verb::When, Verb::Given],
            label,
            stage,
        )
    }

    /// Selects which branch of the cursor condition the next verb wires.
    pub fn is(&mut self, branch: bool) -> Result<&mut Self, GraphError> {
        let Cursor::At {
            stage,
            kind: StageKind::Condition,
            ..
        } = self.cursor
        else {
            return Err(GraphError::IsOutsideGiven { value: branch });
        };
        self.scheduler
            .pipeline()
            .lock()
            .expect("pipeline poisoned")
            .select_branch(stage, branch)?;
        Ok(self)
    }

    /// Attaches an action.
    pub fn then(&mut self, label: &str, stage: StageHandle) -> Result<&mut Self, GraphError> {
        self.chain(
            "then",
            Verb::Then,
            &[Verb::From, Verb::When, Verb::Given],
            label,
            stage,
        )
    }

    /// Attaches a target, sealing the chain; only `and` may follow.
    pub fn to(&mut self, label: &str, stage: StageHandle) -> Result<&mut Self, GraphError> {
        self.chain(
            "to",
            Verb::To,
            &[Verb::From, Verb::When, Verb::Given, Verb::Then],
            label,
            stage,
        )
    }

    /// Repeats the previous verb's role requirement, chaining a same-role
    /// stage off the cursor.
    pub fn and(&mut self, label: &str, stage: StageHandle) -> Result<&mut Self, GraphError> {
        self.require_scenario("and", label)?;
        let Cursor::At {
            stage: cursor,
            verb,
            ..
        } = self.cursor
        else {
            return Err(GraphError::MisplacedVerb {
                verb: "and",
                label: label.to_string(),
                previous: "scenario start",
            });
        };
        self.check_role(verb, "and", label, stage)?;
        if verb == Verb::From {
            self.register_trigger(stage);
        }
        self.link(cursor, stage.id())?;
        self.cursor = Cursor::At {
            stage: stage.id(),
            kind: stage.kind(),
            verb,
        };
        Ok(self)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn chain(
        &mut self,
        verb_name: &'static str,
        verb: Verb,
        after: &[Verb],
        label: &str,
        stage: StageHandle,
    ) -> Result<&mut Self, GraphError> {
        self.require_scenario(verb_name, label)?;
        let Cursor::At {
            stage: cursor,
            verb: previous,
            ..
        } = self.cursor
        else {
            return Err(GraphError::MisplacedVerb {
                verb: verb_name,
                label: label.to_string(),
                previous: "scenario start",
            });
        };
        if previous == Verb::To {
            return Err(GraphError::SealedScenario {
                label: label.to_string(),
            });
        }
        if !after.contains(&previous) {
            return Err(GraphError::MisplacedVerb {
                verb: verb_name,
                label: label.to_string(),
                previous: previous.name(),
            });
        }
        self.check_role(verb, verb_name, label, stage)?;
        self.link(cursor, stage.id())?;
        self.cursor = Cursor::At {
            stage: stage.id(),
            kind: stage.kind(),
            verb,
        };
        Ok(self)
    }

    fn check_role(
        &self,
        verb: Verb,
        verb_name: &'static str,
        label: &str,
        stage: StageHandle,
    ) -> Result<(), GraphError> {
        if verb.accepts(stage.kind()) {
            Ok(())
        } else {
            Err(GraphError::RoleMismatch {
                verb: verb_name,
                label: label.to_string(),
                expected: verb.expects(),
                found: stage.kind(),
            })
        }
    }

    fn require_scenario(&self, verb: &'static str, label: &str) -> Result<(), GraphError> {
        if self.scenario.is_some() {
            Ok(())
        } else {
            Err(GraphError::NoScenario {
                verb,
                label: label.to_string(),
            })
        }
    }

    fn link(&mut self, from: StageId, to: StageId) -> Result<(), GraphError> {
        self.scheduler
            .pipeline()
            .lock()
            .expect("pipeline poisoned")
            .link(from, to)
    }

    fn register_trigger(&mut self, stage: StageHandle) {
        let trigger = self
            .scheduler
            .pipeline()
            .lock()
            .expect("pipeline poisoned")
            .take_trigger(stage.id());
        match trigger {
            Some(Trigger::Periodic(every)) => self.scheduler.periodic(stage, every),
            Some(Trigger::Delayed(after)) => self.scheduler.delayed(stage, after),
            Some(Trigger::Handler { watch, interest }) => {
                self.scheduler.handler(stage, watch, interest)
            }
            None => {}
        }
    }
}

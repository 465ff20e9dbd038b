//! Builder-level test suite: verb grammar, role adjacency, and link
//! immutability.

use std::sync::Arc;

use crate::graphs::{GraphError, Program};
use crate::schedulers::Scheduler;
use crate::utils::testing::{
    CountingSource, FlagCondition, ManualReactor, PassEvent, RecordingTarget, StampAction,
};

fn scheduler() -> Scheduler {
    // Event sends to a dropped receiver are ignored by the scheduler.
    let (events, _) = flume::unbounded();
    Scheduler::new(Arc::new(ManualReactor::new()), events)
}

#[test]
fn linear_chain_wires_cleanly() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src = program.add_source("src", CountingSource::default());
    let evt = program.add_event("evt", PassEvent);
    let act = program.add_action("act", StampAction("step"));
    let tgt = program.add_target("tgt", RecordingTarget::new());

    program
        .behavior("grammar")
        .scenario("full chain")
        .from("source", src)
        .unwrap()
        .when("event", evt)
        .unwrap()
        .then("action", act)
        .unwrap()
        .to("target", tgt)
        .unwrap();
}

#[test]
fn verbs_require_an_open_scenario() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src = program.add_source("src", CountingSource::default());

    let err = program.from("source", src).unwrap_err();
    assert!(matches!(err, GraphError::NoScenario { verb: "from", .. }));
}

#[test]
fn from_rejects_non_source_roles() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let act = program.add_action("act", StampAction("step"));

    let err = program
        .scenario("bad start")
        .from("not a source", act)
        .unwrap_err();
    match err {
        GraphError::RoleMismatch { verb, found, .. } => {
            assert_eq!(verb, "from");
            assert_eq!(found, crate::types::StageKind::Action);
        }
        other => panic!("expected RoleMismatch, got {other:?}"),
    }
}

#[test]
fn then_directly_after_then_is_rejected() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src = program.add_source("src", CountingSource::default());
    let a1 = program.add_action("a1", StampAction("one"));
    let a2 = program.add_action("a2", StampAction("two"));

    let err = program
        .scenario("double then")
        .from("source", src)
        .unwrap()
        .then("first", a1)
        .unwrap()
        .then("second", a2)
        .unwrap_err();
    match err {
        GraphError::MisplacedVerb {
            verb, previous, ..
        } => {
            assert_eq!(verb, "then");
            assert_eq!(previous, "then");
        }
        other => panic!("expected MisplacedVerb, got {other:?}"),
    }

    // The same pair chains fine through `and`.
    let a3 = program.add_action("a3", StampAction("three"));
    let src2 = program.add_source("src2", CountingSource::default());
    program
        .scenario("chained with and")
        .from("fresh source", src2)
        .unwrap()
        .then("first", a2)
        .unwrap()
        .and("second", a3)
        .unwrap();
}

#[test]
fn to_seals_the_chain() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src = program.add_source("src", CountingSource::default());
    let t1 = program.add_target("t1", RecordingTarget::new());
    let t2 = program.add_target("t2", RecordingTarget::new());
    let act = program.add_action("act", StampAction("step"));

    program
        .scenario("sealed")
        .from("source", src)
        .unwrap()
        .to("first target", t1)
        .unwrap();

    let err = program.then("too late", act).unwrap_err();
    assert!(matches!(err, GraphError::SealedScenario { .. }));

    // Target chaining through `and` is the one allowed continuation.
    program.and("chained target", t2).unwrap();
}

#[test]
fn rebinding_a_single_downstream_is_an_error() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src = program.add_source("src", CountingSource::default());
    let t1 = program.add_target("t1", RecordingTarget::new());
    let t2 = program.add_target("t2", RecordingTarget::new());

    program
        .scenario("first wiring")
        .from("source", src)
        .unwrap()
        .to("target", t1)
        .unwrap();

    let err = program
        .scenario("second wiring")
        .from("source", src)
        .unwrap()
        .to("other target", t2)
        .unwrap_err();
    assert!(matches!(err, GraphError::TargetRebound { .. }));
}

#[test]
fn given_requires_is_before_continuing() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src = program.add_source("src", CountingSource::default());
    let cond = program.add_condition("cond", FlagCondition(true));
    let act = program.add_action("act", StampAction("step"));

    let err = program
        .scenario("no is")
        .from("source", src)
        .unwrap()
        .given("gate", cond)
        .unwrap()
        .then("action", act)
        .unwrap_err();
    assert!(matches!(err, GraphError::BranchUnselected { .. }));
}

#[test]
fn condition_branches_bind_exactly_once() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src1 = program.add_source("src1", CountingSource::default());
    let src2 = program.add_source("src2", CountingSource::default());
    let cond = program.add_condition("cond", FlagCondition(true));
    let a1 = program.add_action("a1", StampAction("one"));
    let a2 = program.add_action("a2", StampAction("two"));

    program
        .scenario("true branch")
        .from("source", src1)
        .unwrap()
        .given("gate", cond)
        .unwrap()
        .is(true)
        .unwrap()
        .then("first consumer", a1)
        .unwrap();

    let err = program
        .scenario("true branch again")
        .from("other source", src2)
        .unwrap()
        .given("gate", cond)
        .unwrap()
        .is(true)
        .unwrap()
        .then("second consumer", a2)
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::BranchRebound { branch: true, .. }
    ));
}

#[test]
fn is_outside_a_condition_is_rejected() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src = program.add_source("src", CountingSource::default());

    let err = program
        .scenario("stray is")
        .from("source", src)
        .unwrap()
        .is(true)
        .unwrap_err();
    assert!(matches!(err, GraphError::IsOutsideGiven { value: true }));
}

#[test]
fn split_is_valid_as_both_chain_ends() {
    let scheduler = scheduler();
    let mut program = Program::new("test", &scheduler);
    let src = program.add_source("src", CountingSource::default());
    let split = program.add_split("fan");
    let t1 = program.add_target("t1", RecordingTarget::new());
    let t2 = program.add_target("t2", RecordingTarget::new());

    program
        .scenario("into the split")
        .from("source", src)
        .unwrap()
        .to("fan out", split)
        .unwrap();

    program
        .scenario("first branch")
        .from("fan out", split)
        .unwrap()
        .to("first", t1)
        .unwrap();

    program
        .scenario("second branch")
        .from("fan out", split)
        .unwrap()
        .to("second", t2)
        .unwrap();
}

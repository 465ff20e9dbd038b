//! Control-stage semantics: fan-out, fan-in, windows, queue gates, block.

mod common;

use chrono::{TimeZone, Utc};
use serde_json::json;

use common::manual_scheduler;
use stageflow::control::{epoch_cell, Before, EpochQueue};
use stageflow::graphs::Program;
use stageflow::message::Message;
use stageflow::utils::testing::{CannedSource, CountingSource, FlagCondition, RecordingTarget};

#[test]
fn split_enqueues_one_item_per_child() {
    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("fanout", &scheduler);

    let src = program.add_source("src", CountingSource::default());
    let split = program.add_split("fan");
    let recorders: Vec<_> = (0..3)
        .map(|i| {
            let target = RecordingTarget::new();
            let records = target.records();
            let handle = program.add_target(&format!("t{i}"), target);
            (handle, records)
        })
        .collect();

    program
        .scenario("into the fan")
        .from("source", src)
        .unwrap()
        .to("fan", split)
        .unwrap();
    for (i, (handle, _)) in recorders.iter().enumerate() {
        program
            .scenario(&format!("branch {i}"))
            .from("fan", split)
            .unwrap()
            .to("record", *handle)
            .unwrap();
    }

    scheduler.enqueue(Some(Message::new(json!("payload"))), split);
    scheduler.drain_now();

    for (_, records) in &recorders {
        assert_eq!(records.bodies(), vec![json!("payload")]);
    }
}

#[test]
fn split_branches_are_queued_not_called() {
    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("breadth", &scheduler);

    let src = program.add_source("src", CountingSource::default());
    let split = program.add_split("fan");
    let target = RecordingTarget::new();
    let records = target.records();
    let sink = program.add_target("sink", target);

    program
        .scenario("into the fan")
        .from("source", src)
        .unwrap()
        .to("fan", split)
        .unwrap();
    program
        .scenario("fan branch")
        .from("fan", split)
        .unwrap()
        .to("record", sink)
        .unwrap();

    // The split's child item goes to the queue tail, behind work that was
    // already pending when the split dispatched.
    scheduler.enqueue(Some(Message::new(json!("via split"))), split);
    scheduler.enqueue(Some(Message::new(json!("direct"))), sink);
    scheduler.drain_now();

    assert_eq!(records.bodies(), vec![json!("direct"), json!("via split")]);
}

#[test]
fn merge_emits_once_per_complete_round_in_registration_order() {
    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("fanin", &scheduler);

    let s1 = program.add_source("s1", CountingSource::default());
    let s2 = program.add_source("s2", CountingSource::default());
    let merge = program.add_merge("barrier");
    let target = RecordingTarget::new();
    let records = target.records();
    let sink = program.add_target("sink", target);

    program
        .scenario("first upstream")
        .from("s1", s1)
        .unwrap()
        .to("barrier", merge)
        .unwrap();
    program
        .scenario("second upstream")
        .from("s2", s2)
        .unwrap()
        .to("barrier", merge)
        .unwrap();
    program
        .scenario("downstream")
        .from("barrier", merge)
        .unwrap()
        .to("record", sink)
        .unwrap();

    scheduler.enqueue(None, s1);
    scheduler.drain_now();
    assert!(records.is_empty(), "partial round must not emit");

    scheduler.enqueue(None, s2);
    scheduler.drain_now();
    assert_eq!(records.bodies(), vec![json!([0, 0])]);
}

#[test]
fn merge_duplicate_arrival_overwrites_pending_value() {
    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("fanin", &scheduler);

    let s1 = program.add_source("s1", CountingSource::default());
    let s2 = program.add_source("s2", CountingSource::default());
    let merge = program.add_merge("barrier");
    let target = RecordingTarget::new();
    let records = target.records();
    let sink = program.add_target("sink", target);

    program
        .scenario("first upstream")
        .from("s1", s1)
        .unwrap()
        .to("barrier", merge)
        .unwrap();
    program
        .scenario("second upstream")
        .from("s2", s2)
        .unwrap()
        .to("barrier", merge)
        .unwrap();
    program
        .scenario("downstream")
        .from("barrier", merge)
        .unwrap()
        .to("record", sink)
        .unwrap();

    // s1 fires twice before s2 completes the round; its second value wins.
    scheduler.enqueue(None, s1);
    scheduler.enqueue(None, s1);
    scheduler.drain_now();
    scheduler.enqueue(None, s2);
    scheduler.drain_now();

    assert_eq!(records.bodies(), vec![json!([1, 0])]);
}

#[test]
fn bound_condition_routes_to_exactly_one_branch() {
    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("routing", &scheduler);

    let s1 = program.add_source("s1", CountingSource::default());
    let s2 = program.add_source("s2", CountingSource::default());
    let gate = program.add_condition("gate", FlagCondition(true));
    let yes = RecordingTarget::new();
    let yes_records = yes.records();
    let yes_sink = program.add_target("yes", yes);
    let no = RecordingTarget::new();
    let no_records = no.records();
    let no_sink = program.add_target("no", no);

    program
        .scenario("true branch")
        .from("s1", s1)
        .unwrap()
        .given("gate", gate)
        .unwrap()
        .is(true)
        .unwrap()
        .to("yes", yes_sink)
        .unwrap();
    program
        .scenario("false branch")
        .from("s2", s2)
        .unwrap()
        .given("gate", gate)
        .unwrap()
        .is(false)
        .unwrap()
        .to("no", no_sink)
        .unwrap();

    scheduler.enqueue(Some(Message::new(json!("ping"))), gate);
    scheduler.drain_now();

    assert_eq!(yes_records.bodies(), vec![json!("ping")]);
    assert!(no_records.is_empty());
}

#[test]
fn before_window_concrete_scenario() {
    // Reference epoch 2020-01-01T00:02:00Z, margin 60 s: the true/false
    // boundary sits at 00:01:00Z.
    let reference = Utc.with_ymd_and_hms(2020, 1, 1, 0, 2, 0).unwrap();
    let (_writer, reader) = epoch_cell(reference);

    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("windows", &scheduler);

    let s1 = program.add_source("s1", CountingSource::default());
    let s2 = program.add_source("s2", CountingSource::default());
    let gate = program.add_condition(
        "before window",
        Before::new(reader, chrono::TimeDelta::seconds(60)),
    );
    let early = RecordingTarget::new();
    let early_records = early.records();
    let early_sink = program.add_target("early", early);
    let late = RecordingTarget::new();
    let late_records = late.records();
    let late_sink = program.add_target("late", late);

    program
        .scenario("early branch")
        .from("s1", s1)
        .unwrap()
        .given("gate", gate)
        .unwrap()
        .is(true)
        .unwrap()
        .to("early", early_sink)
        .unwrap();
    program
        .scenario("late branch")
        .from("s2", s2)
        .unwrap()
        .given("gate", gate)
        .unwrap()
        .is(false)
        .unwrap()
        .to("late", late_sink)
        .unwrap();

    let at_00_00_30 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 30).unwrap();
    let at_00_01_30 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 1, 30).unwrap();
    scheduler.enqueue(Some(Message::at(at_00_00_30, json!("early"))), gate);
    scheduler.enqueue(Some(Message::at(at_00_01_30, json!("late"))), gate);
    scheduler.drain_now();

    assert_eq!(early_records.bodies(), vec![json!("early")]);
    assert_eq!(late_records.bodies(), vec![json!("late")]);
}

#[test]
fn queue_gates_order_by_epoch_and_route_emptiness() {
    let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let queue = EpochQueue::unbounded();

    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("queued", &scheduler);

    let s1 = program.add_source("s1", CountingSource::default());
    let s2 = program.add_source("s2", CountingSource::default());
    let s3 = program.add_source("s3", CountingSource::default());
    let s4 = program.add_source("s4", CountingSource::default());
    let put = program.add_put("hold", &queue);
    let get = program.add_get("release", &queue);

    let accepted = RecordingTarget::new();
    let accepted_records = accepted.records();
    let accepted_sink = program.add_target("accepted", accepted);
    let released = RecordingTarget::new();
    let released_records = released.records();
    let released_sink = program.add_target("released", released);
    let empty = RecordingTarget::new();
    let empty_records = empty.records();
    let empty_sink = program.add_target("empty", empty);

    program
        .scenario("hold accepted")
        .from("s1", s1)
        .unwrap()
        .given("hold", put)
        .unwrap()
        .is(true)
        .unwrap()
        .to("ack", accepted_sink)
        .unwrap();
    program
        .scenario("release in epoch order")
        .from("s2", s2)
        .unwrap()
        .given("release", get)
        .unwrap()
        .is(true)
        .unwrap()
        .to("out", released_sink)
        .unwrap();
    program
        .scenario("release on empty")
        .from("s3", s3)
        .unwrap()
        .given("release", get)
        .unwrap()
        .is(false)
        .unwrap()
        .to("starved", empty_sink)
        .unwrap();
    // Keep s4 wired so the put's false branch exists somewhere harmless.
    let overflow = RecordingTarget::new();
    let overflow_sink = program.add_target("overflow", overflow);
    program
        .scenario("hold refused")
        .from("s4", s4)
        .unwrap()
        .given("hold", put)
        .unwrap()
        .is(false)
        .unwrap()
        .to("overflow", overflow_sink)
        .unwrap();

    // Insertion order E1, E2, E3; epoch order E2, E1, E3.
    let e1 = Message::at(base + chrono::TimeDelta::seconds(10), json!("e1"));
    let e2 = Message::at(base + chrono::TimeDelta::seconds(5), json!("e2"));
    let e3 = Message::at(base + chrono::TimeDelta::seconds(20), json!("e3"));
    for message in [&e1, &e2, &e3] {
        scheduler.enqueue(Some(message.clone()), put);
    }
    scheduler.drain_now();
    assert_eq!(accepted_records.len(), 3);

    for _ in 0..3 {
        scheduler.enqueue(None, get);
    }
    scheduler.drain_now();
    assert_eq!(
        released_records.bodies(),
        vec![json!("e2"), json!("e1"), json!("e3")]
    );
    assert!(empty_records.is_empty());

    // A fourth get finds the queue empty and takes the alternate branch.
    scheduler.enqueue(None, get);
    scheduler.drain_now();
    assert_eq!(empty_records.len(), 1);
}

#[test]
fn full_put_routes_to_alternate_branch() {
    let base = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let queue = EpochQueue::bounded(1);

    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("bounded", &scheduler);

    let s1 = program.add_source("s1", CountingSource::default());
    let s2 = program.add_source("s2", CountingSource::default());
    let put = program.add_put("hold", &queue);

    let accepted = RecordingTarget::new();
    let accepted_records = accepted.records();
    let accepted_sink = program.add_target("accepted", accepted);
    let refused = RecordingTarget::new();
    let refused_records = refused.records();
    let refused_sink = program.add_target("refused", refused);

    program
        .scenario("accepted")
        .from("s1", s1)
        .unwrap()
        .given("hold", put)
        .unwrap()
        .is(true)
        .unwrap()
        .to("ack", accepted_sink)
        .unwrap();
    program
        .scenario("refused")
        .from("s2", s2)
        .unwrap()
        .given("hold", put)
        .unwrap()
        .is(false)
        .unwrap()
        .to("overflow", refused_sink)
        .unwrap();

    scheduler.enqueue(
        Some(Message::at(base, json!("kept"))),
        put,
    );
    scheduler.enqueue(
        Some(Message::at(base + chrono::TimeDelta::seconds(1), json!("spill"))),
        put,
    );
    scheduler.drain_now();

    assert_eq!(accepted_records.bodies(), vec![json!("kept")]);
    assert_eq!(refused_records.bodies(), vec![json!("spill")]);
}

#[test]
fn block_swallows_the_message_but_keeps_the_chain_alive() {
    let (scheduler, _reactor) = manual_scheduler();
    let mut program = Program::new("blocked", &scheduler);

    let src = program.add_source(
        "src",
        CannedSource::new(vec![Message::new(json!("secret"))]),
    );
    let block = program.add_block("blackout");
    let target = RecordingTarget::new();
    let records = target.records();
    let sink = program.add_target("sink", target);

    program
        .scenario("blocked path")
        .from("source", src)
        .unwrap()
        .to("blackout", block)
        .unwrap()
        .and("observer", sink)
        .unwrap();

    scheduler.enqueue(None, src);
    scheduler.drain_now();

    // The observer is reached, but the payload is gone.
    assert_eq!(records.snapshot(), vec![None]);
}

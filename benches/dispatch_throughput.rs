use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;

use stageflow::graphs::Program;
use stageflow::message::Message;
use stageflow::schedulers::Scheduler;
use stageflow::utils::testing::{CountingSource, ManualReactor, StampAction};

fn drain_throughput(c: &mut Criterion) {
    let (events, _) = flume::unbounded();
    let scheduler = Scheduler::new(Arc::new(ManualReactor::new()), events);
    let mut program = Program::new("bench", &scheduler);

    let src = program.add_source("src", CountingSource::default());
    let act = program.add_action("act", StampAction("hop"));
    let sink = program.add_block("sink");

    program
        .scenario("chain")
        .from("src", src)
        .unwrap()
        .then("act", act)
        .unwrap()
        .to("sink", sink)
        .unwrap();

    let payload = Message::new(json!({"telemetry": [1.0, 2.0, 3.0]}));

    c.bench_function("drain_256_items_through_a_three_stage_chain", |b| {
        b.iter(|| {
            for _ in 0..256 {
                scheduler.enqueue(Some(payload.clone()), act);
            }
            scheduler.drain_now()
        })
    });
}

criterion_group!(benches, drain_throughput);
criterion_main!(benches);

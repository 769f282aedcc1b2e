use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fleetwatch_engine::{
    DispatchMode, GroupWatcher, HealthEngine, Predicate, StatusTransition, TieredChecker,
};
use fleetwatch_types::{AttributeSnapshot, AttributeValue, Span};
use std::sync::Arc;
use std::thread;

fn latency(ms: i64) -> AttributeSnapshot {
    let mut snapshot = AttributeSnapshot::new();
    snapshot.insert("latency".into(), AttributeValue::Int(ms));
    snapshot
}

fn engine_with_groups(groups: usize, dispatch: DispatchMode) -> Arc<HealthEngine> {
    let engine = HealthEngine::builder().dispatch(dispatch).build().unwrap();
    for g in 0..groups {
        engine
            .register_group(
                GroupWatcher::builder(format!("group-{}", g))
                    .checker(
                        "latency",
                        TieredChecker::colored(
                            Predicate::less_than(1000.0),
                            Some(Predicate::between(1000.0, 2000.0)),
                        ),
                    )
                    .trigger(|t: &StatusTransition| {
                        black_box(t);
                    }),
            )
            .unwrap();
    }
    Arc::new(engine)
}

/// Benchmark status updates with varying thread counts, one group per thread (no contention)
fn bench_updates_separate_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("updates_separate_groups");

    for thread_count in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(*thread_count as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::new("threads", thread_count),
            thread_count,
            |b, &thread_count| {
                let engine = engine_with_groups(thread_count, DispatchMode::Inline);
                b.iter(|| {
                    let handles: Vec<_> = (0..thread_count)
                        .map(|t| {
                            let engine = Arc::clone(&engine);
                            thread::spawn(move || {
                                let group = format!("group-{}", t);
                                for i in 0..1000i64 {
                                    engine
                                        .update_status(&group, "r", &latency(black_box(i * 3)))
                                        .unwrap();
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }
                });
            },
        );
    }
    group.finish();
}

/// Benchmark status updates into one shared group (high contention), inline vs worker dispatch
fn bench_updates_same_group(c: &mut Criterion) {
    let mut group = c.benchmark_group("updates_same_group");

    let modes = [
        ("inline", DispatchMode::Inline),
        ("worker", DispatchMode::Worker { queue_capacity: 1024 }),
    ];
    for (label, mode) in modes.iter() {
        group.throughput(Throughput::Elements(4 * 1000));
        group.bench_function(*label, |b| {
            let engine = engine_with_groups(1, *mode);
            b.iter(|| {
                let handles: Vec<_> = (0..4)
                    .map(|t| {
                        let engine = Arc::clone(&engine);
                        thread::spawn(move || {
                            let resource = format!("r{}", t);
                            for i in 0..1000i64 {
                                engine
                                    .update_status("group-0", &resource, &latency((i * 7) % 3000))
                                    .unwrap();
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark spans and status updates flowing in parallel
fn bench_mixed_telemetry(c: &mut Criterion) {
    c.bench_function("mixed_telemetry", |b| {
        let engine = engine_with_groups(4, DispatchMode::Inline);
        b.iter(|| {
            let spans = {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..1000 {
                        let trace = format!("t{}", i);
                        engine
                            .accept(&Span::builder("gateway", "gw", trace.as_str(), "1").build())
                            .unwrap();
                        engine
                            .accept(&Span::builder("orders", "o", trace.as_str(), "2").parent("1").build())
                            .unwrap();
                    }
                })
            };
            let updates = {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..1000i64 {
                        let group = format!("group-{}", i % 4);
                        engine.update_status(&group, "r", &latency(i)).unwrap();
                    }
                })
            };
            spans.join().unwrap();
            updates.join().unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_updates_separate_groups,
    bench_updates_same_group,
    bench_mixed_telemetry,
);
criterion_main!(benches);

//! Benchmarks for the allocation hot paths.
//!
//! Benchmarks cover:
//! - Queue operations (enqueue/dequeue, O(1) position lookup, filter, sort)
//! - Query parsing and evaluation
//! - End-to-end allocate/release churn through the service

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use unit_allocator::builders::ServiceBuilder;
use unit_allocator::config::{ServiceConfig, UnitConfig};
use unit_allocator::core::query;
use unit_allocator::core::{Invocation, InvocationQueue, Topology, Unit};
use unit_allocator::runtime::{AllocateRequest, AllocateResponse, InvocationDraft, ReleaseRequest};
use unit_allocator::util::{ManualClock, SequentialIdSource};

// ============================================================================
// Helper Functions
// ============================================================================

fn build_invocation(id: u64) -> Invocation {
    Invocation {
        id: format!("inv-{id}"),
        owner: format!("owner-{}", id % 10),
        purpose: format!("//hw/bench:target-{id}"),
        last_checkin: id as u128,
        queue_id: 0,
        topologies: vec![Topology::named("topoA")],
    }
}

fn build_queue(size: u64) -> InvocationQueue {
    let mut q = InvocationQueue::new();
    for i in 0..size {
        q.enqueue(build_invocation(i));
    }
    q
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn bench_queue_enqueue_dequeue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_enqueue_dequeue");

    for size in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut q = build_queue(size);
                while let Some(inv) = q.dequeue() {
                    black_box(inv);
                }
            });
        });
    }
    group.finish();
}

fn bench_queue_position_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_position_lookup");

    // Position is head-anchored arithmetic, so lookups should be flat
    // across queue sizes once the entry is in hand.
    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let q = build_queue(size);
            let tail = format!("inv-{}", size - 1);
            b.iter(|| {
                let (pos, inv) = q.get(&tail).unwrap();
                black_box((pos, q.position(inv)));
            });
        });
    }
    group.finish();
}

fn bench_queue_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_filter");

    for size in [100, 1_000, 5_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut q = build_queue(size);
                // Expire the older half by heartbeat.
                let removed = q.expire_queued((size / 2) as u128);
                black_box(removed);
            });
        });
    }
    group.finish();
}

fn bench_queue_priority_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_priority_sort");

    for size in [100, 1_000, 5_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut q = build_queue(size);
                q.sort(|a, b| a.owner.cmp(&b.owner));
                black_box(q.len());
            });
        });
    }
    group.finish();
}

// ============================================================================
// Query Benchmarks
// ============================================================================

fn bench_query_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_evaluate");

    let mut topology = Topology::named("gpu-4x");
    topology
        .attributes
        .insert("numGpus".to_string(), "4".to_string());
    topology
        .attributes
        .insert("ram".to_string(), "8388608".to_string());
    let unit = Unit::new(topology);

    let queries = [
        ("simple_eq", "numGpus = 4"),
        ("magnitude_gte", "ram >= 8M"),
        (
            "compound",
            "numGpus = 2 AND ram >= 8M OR numGpus = 4 AND ram >= 4M",
        ),
    ];
    for (name, q) in queries {
        group.bench_function(name, |b| {
            b.iter(|| black_box(query::evaluate(q, &unit)));
        });
    }
    group.finish();
}

// ============================================================================
// End-to-End Scenario Benchmarks
// ============================================================================

fn bench_allocate_release_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_release_churn");

    for fleet in [10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(fleet), &fleet, |b, &fleet| {
            b.iter(|| {
                let units = (0..fleet)
                    .map(|i| UnitConfig {
                        topology: Topology::named(format!("topo-{i}")),
                    })
                    .collect();
                let service = ServiceBuilder::new(ServiceConfig::with_units(units))
                    .with_clock(Arc::new(ManualClock::new(1_000_000)))
                    .with_id_source(Arc::new(SequentialIdSource::default()))
                    .build()
                    .unwrap();
                service.finish_adoption();

                // Twice-oversubscribed fleet: every unit gets an occupant
                // plus one queued waiter, then everything drains.
                let mut ids = Vec::with_capacity(fleet * 2);
                for round in 0..2 {
                    for i in 0..fleet {
                        let resp = service
                            .allocate(AllocateRequest {
                                invocation: InvocationDraft {
                                    id: String::new(),
                                    owner: format!("owner-{round}"),
                                    purpose: String::new(),
                                    topologies: vec![Topology::named(format!("topo-{i}"))],
                                },
                            })
                            .unwrap();
                        match resp {
                            AllocateResponse::Allocated(a) => ids.push(a.id),
                            AllocateResponse::Queued(q) => ids.push(q.id),
                        }
                    }
                }
                for id in ids {
                    let _ = black_box(service.release(ReleaseRequest { id }));
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(
    queue_benches,
    bench_queue_enqueue_dequeue,
    bench_queue_position_lookup,
    bench_queue_filter,
    bench_queue_priority_sort
);

criterion_group!(query_benches, bench_query_evaluate);

criterion_group!(scenario_benches, bench_allocate_release_churn);

criterion_main!(queue_benches, query_benches, scenario_benches);

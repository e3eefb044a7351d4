//! Performance benchmarks for gridsync-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridsync_engine::{
    value::fields, Change, ConflictResolver, GroupingStrategy, LogicalClock, Operation, Replica,
    ResolverOptions, Table,
};

/// `writers` replicas each edit `rows` rows concurrently after a shared insert.
fn concurrent_ops(writers: usize, rows: usize) -> Vec<Operation> {
    let mut seed = Replica::new("seed").unwrap();
    let inserts: Vec<Operation> = (0..rows)
        .map(|r| {
            seed.create_operation(
                format!("row_{}", r),
                Change::insert(fields([("qty", 0i64)])),
                0,
            )
        })
        .collect();

    let mut ops = inserts.clone();
    for w in 0..writers {
        let mut replica = Replica::new(format!("writer_{}", w)).unwrap();
        for op in &inserts {
            replica.receive_operation(op.clone());
        }
        for r in 0..rows {
            let field = if r % 2 == 0 { "qty" } else { "name" };
            ops.push(replica.create_operation(
                format!("row_{}", r),
                Change::update(field, w as i64),
                1000 + w as u64,
            ));
        }
    }
    ops
}

fn bench_clock(c: &mut Criterion) {
    let mut group = c.benchmark_group("clock");

    let a = LogicalClock::from_entries((0..16).map(|i| (format!("r{}", i), i as u64)));
    let b = LogicalClock::from_entries((0..16).map(|i| (format!("r{}", i), 16 - i as u64)));

    group.bench_function("compare_16", |bench| {
        bench.iter(|| black_box(&a).compare(black_box(&b)))
    });

    group.bench_function("merge_16", |bench| {
        bench.iter(|| {
            let mut m = a.clone();
            m.merge(black_box(&b));
            m
        })
    });

    group.finish();
}

fn bench_replica(c: &mut Criterion) {
    let mut group = c.benchmark_group("replica");

    group.bench_function("create_operation", |b| {
        let mut replica = Replica::new("node1").unwrap();
        let mut id = 0u64;
        b.iter(|| {
            id += 1;
            replica.create_operation(
                format!("row_{}", id % 100),
                Change::update("qty", id as i64),
                black_box(id),
            )
        })
    });

    group.bench_function("receive_duplicate", |b| {
        let mut sender = Replica::new("sender").unwrap();
        let op = sender.create_operation("row_1", Change::Delete, 1);
        let mut replica = Replica::new("node1").unwrap();
        replica.receive_operation(op.clone());
        b.iter(|| replica.receive_operation(black_box(op.clone())))
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for writers in [2usize, 8, 32].iter() {
        let ops = concurrent_ops(*writers, 20);
        let base = Table::new();

        for grouping in [GroupingStrategy::Seed, GroupingStrategy::Closure] {
            let resolver = ConflictResolver::new(ResolverOptions { grouping });
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", grouping), writers),
                &ops,
                |b, ops| b.iter(|| resolver.resolve(black_box(ops), &base)),
            );
        }
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");

    let mut replica = Replica::new("node1").unwrap();
    let op = replica.create_operation(
        "row_1",
        Change::insert(fields([("name", "Test"), ("unit", "kg")])),
        1000,
    );
    let json = op.to_json().unwrap();

    group.bench_function("operation_to_json", |b| {
        b.iter(|| black_box(&op).to_json())
    });

    group.bench_function("operation_from_json", |b| {
        b.iter(|| Operation::from_json(black_box(&json)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_clock,
    bench_replica,
    bench_resolution,
    bench_serialization,
);
criterion_main!(benches);

//! Benchmarks for covpool
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn benchmark_pool_throughput(c: &mut Criterion) {
    use covpool::{PoolConfig, WorkerPool};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    c.bench_function("pool_submit_wait_1k_tasks", |b| {
        b.iter(|| {
            let pool = WorkerPool::new(PoolConfig::new(4).unwrap()).unwrap();
            let counter = Arc::new(AtomicU64::new(0));

            for _ in 0..1_000 {
                let counter = Arc::clone(&counter);
                pool.submit(move |_ctx| {
                    counter.fetch_add(1, Ordering::Relaxed);
                    Ok(())
                });
            }

            pool.wait().unwrap();
            black_box(counter.load(Ordering::Relaxed));
        })
    });
}

fn benchmark_gate_uncontended(c: &mut Criterion) {
    use covpool::DirectoryGate;

    c.bench_function("gate_lock_release", |b| {
        let gate = DirectoryGate::new();

        b.iter(|| {
            let hold = gate.lock("/build/objs");
            black_box(hold.path());
        })
    });
}

fn benchmark_aggregator_update(c: &mut Criterion) {
    use covpool::ResultAggregator;

    c.bench_function("aggregator_update_same_key", |b| {
        let agg: ResultAggregator<&str, u64> = ResultAggregator::new();

        b.iter(|| {
            agg.update("main.c", |count| *count += 1);
        });

        black_box(agg.get(&"main.c"));
    });
}

criterion_group!(
    benches,
    benchmark_pool_throughput,
    benchmark_gate_uncontended,
    benchmark_aggregator_update
);
criterion_main!(benches);

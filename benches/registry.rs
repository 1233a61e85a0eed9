//! Benchmarks for the callback registry.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use stop_dispatcher::Callback;
use stop_dispatcher::dispatcher::CallbackRegistry;

fn populated(count: usize, tiers: i32) -> CallbackRegistry {
    let registry = CallbackRegistry::new();
    for i in 0..count {
        registry.register(i as i32 % tiers, Callback::noop());
    }
    registry
}

fn benchmark_register(c: &mut Criterion) {
    c.bench_function("register_1000_mixed_priorities", |b| {
        b.iter(|| black_box(populated(1000, 16)))
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let registry = populated(1000, 16);

    c.bench_function("snapshot_1000", |b| {
        b.iter(|| black_box(registry.snapshot()))
    });
}

fn benchmark_unregister(c: &mut Criterion) {
    c.bench_function("unregister_half_of_1000", |b| {
        b.iter_batched(
            || {
                let registry = CallbackRegistry::new();
                let handles: Vec<_> = (0..1000)
                    .map(|i| registry.register(i % 4, Callback::noop()))
                    .collect();
                (registry, handles)
            },
            |(registry, handles)| {
                for handle in handles.iter().step_by(2) {
                    handle.unregister();
                }
                black_box(registry.len())
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    benchmark_register,
    benchmark_snapshot,
    benchmark_unregister
);
criterion_main!(benches);

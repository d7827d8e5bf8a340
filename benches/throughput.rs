//! Throughput Benchmark for BlinkCache
//!
//! Measures the shard under various workloads, separating the lock-free
//! fast path from the dirty path and the cost of promotion itself.

use blinkcache::store::{Entry, GateConfig, Shard, ShardConfig, StringStore, Value};
use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

/// A shard whose gate never fires, so benchmarks control promotion.
fn bench_shard() -> Arc<Shard> {
    Shard::with_config(ShardConfig {
        gate: GateConfig {
            sample_mask: u64::MAX,
            ..Default::default()
        },
        ..Default::default()
    })
}

fn string_entry(value: Bytes) -> Entry {
    Entry::new(Value::String(value))
}

/// Promotes until the shard has no dirty buckets left.
fn drain(shard: &Shard) {
    while shard.stats().dirty_buckets > 0 {
        shard.promote();
    }
}

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let shard = bench_shard();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            shard.set(key, string_entry(Bytes::from("small_value")));
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            shard.set(key, string_entry(value.clone()));
            i += 1;
        });
    });

    group.bench_function("set_overwrite", |b| {
        let key = Bytes::from("hot-key");
        b.iter(|| {
            shard.set(key.clone(), string_entry(Bytes::from("value")));
        });
    });

    group.finish();
}

/// Benchmark GET operations on both tiers
fn bench_get(c: &mut Criterion) {
    let shard = bench_shard();

    // Pre-populate and promote everything into the fast view
    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        shard.set(key, string_entry(Bytes::from(format!("value:{}", i))));
    }
    drain(&shard);

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_fast_path", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(shard.get(&key).ok());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(shard.get(&key).ok());
            i += 1;
        });
    });

    // Fresh writes that promotion has not reconciled yet
    let dirty_shard = bench_shard();
    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        dirty_shard.set(key, string_entry(Bytes::from(format!("value:{}", i))));
    }

    group.bench_function("get_dirty_path", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(dirty_shard.get(&key).ok());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let store = StringStore::new();

    for i in 0..10_000 {
        store.set(
            Bytes::from(format!("key:{}", i)),
            Bytes::from(format!("value:{}", i)),
            None,
        );
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                // 20% writes
                store.set(Bytes::from(format!("new:{}", i)), Bytes::from("value"), None);
            } else {
                // 80% reads
                let key = Bytes::from(format!("key:{}", i % 10_000));
                black_box(store.get(&key).ok());
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark one promotion cycle over freshly dirtied buckets
fn bench_promotion(c: &mut Criterion) {
    let mut group = c.benchmark_group("promotion");

    group.bench_function("cycle_8_buckets", |b| {
        let shard = bench_shard();
        let mut i = 0u64;
        b.iter(|| {
            // Dirty a batch of buckets, then pay for one bounded cycle
            for j in 0..64 {
                let key = Bytes::from(format!("key:{}:{}", i, j));
                shard.set(key, string_entry(Bytes::from("value")));
            }
            black_box(shard.promote());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let shard = bench_shard();
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let shard = Arc::clone(&shard);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            shard.set(key.clone(), string_entry(Bytes::from("value")));
                            let _ = shard.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(shard.stats().dirty_keys);
        });
    });

    group.bench_function("readers_during_promotion", |b| {
        let shard = bench_shard();
        for i in 0..10_000 {
            let key = Bytes::from(format!("key:{}", i));
            shard.set(key, string_entry(Bytes::from("value")));
        }

        b.iter(|| {
            let reader = {
                let shard = Arc::clone(&shard);
                thread::spawn(move || {
                    for i in 0..1_000 {
                        let key = Bytes::from(format!("key:{}", i % 10_000));
                        black_box(shard.get(&key).ok());
                    }
                })
            };
            shard.promote();
            reader.join().unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_promotion,
    bench_concurrent,
);

criterion_main!(benches);

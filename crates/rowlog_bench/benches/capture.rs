//! Capture benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowlog_bench::{history_bytes, mutate, wide_record};
use rowlog_core::{capture, diff, CaptureConfig, CaptureInput, InMemoryStore, RetentionPolicy};

/// Benchmark diffing records of increasing width.
fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff");

    for fields in [8, 64, 512].iter() {
        group.throughput(Throughput::Elements(*fields as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fields), fields, |b, &fields| {
            let old = wide_record(fields);
            let new = mutate(&old, fields, 4);
            b.iter(|| black_box(diff(black_box(&old), black_box(&new))));
        });
    }

    group.finish();
}

/// Benchmark one capture onto logs of increasing length.
fn bench_capture(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture");
    let config = CaptureConfig::default();

    for writes in [0, 10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("unbounded", writes), writes, |b, &writes| {
            let (record, bytes) = history_bytes(32, writes, &config);
            let next = mutate(&record, 32, 2);
            b.iter(|| {
                let input = CaptureInput::new(&record, &next, i64::MAX).existing_log(&bytes);
                black_box(capture(black_box(&input), &config).unwrap());
            });
        });
    }

    let bounded = CaptureConfig::new().retention(RetentionPolicy::new().max_entries(50));
    group.bench_function("bounded_50", |b| {
        let (record, bytes) = history_bytes(32, 50, &bounded);
        let next = mutate(&record, 32, 2);
        b.iter(|| {
            let input = CaptureInput::new(&record, &next, i64::MAX).existing_log(&bytes);
            black_box(capture(black_box(&input), &bounded).unwrap());
        });
    });

    group.bench_function("no_op", |b| {
        let (record, bytes) = history_bytes(32, 100, &config);
        b.iter(|| {
            let input = CaptureInput::new(&record, &record, i64::MAX).existing_log(&bytes);
            black_box(capture(black_box(&input), &config).unwrap());
        });
    });

    group.finish();
}

/// Benchmark store writes, including the lock and persist.
fn bench_store_write(c: &mut Criterion) {
    c.bench_function("store_write_100", |b| {
        let records: Vec<_> = (0..100).map(|_| wide_record(16)).collect();
        let updates: Vec<_> = records.iter().map(|r| mutate(r, 16, 1)).collect();

        b.iter(|| {
            let store = InMemoryStore::new();
            for (id, (record, update)) in records.iter().zip(&updates).enumerate() {
                store.insert(id as u64, record.clone()).unwrap();
                store
                    .update(id as u64, black_box(update.clone()), None, 1)
                    .unwrap();
            }
            black_box(store);
        });
    });
}

criterion_group!(benches, bench_diff, bench_capture, bench_store_write);

criterion_main!(benches);

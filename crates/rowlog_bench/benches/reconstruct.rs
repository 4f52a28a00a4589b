//! Reconstruction and compaction benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowlog_bench::history_bytes;
use rowlog_core::reconstruct::replay;
use rowlog_core::{
    compact, log, reconstruct, reconstruct_version, CaptureConfig, Path, RetentionPolicy,
    VersionSelector,
};

/// Benchmark rebuilding the oldest and a middle version.
fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");

    for writes in [10, 100, 1000].iter() {
        let (_, bytes) = history_bytes(32, *writes, &CaptureConfig::default());
        let history = log::decode(&bytes).unwrap();
        let middle = history.current_version() / 2;

        group.throughput(Throughput::Elements(*writes as u64));
        group.bench_with_input(BenchmarkId::new("version", writes), &history, |b, history| {
            b.iter(|| black_box(reconstruct_version(history, black_box(middle)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("timestamp", writes), &history, |b, history| {
            let at = VersionSelector::ByTimestamp(middle as i64);
            b.iter(|| black_box(reconstruct(history, black_box(at)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("replay", writes), &history, |b, history| {
            b.iter(|| black_box(replay(history).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark compaction policies over a 1000-entry log.
fn bench_compact(c: &mut Criterion) {
    let mut group = c.benchmark_group("compact");
    let (_, bytes) = history_bytes(32, 1000, &CaptureConfig::default());
    let history = log::decode(&bytes).unwrap();

    let policies = [
        ("max_entries_100", RetentionPolicy::new().max_entries(100)),
        ("max_bytes_16k", RetentionPolicy::new().max_bytes(16 * 1024)),
        ("redact", RetentionPolicy::new().redact(Path::from("field_3"))),
    ];
    for (name, policy) in &policies {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(compact(&history, black_box(policy)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reconstruct, bench_compact);

criterion_main!(benches);

//! Log codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowlog_bench::{history_bytes, wide_record};
use rowlog_codec::{from_cbor, to_canonical_cbor, Value};
use rowlog_core::{log, CaptureConfig};

/// Benchmark encoding and decoding records.
fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("record");

    for fields in [8, 64, 512].iter() {
        let value = wide_record(*fields);
        let encoded = to_canonical_cbor(&value);
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", fields), &value, |b, value| {
            b.iter(|| black_box(to_canonical_cbor(black_box(value))));
        });
        group.bench_with_input(BenchmarkId::new("decode", fields), &encoded, |b, encoded| {
            b.iter(|| {
                let result: Value = from_cbor(black_box(encoded)).unwrap();
                black_box(result);
            });
        });
        group.bench_with_input(BenchmarkId::new("encoded_len", fields), &value, |b, value| {
            b.iter(|| black_box(black_box(value).encoded_len()));
        });
    }

    group.finish();
}

/// Benchmark encoding and decoding whole logs.
fn bench_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("log");

    for writes in [10, 100, 1000].iter() {
        let (_, bytes) = history_bytes(32, *writes, &CaptureConfig::default());
        let history = log::decode(&bytes).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("decode", writes), &bytes, |b, bytes| {
            b.iter(|| black_box(log::decode(black_box(bytes)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("encode", writes), &history, |b, history| {
            b.iter(|| black_box(log::encode(black_box(history))));
        });
        group.bench_with_input(BenchmarkId::new("encoded_len", writes), &history, |b, history| {
            b.iter(|| black_box(log::encoded_len(black_box(history))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_record, bench_log);

criterion_main!(benches);

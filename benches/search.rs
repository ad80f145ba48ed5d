//! Performance benchmarks for the search hot path

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use distributed_pow::{
    hash::{compute_hash, meets_difficulty, PrefixHasher},
    nonce::NonceCodec,
    worker::search::search_range,
    Charset, SearchConfig, WorkRange, MAX_TEXT_LENGTH,
};
use std::hint::black_box;

fn bench_hash_computation(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_hash");

    for &size in &[64usize, 1024, MAX_TEXT_LENGTH] {
        let text = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64 + 6));

        group.bench_with_input(BenchmarkId::new("full", size), &text, |b, text| {
            b.iter(|| black_box(compute_hash(black_box(text), black_box(b"A1B2C3"))));
        });

        let hasher = PrefixHasher::new(&text);
        group.bench_with_input(BenchmarkId::new("prefixed", size), &hasher, |b, hasher| {
            b.iter(|| black_box(hasher.hash(black_box(b"A1B2C3"))));
        });
    }

    group.finish();
}

fn bench_difficulty_check(c: &mut Criterion) {
    c.bench_function("meets_difficulty", |b| {
        b.iter(|| black_box(meets_difficulty(black_box(294_000_000), black_box(6))));
    });
}

fn bench_nonce_codec(c: &mut Criterion) {
    let codec = NonceCodec::new(6, Charset::alphanumeric()).unwrap();
    let nonce = codec.encode(1_234_567);

    c.bench_function("nonce_encode", |b| {
        b.iter(|| black_box(codec.encode(black_box(1_234_567))));
    });

    c.bench_function("nonce_decode", |b| {
        b.iter(|| black_box(codec.decode(black_box(nonce.as_bytes())).unwrap()));
    });

    c.bench_function("nonce_successor", |b| {
        b.iter(|| black_box(codec.successor(black_box(&nonce)).unwrap()));
    });
}

fn bench_search_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_range");
    group.sample_size(20);

    // Unreachable difficulty so every nonce of the range is tried
    let config = SearchConfig::new(
        "The quick brown fox jumps over the lazy dog",
        4,
        10,
        Charset::alphanumeric(),
    )
    .unwrap();
    let codec = NonceCodec::new(4, Charset::alphanumeric()).unwrap();

    for &len in &[1_000u64, 100_000] {
        let range = WorkRange::new(codec.encode(0), codec.encode(len - 1));
        group.throughput(Throughput::Elements(len));
        group.bench_with_input(BenchmarkId::new("exhaust", len), &range, |b, range| {
            b.iter(|| black_box(search_range(&config, range).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hash_computation,
    bench_difficulty_check,
    bench_nonce_codec,
    bench_search_range
);
criterion_main!(benches);

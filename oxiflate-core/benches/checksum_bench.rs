//! Throughput benchmarks for the trailer checksums.
//!
//! Covers CRC-32 (gzip) and Adler-32 (zlib) across data sizes and patterns,
//! plus incremental updates in the chunk sizes the stream framer uses.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxiflate_core::{Adler32, Crc32};
use std::hint::black_box;

mod test_data {
    /// Random data from a fixed-seed LCG.
    pub fn random(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        for _ in 0..size {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }

    pub fn zeros(size: usize) -> Vec<u8> {
        vec![0; size]
    }

    pub fn text_like(size: usize) -> Vec<u8> {
        b"The quick brown fox jumps over the lazy dog. "
            .iter()
            .copied()
            .cycle()
            .take(size)
            .collect()
    }
}

mod data_sizes {
    pub const SMALL: usize = 256;
    pub const MEDIUM: usize = 16 * 1024;
    pub const LARGE: usize = 1024 * 1024;
}

const SIZES: [(&str, usize); 3] = [
    ("256B", data_sizes::SMALL),
    ("16KB", data_sizes::MEDIUM),
    ("1MB", data_sizes::LARGE),
];

fn bench_crc32_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32_sizes");

    for (name, size) in SIZES {
        let data = test_data::random(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| Crc32::compute(black_box(data)))
        });
    }

    group.finish();
}

fn bench_adler32_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32_sizes");

    for (name, size) in SIZES {
        let data = test_data::random(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| Adler32::compute(black_box(data)))
        });
    }

    group.finish();
}

fn bench_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum_patterns");
    let size = data_sizes::MEDIUM;
    group.throughput(Throughput::Bytes(size as u64));

    let patterns: [(&str, fn(usize) -> Vec<u8>); 3] = [
        ("random", test_data::random),
        ("zeros", test_data::zeros),
        ("text", test_data::text_like),
    ];

    for (name, generate) in patterns {
        let data = generate(size);
        group.bench_with_input(BenchmarkId::new("crc32", name), &data, |b, data| {
            b.iter(|| Crc32::compute(black_box(data)))
        });
        group.bench_with_input(BenchmarkId::new("adler32", name), &data, |b, data| {
            b.iter(|| Adler32::compute(black_box(data)))
        });
    }

    group.finish();
}

fn bench_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum_incremental");
    let data = test_data::random(data_sizes::LARGE);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [64usize, 4096, 16384] {
        group.bench_with_input(BenchmarkId::new("crc32", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut crc = Crc32::new();
                for part in data.chunks(chunk) {
                    crc.update(black_box(part));
                }
                crc.value()
            })
        });
        group.bench_with_input(BenchmarkId::new("adler32", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut adler = Adler32::new();
                for part in data.chunks(chunk) {
                    adler.update(black_box(part));
                }
                adler.value()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_crc32_sizes,
    bench_adler32_sizes,
    bench_patterns,
    bench_incremental
);
criterion_main!(benches);

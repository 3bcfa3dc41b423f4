//! Compression and decompression throughput by level and data pattern.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxiflate_core::Strategy;
use oxiflate_core::traits::{Compressor, Decompressor};
use oxiflate_deflate::{Deflater, Inflater, deflate, inflate};
use std::hint::black_box;

mod test_data {
    /// Random data from a fixed-seed LCG.
    pub fn random(size: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(size);
        let mut seed = 12345u32;
        for _ in 0..size {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            data.push((seed >> 16) as u8);
        }
        data
    }

    /// Word soup with a small vocabulary.
    pub fn text_like(size: usize) -> Vec<u8> {
        let words = [
            "the ", "quick ", "brown ", "fox ", "jumps ", "over ", "lazy ", "dog ", "and ",
            "runs ", "away ", "from ", "big ", "bad ", "wolf ",
        ];
        let mut data = Vec::with_capacity(size);
        let mut seed = 42u32;
        while data.len() < size {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            data.extend_from_slice(words[(seed >> 16) as usize % words.len()].as_bytes());
        }
        data.truncate(size);
        data
    }

    /// Short repeating pattern.
    pub fn repeated(size: usize) -> Vec<u8> {
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"
            .iter()
            .copied()
            .cycle()
            .take(size)
            .collect()
    }
}

const SIZE: usize = 256 * 1024;

fn bench_compress_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_levels");
    let data = test_data::text_like(SIZE);
    group.throughput(Throughput::Bytes(SIZE as u64));

    for level in [0u8, 1, 3, 6, 9] {
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, &level| {
            b.iter(|| deflate(black_box(&data), level))
        });
    }

    group.finish();
}

fn bench_compress_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_patterns");
    group.throughput(Throughput::Bytes(SIZE as u64));

    let patterns: [(&str, fn(usize) -> Vec<u8>); 3] = [
        ("random", test_data::random),
        ("text", test_data::text_like),
        ("repeated", test_data::repeated),
    ];

    for (name, generate) in patterns {
        let data = generate(SIZE);
        group.bench_with_input(BenchmarkId::new("level6", name), &data, |b, data| {
            b.iter(|| deflate(black_box(data), 6))
        });
    }

    group.finish();
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_strategies");
    let data = test_data::text_like(SIZE);
    group.throughput(Throughput::Bytes(SIZE as u64));

    let strategies = [
        ("default", Strategy::Default),
        ("filtered", Strategy::Filtered),
        ("huffman_only", Strategy::HuffmanOnly),
        ("rle", Strategy::Rle),
        ("fixed", Strategy::Fixed),
    ];

    for (name, strategy) in strategies {
        group.bench_with_input(BenchmarkId::from_parameter(name), &strategy, |b, &strategy| {
            b.iter(|| {
                let mut deflater = Deflater::new(6);
                deflater
                    .set_params(6, strategy)
                    .and_then(|()| deflater.compress_all(black_box(&data)))
            })
        });
    }

    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");

    for level in [1u8, 6, 9] {
        let data = test_data::text_like(SIZE);
        let Ok(compressed) = deflate(&data, level) else {
            continue;
        };
        group.throughput(Throughput::Bytes(SIZE as u64));
        group.bench_with_input(
            BenchmarkId::new("text", level),
            &compressed,
            |b, compressed| b.iter(|| inflate(black_box(compressed))),
        );
    }

    // Small output buffers keep the decoder on its resumable path.
    let data = test_data::text_like(SIZE);
    if let Ok(compressed) = deflate(&data, 6) {
        group.bench_function("text_64b_output", |b| {
            b.iter(|| {
                let mut inflater = Inflater::new();
                let mut buf = [0u8; 64];
                let mut pos = 0;
                let mut total = 0;
                while let Ok((consumed, produced, status)) =
                    inflater.decompress(&compressed[pos..], &mut buf)
                {
                    pos += consumed;
                    total += produced;
                    if status == oxiflate_core::DecompressStatus::Done {
                        break;
                    }
                }
                total
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_compress_levels,
    bench_compress_patterns,
    bench_strategies,
    bench_decompress
);
criterion_main!(benches);

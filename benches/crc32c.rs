//! Benchmarks for CRC32-C throughput per strategy.
//!
//! Run with: `cargo bench --bench crc32c`
//! Compare with baseline: `cargo bench --bench crc32c -- --save-baseline main`
//! Compare against baseline: `cargo bench --bench crc32c -- --baseline main`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crcpool::Crc32c;

/// Buffer sizes straddling the 1024-byte parallel block.
const SIZES: &[usize] = &[11, 64, 1023, 1024, 4096, 16 * 1024, 64 * 1024];

fn buffer(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 5)) as u8).collect()
}

/// Benchmark every strategy at every size.
fn bench_strategies(c: &mut Criterion) {
    let strategies: [(&str, fn(&[u8], u32) -> u32); 4] = [
        ("software", Crc32c::calculate_software),
        ("hardware_serial", Crc32c::calculate_hardware_serial),
        ("hardware_parallel", Crc32c::calculate_hardware_parallel),
        ("dispatch", Crc32c::calculate),
    ];

    let mut group = c.benchmark_group("crc32c");
    for &size in SIZES {
        let data = buffer(size);
        group.throughput(Throughput::Bytes(size as u64));

        for (name, function) in strategies {
            group.bench_with_input(BenchmarkId::new(name, size), &data, |b, data| {
                b.iter(|| black_box(function(black_box(data), 0)));
            });
        }
    }
    group.finish();
}

/// Benchmark unaligned input on the dispatched path.
fn bench_unaligned(c: &mut Criterion) {
    let data = buffer(64 * 1024 + 7);

    let mut group = c.benchmark_group("crc32c_unaligned");
    group.throughput(Throughput::Bytes(64 * 1024));
    for offset in [0, 1, 3, 7] {
        let slice = &data[offset..offset + 64 * 1024];
        group.bench_with_input(BenchmarkId::from_parameter(offset), slice, |b, slice| {
            b.iter(|| black_box(Crc32c::checksum(black_box(slice))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_strategies, bench_unaligned);
criterion_main!(benches);

//! Benchmarks for thread pool job throughput.
//!
//! Run with: `cargo bench --bench thread_pool`

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crcpool::{Crc32c, FixedThreadPool};

const JOBS: usize = 1000;

/// Enqueue-and-drain round trips with empty jobs.
fn bench_empty_jobs(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_pool_empty");
    group.throughput(Throughput::Elements(JOBS as u64));

    for threads in [1, 2, 4] {
        let pool = FixedThreadPool::new(threads, 256);
        pool.start().expect("start pool");

        group.bench_function(BenchmarkId::from_parameter(threads), |b| {
            b.iter(|| {
                for _ in 0..JOBS {
                    pool.enqueue_job(|| {}).expect("enqueue");
                }
                pool.drain();
            });
        });
        pool.stop();
    }
    group.finish();
}

/// Checksum 64 KiB chunks on the pool.
fn bench_checksum_jobs(c: &mut Criterion) {
    const CHUNK: usize = 64 * 1024;
    const CHUNKS: usize = 64;

    let data: Arc<Vec<u8>> = Arc::new((0..CHUNK * CHUNKS).map(|i| i as u8).collect());
    let mut group = c.benchmark_group("thread_pool_crc32c");
    group.throughput(Throughput::Bytes((CHUNK * CHUNKS) as u64));

    for threads in [1, 2, 4] {
        let pool = FixedThreadPool::new(threads, CHUNKS);
        pool.start().expect("start pool");
        let sink = Arc::new(AtomicU32::new(0));

        group.bench_function(BenchmarkId::from_parameter(threads), |b| {
            b.iter(|| {
                for chunk in 0..CHUNKS {
                    let data = Arc::clone(&data);
                    let sink = Arc::clone(&sink);
                    pool.enqueue_job(move || {
                        let crc = Crc32c::checksum(&data[chunk * CHUNK..(chunk + 1) * CHUNK]);
                        sink.fetch_xor(crc, Ordering::Relaxed);
                    })
                    .expect("enqueue");
                }
                pool.drain();
                black_box(sink.load(Ordering::Relaxed))
            });
        });
        pool.stop();
    }
    group.finish();
}

criterion_group!(benches, bench_empty_jobs, bench_checksum_jobs);
criterion_main!(benches);

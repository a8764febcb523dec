//! Buffer benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use filebuffer_bench::{random_data, random_elements, temp_buffer};

/// Benchmark single-element appends.
fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    group.sample_size(50);

    for size in [64, 1024, 4096].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let (_dir, buffer) = temp_buffer();
            let element = random_data(size);

            b.iter(|| buffer.add(black_box(&element)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark batched appends.
fn bench_add_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_all");
    group.sample_size(30);

    for count in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (_dir, buffer) = temp_buffer();
            let elements = random_elements(count, 256);

            b.iter(|| buffer.add_all(black_box(&elements)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark random access reads.
fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");

    for count in [100u64, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let (_dir, buffer) = temp_buffer();
            buffer
                .add_all(&random_elements(count as usize, 128))
                .unwrap();
            let mut i = 0u64;

            b.iter(|| {
                i = (i + 7919) % count;
                black_box(buffer.get(black_box(i)));
            });
        });
    }

    group.finish();
}

/// Benchmark full iteration.
fn bench_iterate(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    group.sample_size(20);

    let count = 10_000;
    group.throughput(Throughput::Elements(count as u64));
    group.bench_function("10000", |b| {
        let (_dir, buffer) = temp_buffer();
        buffer.add_all(&random_elements(count, 128)).unwrap();

        b.iter(|| black_box(buffer.iter().count()));
    });

    group.finish();
}

criterion_group!(benches, bench_add, bench_add_all, bench_get, bench_iterate);
criterion_main!(benches);

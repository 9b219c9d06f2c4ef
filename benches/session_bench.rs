//! Benchmarks for the stint session store
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use stint::{FileSessionReader, FileSessionWriter, Frequency, PhysicalRange};
use tempfile::tempdir;

const START: i64 = 32_400_000_000_000;

fn write_session(path: &std::path::Path, samples: usize) {
    let mut writer = FileSessionWriter::create(path).unwrap();
    writer
        .build_rational_parameter("Chassis", "vCar", PhysicalRange::new(0.0, 400.0))
        .units("kph")
        .on_periodic_channel(Frequency::hz(10.0))
        .add_to_session()
        .unwrap();
    writer.commit_parameters().unwrap();

    let interval = Frequency::hz(10.0).interval();
    let mut written = 0;
    while written < samples {
        let burst = 1000.min(samples - written);
        let values: Vec<f64> = (written..written + burst).map(|i| i as f64).collect();
        writer
            .write_periodic_values(1, START + written as i64 * interval, &values)
            .unwrap();
        written += burst;
    }
    writer.close_session().unwrap();
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");

    for samples in [1_000, 10_000] {
        group.throughput(Throughput::Elements(samples as u64));
        group.bench_function(format!("session_{}", samples), |b| {
            b.iter_custom(|iters| {
                let dir = tempdir().unwrap();
                let start = std::time::Instant::now();
                for i in 0..iters {
                    write_session(&dir.path().join(format!("bench_{}.ssn", i)), samples);
                }
                start.elapsed()
            })
        });
    }

    group.finish();
}

fn bench_open(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.ssn");
    write_session(&path, 10_000);

    c.bench_function("open_10k", |b| {
        b.iter(|| FileSessionReader::open(black_box(&path)).unwrap())
    });
}

fn bench_queries(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bench.ssn");
    write_session(&path, 10_000);
    let reader = FileSessionReader::open(&path).unwrap();
    let (start, end) = (reader.start_time(), reader.end_time());

    let mut group = c.benchmark_group("query");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("get_samples_full", |b| {
        b.iter(|| {
            reader
                .get_samples(black_box("vCar:Chassis"), start, end)
                .unwrap()
        })
    });

    group.bench_function("get_data_100hz_linear", |b| {
        b.iter(|| {
            reader
                .get_data(
                    black_box("vCar:Chassis"),
                    start,
                    end,
                    Frequency::hz(100.0),
                    true,
                )
                .unwrap()
        })
    });

    group.bench_function("get_data_1hz_hold", |b| {
        b.iter(|| {
            reader
                .get_data(
                    black_box("vCar:Chassis"),
                    start,
                    end,
                    Frequency::hz(1.0),
                    false,
                )
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_write, bench_open, bench_queries);
criterion_main!(benches);

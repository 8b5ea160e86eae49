//! Throughput Benchmark for emberkv
//!
//! Measures the store under read/write workloads, the codec/dispatcher
//! request path, and snapshot loading.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use emberkv::commands::Dispatcher;
use emberkv::config::ServerConfig;
use emberkv::protocol::decode;
use emberkv::storage::{self, Store};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let store = Arc::new(Store::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.set(key, Bytes::from("small_value"), None);
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.set(key, value.clone(), None);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let store = Arc::new(Store::new());

    // Pre-populate with data
    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        store.set(key, value, None);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(store.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(store.get(&key));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark the full request path: decode -> dispatch -> serialize
fn bench_request_path(c: &mut Criterion) {
    let dispatcher = Dispatcher::new(
        Arc::new(Store::new()),
        Arc::new(ServerConfig::default()),
    );

    let mut group = c.benchmark_group("request_path");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ping", |b| {
        b.iter(|| {
            let tokens = decode(black_box(b"*1\r\n$4\r\nPING\r\n"));
            let reply = dispatcher.dispatch(&tokens).unwrap();
            black_box(reply.serialize());
        });
    });

    group.bench_function("set_get", |b| {
        b.iter(|| {
            let tokens = decode(black_box(
                b"*3\r\n$3\r\nSET\r\n$4\r\nname\r\n$5\r\nember\r\n",
            ));
            dispatcher.dispatch(&tokens);

            let tokens = decode(black_box(b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n"));
            let reply = dispatcher.dispatch(&tokens).unwrap();
            black_box(reply.serialize());
        });
    });

    group.finish();
}

/// Benchmark snapshot loading from an in-memory image
fn bench_snapshot_load(c: &mut Criterion) {
    // Build a 10k-record snapshot image once
    let mut image = Vec::new();
    image.extend_from_slice(b"REDIS0011");
    for i in 0..10_000u32 {
        let key = format!("key:{}", i);
        let value = format!("value:{}", i);
        image.push(0x00);
        image.push(key.len() as u8);
        image.extend_from_slice(key.as_bytes());
        image.push(value.len() as u8);
        image.extend_from_slice(value.as_bytes());
    }
    image.push(0xFF);

    let mut group = c.benchmark_group("snapshot");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("load_10k_records", |b| {
        b.iter(|| {
            let store = Store::new();
            let loaded = storage::load_snapshot(std::io::Cursor::new(&image[..]), &store).unwrap();
            black_box(loaded);
        });
    });

    group.finish();
}

/// Benchmark concurrent access through the single store lock
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = Arc::new(Store::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            store.set(key.clone(), Bytes::from("value"), None);
                            store.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_request_path,
    bench_snapshot_load,
    bench_concurrent,
);

criterion_main!(benches);

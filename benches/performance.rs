//! Performance benchmarks for the notification center.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use notification_center::{NotificationCenter, Payload};
use std::sync::Arc;

/// Benchmark post with varying observer counts, half of them matching
fn bench_post(c: &mut Criterion) {
    let mut group = c.benchmark_group("post");

    for observers in [10, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("observers", observers),
            &observers,
            |b, &count| {
                let center = NotificationCenter::new();
                let held: Vec<Arc<usize>> = (0..count).map(Arc::new).collect();

                for (i, observer) in held.iter().enumerate() {
                    let name = if i % 2 == 0 { "tick" } else { "other" };
                    center
                        .subscribe(observer, name, None, |n| {
                            black_box(n.name());
                            Ok(())
                        })
                        .unwrap();
                }

                b.iter(|| {
                    center.post_name("tick", None).unwrap();
                });
            },
        );
    }

    group.finish();
}

/// Benchmark subscribe/unsubscribe churn on a populated center
fn bench_churn(c: &mut Criterion) {
    let center = NotificationCenter::new();
    let held: Vec<Arc<usize>> = (0..100).map(Arc::new).collect();
    for observer in &held {
        center.subscribe(observer, "tick", None, |_| Ok(())).unwrap();
    }

    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            let observer = Arc::new(0usize);
            center.subscribe(&observer, "tick", None, |_| Ok(())).unwrap();
            center.unsubscribe(&observer);
        });
    });
}

/// Benchmark posting with a payload
fn bench_post_payload(c: &mut Criterion) {
    let center = NotificationCenter::new();
    let observer = Arc::new(());
    center
        .subscribe(&observer, "socket.data", None, |n| {
            black_box(n.payload().and_then(|p| p.get_i64("len")));
            Ok(())
        })
        .unwrap();

    c.bench_function("post_with_payload", |b| {
        b.iter(|| {
            let payload = Payload::new().with("len", 512).with("host", "127.0.0.1");
            center.post_with_payload("socket.data", None, payload).unwrap();
        });
    });
}

criterion_group!(benches, bench_post, bench_churn, bench_post_payload);
criterion_main!(benches);

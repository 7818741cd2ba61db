use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringspsc::{DefaultPolicy, Queue, StaticQueue, StaticTypedPool, TypedPool, P as PlainPolicy};

const OPS: u64 = 1_000_000;

fn bench_queue_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_claim_publish_pop");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function(BenchmarkId::new("dynamic", "atomic"), |b| {
        let mut q: Queue<u64, DefaultPolicy> = Queue::new();
        q.init(1024).unwrap();
        b.iter(|| {
            for i in 0..OPS {
                while !q.try_push(i) {
                    std::hint::spin_loop();
                }
                while q.try_pop().is_none() {
                    std::hint::spin_loop();
                }
            }
        });
    });

    group.bench_function(BenchmarkId::new("static", "atomic"), |b| {
        let q: StaticQueue<u64, 1024, DefaultPolicy> = StaticQueue::new();
        b.iter(|| {
            for i in 0..OPS {
                while !q.try_push(i) {
                    std::hint::spin_loop();
                }
                while q.try_pop().is_none() {
                    std::hint::spin_loop();
                }
            }
        });
    });

    group.bench_function(BenchmarkId::new("static", "plain"), |b| {
        let q: StaticQueue<u64, 1024, PlainPolicy> = StaticQueue::new();
        b.iter(|| {
            for i in 0..OPS {
                while !q.try_push(i) {
                    std::hint::spin_loop();
                }
                while q.try_pop().is_none() {
                    std::hint::spin_loop();
                }
            }
        });
    });

    group.finish();
}

fn bench_pool_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("typed_pool_claim_publish_pop");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function(BenchmarkId::new("dynamic", "atomic"), |b| {
        let mut pool: TypedPool<[u64; 8], DefaultPolicy> = TypedPool::new();
        pool.init(1024);
        b.iter(|| {
            for i in 0..OPS {
                while !pool.try_push(black_box([i; 8])) {
                    std::hint::spin_loop();
                }
                while pool.try_pop().is_none() {
                    std::hint::spin_loop();
                }
            }
        });
    });

    group.bench_function(BenchmarkId::new("static", "atomic"), |b| {
        let pool: StaticTypedPool<[u64; 8], 1024, DefaultPolicy> = StaticTypedPool::new();
        b.iter(|| {
            for i in 0..OPS {
                while !pool.try_push(black_box([i; 8])) {
                    std::hint::spin_loop();
                }
                while pool.try_pop().is_none() {
                    std::hint::spin_loop();
                }
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_queue_roundtrip, bench_pool_roundtrip);
criterion_main!(benches);

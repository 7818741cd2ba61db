use ringspsc::{DefaultPolicy, Latest, Queue, StaticQueue, StaticTypedPool, TypedPool};
use std::sync::Arc;
use std::thread;

#[test]
fn fifo_ordering_across_threads() {
    let mut queue: Queue<u64, DefaultPolicy> = Queue::new();
    queue.init(1024).unwrap();
    let queue = Arc::new(queue);

    const N: u64 = 200_000;

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut sent = 0u64;
            while sent < N {
                if queue.try_push(sent) {
                    sent += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        })
    };

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut expected = 0u64;
            while expected < N {
                if let Some(v) = queue.try_pop() {
                    assert_eq!(v, expected, "FIFO order violated");
                    expected += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        })
    };

    producer.join().unwrap();
    consumer.join().unwrap();
}

#[test]
fn typed_pool_pointer_identity_across_threads() {
    let mut pool: TypedPool<[u64; 4], DefaultPolicy> = TypedPool::new();
    pool.init(32);
    let addresses: std::collections::HashSet<_> = (0..32).map(|i| pool.data(i) as usize).collect();
    let pool = Arc::new(pool);

    const N: u64 = 50_000;
    let producer = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            for i in 0..N {
                while !pool.try_push([i, 0, 0, 0]) {
                    std::hint::spin_loop();
                }
            }
        })
    };
    let consumer = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let mut seen = 0u64;
            while seen < N {
                if pool.try_pop().is_some() {
                    seen += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        })
    };
    producer.join().unwrap();
    consumer.join().unwrap();

    let after: std::collections::HashSet<_> = (0..32).map(|i| pool.data(i) as usize).collect();
    assert_eq!(addresses, after, "storage addresses must survive many cycles");
}

#[test]
fn static_queue_never_exceeds_capacity_under_contention() {
    let queue: Arc<StaticQueue<u32, 256, DefaultPolicy>> = Arc::new(StaticQueue::new());

    const N: u32 = 100_000;
    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut sent = 0u32;
            while sent < N {
                if queue.try_push(sent) {
                    sent += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
        })
    };
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut received = 0u32;
            while received < N {
                if queue.try_pop().is_some() {
                    received += 1;
                }
                assert!(queue.len() <= 256);
            }
        })
    };
    producer.join().unwrap();
    consumer.join().unwrap();
}

#[test]
fn latest_consumer_only_observes_newest_value() {
    let mut latest: Latest<u64, DefaultPolicy> = Latest::new();
    latest.init(8);
    let latest = Arc::new(std::sync::Mutex::new(latest));

    const ROUNDS: u64 = 10_000;
    let producer = {
        let latest = Arc::clone(&latest);
        thread::spawn(move || {
            for i in 0..ROUNDS {
                latest.lock().unwrap().coalescing_publish(i);
            }
        })
    };
    producer.join().unwrap();

    let guard = latest.lock().unwrap();
    assert_eq!(guard.try_front().copied(), Some(ROUNDS - 1));
}

#[test]
fn static_typed_pool_roundtrips_stable_pointers() {
    let pool: StaticTypedPool<u64, 16, DefaultPolicy> = StaticTypedPool::new();
    let before: Vec<_> = (0..16).map(|i| pool.data(i)).collect();
    for cycle in 0..500u64 {
        assert!(pool.try_push(cycle));
        assert_eq!(pool.try_pop(), Some(cycle));
    }
    let after: Vec<_> = (0..16).map(|i| pool.data(i)).collect();
    assert_eq!(before, after);
}

use ringspsc::{DefaultPolicy, Queue};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

fn main() {
    println!("ringspsc Basic Example");
    println!("=======================\n");

    let mut queue: Queue<u64, DefaultPolicy> = Queue::new();
    queue.init(1 << 16).unwrap();
    let queue = Arc::new(queue);

    const ITEMS: u64 = 10_000_000;

    println!("Configuration:");
    println!("  Ring capacity: {}", queue.capacity());
    println!("  Items: {}\n", ITEMS);

    let start = Instant::now();

    let producer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            for i in 0..ITEMS {
                while !queue.try_push(i) {
                    thread::yield_now();
                }
            }
            println!("Producer finished");
        })
    };

    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let mut total = 0u64;
            let mut sum = 0u64;
            while total < ITEMS {
                match queue.try_pop() {
                    Some(v) => {
                        sum += v;
                        total += 1;
                    }
                    None => thread::yield_now(),
                }
            }
            (total, sum)
        })
    };

    producer.join().unwrap();
    let (total, sum) = consumer.join().unwrap();
    let duration = start.elapsed();

    println!("\nResults:");
    println!("  Items consumed: {total}");
    println!("  Sum: {sum}");
    println!("  Duration: {duration:.2?}");
    println!(
        "  Throughput: {:.2} million items/sec",
        total as f64 / duration.as_secs_f64() / 1_000_000.0
    );
}

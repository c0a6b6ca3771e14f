use super::*;

fn record(message: &str) -> Record {
    Record::new("queue_test.rs::1", &[], message.to_string())
}

// =============================================================================
// Sequence stamping
// =============================================================================

#[test]
fn test_sequence_is_monotonic() {
    let queue = IngestQueue::new(QueueMode::Ordered);
    for _ in 0..10 {
        queue.enqueue(record("x"));
    }

    let mut batch = Vec::new();
    queue.drain(&mut batch);

    let seqs: Vec<u64> = batch.iter().map(Record::seq).collect();
    assert_eq!(seqs, (0..10).collect::<Vec<u64>>());
}

#[test]
fn test_sequence_continues_across_drains() {
    let queue = IngestQueue::new(QueueMode::Ordered);
    let mut batch = Vec::new();

    queue.enqueue(record("a"));
    queue.drain(&mut batch);
    assert_eq!(batch[0].seq(), 0);

    queue.enqueue(record("b"));
    queue.drain(&mut batch);
    assert_eq!(batch[0].seq(), 1);
}

// =============================================================================
// Outstanding accounting
// =============================================================================

#[test]
fn test_outstanding_counts_enqueued_minus_drained() {
    let queue = IngestQueue::new(QueueMode::Unordered);
    let mut batch = Vec::new();

    assert_eq!(queue.outstanding(), 0);
    queue.enqueue(record("a"));
    queue.enqueue(record("b"));
    assert_eq!(queue.outstanding(), 2);

    queue.drain(&mut batch);
    assert_eq!(batch.len(), 2);
    assert_eq!(queue.outstanding(), 0);
}

#[test]
fn test_drain_clears_previous_batch_contents() {
    let queue = IngestQueue::new(QueueMode::Unordered);
    let mut batch = vec![record("stale")];

    queue.drain(&mut batch);
    assert!(batch.is_empty());
}

// =============================================================================
// Ordered drain
// =============================================================================

#[test]
fn test_ordered_drain_sorts_by_sequence() {
    let queue = IngestQueue::new(QueueMode::Ordered);

    // Concurrent producers interleave arbitrarily in the ring.
    std::thread::scope(|scope| {
        for producer in 0..4 {
            let queue = &queue;
            scope.spawn(move || {
                for i in 0..500 {
                    queue.enqueue(record(&format!("p{producer}-{i}")));
                }
            });
        }
    });

    let mut batch = Vec::new();
    queue.drain(&mut batch);

    assert_eq!(batch.len(), 2000);
    for window in batch.windows(2) {
        assert!(window[0].seq() < window[1].seq());
    }
}

#[test]
fn test_ordered_drain_with_concurrent_producers_loses_nothing() {
    let queue = IngestQueue::new(QueueMode::Ordered);
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 2000;

    std::thread::scope(|scope| {
        for _ in 0..PRODUCERS {
            let queue = &queue;
            scope.spawn(move || {
                for _ in 0..PER_PRODUCER {
                    queue.enqueue(record("x"));
                }
            });
        }

        // Drain aggressively while producers are mid-flight: the shard swap
        // plus writer-in-flight accounting must not strand records.
        scope.spawn(|| {
            let mut drained = 0u64;
            let mut batch = Vec::new();
            while drained < PRODUCERS * PER_PRODUCER {
                queue.drain(&mut batch);
                drained += batch.len() as u64;
                if batch.is_empty() {
                    std::thread::yield_now();
                }
            }
        });
    });

    assert_eq!(queue.outstanding(), 0);
}

// =============================================================================
// Unordered drain
// =============================================================================

#[test]
fn test_unordered_drain_bulk_cap() {
    let queue = IngestQueue::new(QueueMode::Unordered);
    for _ in 0..1500 {
        queue.enqueue(record("x"));
    }

    let mut batch = Vec::new();
    queue.drain(&mut batch);
    assert_eq!(batch.len(), 1024);

    queue.drain(&mut batch);
    assert_eq!(batch.len(), 476);
    assert_eq!(queue.outstanding(), 0);
}

#[test]
fn test_unordered_preserves_single_producer_fifo() {
    let queue = IngestQueue::new(QueueMode::Unordered);
    for i in 0..100 {
        queue.enqueue(record(&i.to_string()));
    }

    let mut batch = Vec::new();
    queue.drain(&mut batch);

    let messages: Vec<&str> = batch.iter().map(Record::message).collect();
    let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
    assert_eq!(messages, expected);
}

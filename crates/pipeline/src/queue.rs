//! IngestQueue - swappable multi-producer / single-consumer record queue
//!
//! Producers enqueue from arbitrary threads without ever blocking on I/O;
//! the dispatcher is the single consumer. Ordered mode restores total
//! producer-observed order with a swap-and-drain: the active shard is
//! atomically replaced with a fresh one, the drain waits for in-flight
//! writers on the retired shard to finish, sorts the retired records by
//! their insertion stamp, and re-bases the stamps onto a run-global
//! sequence so sinks observe strictly increasing numbers across drains.

use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_queue::SegQueue;
use quill_protocol::Record;

/// Upper bound on records popped per unordered drain
const UNORDERED_DRAIN_BULK: usize = 1024;

/// Whether drains restore total sequence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Swap-and-drain plus a sort; sinks observe strictly increasing
    /// sequence numbers
    Ordered,
    /// Bulk-pop from the live shard; per-producer FIFO only
    Unordered,
}

/// One swappable queue instance
#[derive(Default)]
struct Shard {
    /// Insertion stamp for the next record in this shard
    insert_pos: AtomicU64,

    /// Producers currently between shard lookup and ring push
    writers: AtomicI32,

    /// Lock-free MPSC ring (single consumer enforced by swap-and-drain)
    ring: SegQueue<Record>,
}

/// The pipeline's ingestion queue
pub struct IngestQueue {
    /// Sequence numbers already handed to sinks; the next ordered drain
    /// re-bases its sorted batch here so delivery stays strictly increasing
    /// across shard swaps. Unordered mode never swaps, so the single
    /// shard's insertion stamps are already run-global.
    delivered: AtomicU64,

    /// Enqueued-but-not-drained records; shutdown polls this to zero
    outstanding: AtomicU64,

    /// The live shard; swapped atomically during an ordered drain
    active: ArcSwap<Shard>,

    mode: QueueMode,
}

impl IngestQueue {
    /// Create a queue in the given mode (a one-time choice per queue)
    pub fn new(mode: QueueMode) -> Self {
        Self {
            delivered: AtomicU64::new(0),
            outstanding: AtomicU64::new(0),
            active: ArcSwap::from_pointee(Shard::default()),
            mode,
        }
    }

    /// The drain mode this queue was created with
    #[inline]
    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    /// Number of enqueued-but-not-drained records
    #[inline]
    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::Relaxed)
    }

    /// Stamp `record` with the shard's next insertion position and enqueue
    ///
    /// Wait-free in unordered mode; bounded-wait in ordered mode (a producer
    /// may retry the shard lookup when it loses a race with a drain, but
    /// never yields or blocks on I/O).
    pub fn enqueue(&self, record: Record) {
        self.outstanding.fetch_add(1, Ordering::Relaxed);

        match self.mode {
            QueueMode::Unordered => {
                let shard = self.active.load();
                self.stamp_and_push(&shard, record);
            }
            QueueMode::Ordered => self.enqueue_ordered(record),
        }
    }

    fn enqueue_ordered(&self, record: Record) {
        loop {
            let shard = self.active.load();
            shard.writers.fetch_add(1, Ordering::AcqRel);

            // A drain may have swapped the shard between the load and the
            // increment. Stamping and pushing now would strand the record in
            // a retired shard the drain has already given up on, so retreat
            // and retry against the fresh shard.
            let current = self.active.load();
            if !Arc::ptr_eq(&*shard, &*current) {
                shard.writers.fetch_sub(1, Ordering::Release);
                continue;
            }

            self.stamp_and_push(&shard, record);
            shard.writers.fetch_sub(1, Ordering::Release);
            return;
        }
    }

    fn stamp_and_push(&self, shard: &Shard, mut record: Record) {
        record.stamp_seq(shard.insert_pos.fetch_add(1, Ordering::Relaxed));
        shard.ring.push(record);
    }

    /// Drain into `batch` (cleared first)
    ///
    /// Unordered mode pops up to a fixed bulk from the live shard. Ordered
    /// mode retires the live shard, spin-yields until its in-flight writers
    /// reach zero, pops everything, sorts by insertion stamp, and re-stamps
    /// the sorted records onto the run-global delivery sequence.
    pub fn drain(&self, batch: &mut Vec<Record>) {
        batch.clear();

        match self.mode {
            QueueMode::Unordered => {
                let shard = self.active.load();
                while batch.len() < UNORDERED_DRAIN_BULK {
                    match shard.ring.pop() {
                        Some(record) => batch.push(record),
                        None => break,
                    }
                }
            }
            QueueMode::Ordered => {
                let retired = self.active.swap(Arc::new(Shard::default()));

                // Writers that saw the retired shard before the swap may
                // still be mid-push; their records belong to this batch.
                while retired.writers.load(Ordering::Acquire) != 0 {
                    std::hint::spin_loop();
                    std::thread::yield_now();
                }

                while let Some(record) = retired.ring.pop() {
                    batch.push(record);
                }
                batch.sort_by_key(Record::seq);

                let base = self.delivered.load(Ordering::Relaxed);
                for (index, record) in batch.iter_mut().enumerate() {
                    record.stamp_seq(base + index as u64);
                }
                self.delivered
                    .fetch_add(batch.len() as u64, Ordering::Relaxed);
            }
        }

        self.outstanding
            .fetch_sub(batch.len() as u64, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;

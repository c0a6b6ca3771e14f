//! Dispatcher - the queue's single consumer
//!
//! A long-running task that drains the queue into a batch and fans the batch
//! out to every live sink concurrently, joining before the next drain. The
//! registry holds sinks only weakly; the dispatcher counts the references
//! that fail to upgrade and compacts them out once enough accumulate, so a
//! system that churns through short-lived sinks does not leak registry slots
//! or pay a write lock on every iteration.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use quill_protocol::{Batch, Record};
use quill_sinks::Sink;
use tokio_util::sync::CancellationToken;

use crate::queue::{IngestQueue, QueueMode};

/// Sleep between polls when the queue is empty
const EMPTY_POLL_SLEEP: Duration = Duration::from_millis(1);

/// Expired weak references tolerated before compacting the registry
const EXPIRED_REAP_THRESHOLD: usize = 4;

/// How the pipeline is initialised; a one-time choice per process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Sorted drain, real dispatch: sinks observe records in strictly
    /// increasing sequence order. The default, and the slower choice.
    PerfectlyOrdered,

    /// Unsorted drain, real dispatch: per-producer FIFO only.
    AllowUnordered,

    /// Measurement mode: unsorted drain, records counted and discarded.
    NoOp,

    /// Measurement mode: sorted drain, records counted and discarded.
    NoOpOrdered,
}

impl InitMode {
    /// The queue mode this initialisation mode drains with
    pub(crate) fn queue_mode(self) -> QueueMode {
        match self {
            InitMode::PerfectlyOrdered | InitMode::NoOpOrdered => QueueMode::Ordered,
            InitMode::AllowUnordered | InitMode::NoOp => QueueMode::Unordered,
        }
    }

    /// Whether batches are dispatched to sinks at all
    pub(crate) fn dispatches(self) -> bool {
        matches!(self, InitMode::PerfectlyOrdered | InitMode::AllowUnordered)
    }
}

impl Default for InitMode {
    fn default() -> Self {
        InitMode::PerfectlyOrdered
    }
}

/// Run the dispatch loop until the quit flag flips and the queue is empty
pub(crate) async fn run(
    queue: Arc<IngestQueue>,
    sinks: Arc<RwLock<Vec<Weak<dyn Sink>>>>,
    quit: CancellationToken,
    dispatch: bool,
) {
    let mut drained: Vec<Record> = Vec::new();
    let mut processed: u64 = 0;
    let started = Instant::now();

    loop {
        // Shutdown contract: stop only once every outstanding record has
        // been drained, so a flipped quit flag still flushes the tail.
        if quit.is_cancelled() && queue.outstanding() == 0 {
            break;
        }

        queue.drain(&mut drained);
        if drained.is_empty() {
            tokio::time::sleep(EMPTY_POLL_SLEEP).await;
            continue;
        }
        processed += drained.len() as u64;

        if dispatch {
            drained = fan_out(&sinks, std::mem::take(&mut drained)).await;
        } else {
            drained.clear();
        }
    }

    let elapsed = started.elapsed();
    tracing::info!(
        records = processed,
        elapsed_ms = elapsed.as_millis() as u64,
        avg_us_per_record = if processed > 0 {
            elapsed.as_micros() as f64 / processed as f64
        } else {
            0.0
        },
        "dispatcher stopped"
    );
}

/// Dispatch one batch to every live sink concurrently, reap expired weak
/// references past the threshold, and hand the record buffer back for reuse
async fn fan_out(
    sinks: &RwLock<Vec<Weak<dyn Sink>>>,
    records: Vec<Record>,
) -> Vec<Record> {
    let batch = Arc::new(Batch::new(records));

    // Upgrade under a short read lock; the fan-out itself runs unlocked so
    // sink registration never waits on sink I/O.
    let (live, expired) = {
        let registry = sinks.read();
        let mut live = Vec::with_capacity(registry.len());
        let mut expired = 0usize;
        for weak in registry.iter() {
            match weak.upgrade() {
                Some(sink) => live.push(sink),
                None => expired += 1,
            }
        }
        (live, expired)
    };

    let mut deliveries = Vec::with_capacity(live.len());
    for sink in live {
        let batch = Arc::clone(&batch);
        deliveries.push(tokio::spawn(async move { sink.handle(batch).await }));
    }
    for delivery in deliveries {
        // A panicking sink loses its batch but never takes the pipeline down.
        if let Err(error) = delivery.await {
            tracing::error!(%error, "sink task failed");
        }
    }

    if expired > EXPIRED_REAP_THRESHOLD {
        sinks
            .write()
            .retain(|weak| weak.strong_count() > 0);
    }

    // Reclaim the record buffer when this was the last batch reference.
    match Arc::try_unwrap(batch) {
        Ok(batch) => {
            let mut records = batch.into_records();
            records.clear();
            records
        }
        Err(_) => Vec::new(),
    }
}

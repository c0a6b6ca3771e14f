//! Call-site counters for the "every N" logging helpers
//!
//! `log_async_every!` needs to know how many times a source location has
//! been hit across all threads, so the process-wide map holds one atomic
//! counter per location behind a reader-writer lock (shared fast path,
//! exclusive double-checked insert).
//!
//! The per-id variant is simpler: each thread tracks its own
//! `(id, location)` counts without any locking at all.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

static LINE_COUNTS: Lazy<RwLock<HashMap<&'static str, Arc<AtomicU32>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

thread_local! {
    static ID_LINE_COUNTS: RefCell<HashMap<(u32, &'static str), u32>> =
        RefCell::new(HashMap::new());
}

/// Number of times `source` has been hit before this call, over all threads
///
/// Wraps around a `u32`, which has the side effect of letting a line log
/// again even if the wrap lands mid-cycle.
pub fn count_of(source: &'static str) -> u32 {
    {
        let counts = LINE_COUNTS.read();
        if let Some(counter) = counts.get(source) {
            return counter.fetch_add(1, Ordering::Relaxed);
        }
    }
    register_count(source)
}

/// Number of times `(id, source)` has been hit before this call, on this
/// thread only
pub fn count_of_id(id: u32, source: &'static str) -> u32 {
    ID_LINE_COUNTS.with(|counts| {
        let mut counts = counts.borrow_mut();
        let counter = counts.entry((id, source)).or_insert(0);
        let seen = *counter;
        *counter = counter.wrapping_add(1);
        seen
    })
}

fn register_count(source: &'static str) -> u32 {
    let mut counts = LINE_COUNTS.write();

    // Another thread may have registered the line while we waited for the
    // write lock; fall through to its counter.
    if let Some(counter) = counts.get(source) {
        return counter.fetch_add(1, Ordering::Relaxed);
    }

    // First sight counts as hit zero; prime the counter with 1 because every
    // later lookup fetch-adds on read.
    counts.insert(source, Arc::new(AtomicU32::new(1)));
    0
}

#[cfg(test)]
#[path = "counters_test.rs"]
mod counters_test;

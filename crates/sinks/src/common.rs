//! Common types and utilities for sinks
//!
//! The `Sink` trait is the capability the dispatcher sees; `FilterSet` is
//! the filter-chain + verdict-cache substrate composed into every concrete
//! sink.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use quill_protocol::{Batch, Record};
use thiserror::Error;

/// A per-sink acceptance predicate over a record
pub type Filter = Box<dyn Fn(&Record) -> bool + Send + Sync>;

/// A consumer of drained record batches
///
/// The dispatcher upgrades its weak reference, clones the `Arc<Batch>` and
/// calls `handle` on every live sink concurrently, joining before the next
/// drain. Implementations never propagate failures; logging is best-effort
/// and partial failure stays local to the affected sink.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Process one drained batch
    async fn handle(&self, batch: Arc<Batch>);
}

/// Filter chain with a memoised per-source-location verdict cache
///
/// # Acceptance rule
///
/// An empty chain accepts everything. A non-empty chain accepts a record iff
/// at least one predicate accepts it (disjunctive).
///
/// # Cache soundness
///
/// The cache assumes every predicate is a pure function of the record's
/// source-static fields (source location and tags): the first evaluation for
/// a source location memoises the verdict and later records from the same
/// location never re-run the predicates. Predicates that inspect the
/// timestamp or message body require [`FilterSet::disable_cache`].
///
/// Any mutation of the chain invalidates the entire cache.
pub struct FilterSet {
    filters: Vec<Filter>,
    verdicts: HashMap<&'static str, bool>,
    use_cache: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterSet {
    /// Create an empty filter set with caching enabled
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            verdicts: HashMap::new(),
            use_cache: true,
        }
    }

    /// Append a filter to the chain
    pub fn add(&mut self, filter: Filter) {
        self.filters.push(filter);
        self.verdicts.clear();
    }

    /// Replace the whole chain with a single filter
    pub fn set_exclusive(&mut self, filter: Filter) {
        self.filters.clear();
        self.filters.push(filter);
        self.verdicts.clear();
    }

    /// Clear all filters (everything becomes loggable again)
    pub fn clear(&mut self) {
        self.filters.clear();
        self.verdicts.clear();
    }

    /// Stop memoising verdicts and drop the existing cache
    ///
    /// Required before installing predicates that look at the timestamp or
    /// message body, since those fields vary across records sharing a source
    /// location.
    pub fn disable_cache(&mut self) {
        self.verdicts.clear();
        self.use_cache = false;
    }

    /// Resume memoising verdicts (the default)
    pub fn enable_cache(&mut self) {
        self.use_cache = true;
    }

    /// Number of filters in the chain
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the chain is empty
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Evaluate the chain for a record, consulting the verdict cache
    pub fn accepts(&mut self, record: &Record) -> bool {
        // No filters means everything is loggable; skip the cache entirely.
        if self.filters.is_empty() {
            return true;
        }

        if self.use_cache {
            if let Some(&verdict) = self.verdicts.get(record.source()) {
                return verdict;
            }
        }

        let verdict = self.filters.iter().any(|filter| filter(record));
        if self.use_cache {
            self.verdicts.insert(record.source(), verdict);
        }
        verdict
    }
}

impl std::fmt::Debug for FilterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterSet")
            .field("filters", &self.filters.len())
            .field("cached_verdicts", &self.verdicts.len())
            .field("use_cache", &self.use_cache)
            .finish()
    }
}

/// Common sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Failed to open a log file
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Endpoint resolution produced no usable address
    #[error("could not resolve {host}:{port}")]
    Resolve { host: String, port: u16 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "common_test.rs"]
mod common_test;

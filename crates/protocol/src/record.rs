//! Record - A single logging event
//!
//! `Record` is the unit that flows through the pipeline: producers create one
//! per logging call, the ingestion queue stamps it with a sequence number,
//! and sinks read it when a drained batch fans out.

use chrono::{DateTime, Local};

/// A single logging event
///
/// # Design
///
/// - `source` and `tags` are `'static` data baked in by the logging macros
///   (`concat!(file!(), "::", line!())` and a static tag slice). Both are
///   treated as immutable for the lifetime of the record and, by contract,
///   across every record sharing the same source location.
/// - `seq` is stamped by the ingestion queue and is the only sorting key for
///   ordered delivery. Wall-clock monotonicity is not guaranteed; the
///   sequence number is.
#[derive(Debug, Clone)]
pub struct Record {
    /// Queue-assigned sequence number (monotonic across the whole run)
    seq: u64,

    /// Wall-clock instant at creation
    timestamp: DateTime<Local>,

    /// `file::line` literal identifying the producer call site
    source: &'static str,

    /// Tags attached to the call site (constant per source location)
    tags: &'static [&'static str],

    /// The logged message body
    message: String,
}

impl Record {
    /// Create a record stamped with the current wall-clock time
    ///
    /// The sequence number starts at 0 and is overwritten by the queue via
    /// [`Record::stamp_seq`] on enqueue.
    pub fn new(source: &'static str, tags: &'static [&'static str], message: String) -> Self {
        Self {
            seq: 0,
            timestamp: Local::now(),
            source,
            tags,
            message,
        }
    }

    /// Create a record with an explicit timestamp
    ///
    /// Intended for tests and benchmarks that need deterministic rendering.
    pub fn at(
        timestamp: DateTime<Local>,
        source: &'static str,
        tags: &'static [&'static str],
        message: String,
    ) -> Self {
        Self {
            seq: 0,
            timestamp,
            source,
            tags,
            message,
        }
    }

    /// Overwrite the sequence number
    ///
    /// Called by the ingestion queue: once at enqueue time, and again by an
    /// ordered drain when it re-bases the sorted batch onto the run-global
    /// delivery sequence.
    #[inline]
    pub fn stamp_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Get the queue-assigned sequence number
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Get the wall-clock instant the record was created
    #[inline]
    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    /// Get the `file::line` source location literal
    #[inline]
    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Get the tags attached to the call site
    #[inline]
    pub fn tags(&self) -> &'static [&'static str] {
        self.tags
    }

    /// Get the message body
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

//! LogStream - stream-style producer entry point
//!
//! `Pipeline::stream` (or the `log_stream!` macro) returns a guard bound to
//! one call site. Text written to it through `std::fmt::Write` accumulates
//! in the guard's buffer, and dropping the guard commits a single record -
//! the guard drop is the terminator.

use std::fmt;

use quill_protocol::Record;

use crate::registry::Pipeline;

/// Accumulates one log line and commits it on drop
///
/// Inactive streams (created while `should_log` was false) swallow writes
/// and commit nothing, so call sites pay almost nothing when no sink would
/// accept the line.
pub struct LogStream<'p> {
    pipeline: &'p Pipeline,
    source: &'static str,
    tags: &'static [&'static str],
    buffer: String,
    active: bool,
}

impl<'p> LogStream<'p> {
    pub(crate) fn new(
        pipeline: &'p Pipeline,
        source: &'static str,
        tags: &'static [&'static str],
        active: bool,
    ) -> Self {
        Self {
            pipeline,
            source,
            tags,
            buffer: String::new(),
            active,
        }
    }

    /// Whether this stream will commit a record on drop
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl fmt::Write for LogStream<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.active {
            self.buffer.push_str(s);
        }
        Ok(())
    }
}

impl Drop for LogStream<'_> {
    fn drop(&mut self) {
        if self.active {
            let message = std::mem::take(&mut self.buffer);
            self.pipeline
                .enqueue(Record::new(self.source, self.tags, message));
        }
    }
}

//! Quill Format - Template compilers for log line rendering
//!
//! Formatting is on the consumer side of the pipeline, so it runs once per
//! record per sink. Both compilers therefore pre-process their template into
//! a program that is cheap to execute:
//!
//! - [`TimeFormat`] compiles a strftime-style template with `$N` fractional
//!   markers into segments rendered via `chrono`.
//! - [`LineFormat`] compiles a `%`-token line template into an ordered list
//!   of per-record fragments appended into a caller-provided buffer.
//!
//! Rendering a given record is idempotent: the same record renders to the
//! same string until the format program itself is rebuilt.

mod line;
mod time;

pub use line::{LineFormat, DEFAULT_LINE_FORMAT};
pub use time::{TimeFormat, DEFAULT_PRECISION, DEFAULT_TIME_FORMAT};

// Test modules - only compiled during testing
#[cfg(test)]
mod line_test;

//! Quill Protocol - Core record types for the Quill logging pipeline
//!
//! This crate provides the foundational types that flow through the pipeline:
//! - `Record` - A single logging event (sequence, instant, source, tags, body)
//! - `Batch` - A drained slice of the queue delivered to all live sinks
//! - `Level` - The process-wide log-level filter over level tags
//! - `TagMemo` - Process-wide cache of joined tag strings keyed by source location
//!
//! # Design Principles
//!
//! - **Static metadata**: Source locations and tag sets are `'static` string
//!   data produced by the logging macros, so lookups key on static strings
//!   and never copy them into every record.
//! - **Arc-friendly**: Batches are wrapped in `Arc` for multi-sink fan-out.
//! - **Read-only after drain**: Sinks never mutate records.

mod batch;
mod level;
mod record;
mod tags;

pub use batch::Batch;
pub use level::{
    Level, LEVEL_TAGS, LOG_ALL, LOG_DEBUG, LOG_ERROR, LOG_FATAL, LOG_INFO, LOG_WARN,
};
pub use record::Record;
pub use tags::{tag_memo, TagMemo};

#[cfg(test)]
mod record_test;
#[cfg(test)]
mod tags_test;

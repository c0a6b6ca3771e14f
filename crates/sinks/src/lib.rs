//! Quill - Sinks
//!
//! Consumers of drained record batches. The dispatcher fans each batch out
//! to every live sink concurrently; sinks filter, format and write.
//!
//! # Architecture
//!
//! ```text
//! [Dispatcher] --Arc<Batch>--> [Sink::handle] --> [filter] --> [format] --> [destination]
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Purpose | Workers |
//! |------|---------|---------|
//! | `RotatingFileSink` | Append / size / interval / daily rotated files | rotation + disk-space |
//! | `DatagramSink` | One UDP datagram per record | none |
//!
//! Both sinks compose the same substrate: a disjunctive filter chain with a
//! memoised per-source-location verdict cache, and a compiled line format.
//! Sinks are user-owned (`Arc`); the pipeline registry keeps only weak
//! references, so dropping the last user handle retires the sink from
//! dispatch and stops its workers.

/// Sink capability trait, filter chain substrate, shared errors
mod common;

/// Datagram (UDP) sink
mod datagram;

/// Rotating-file sink and its rotation state machine
mod rotating;

pub use common::{Filter, FilterSet, Sink, SinkError};
pub use datagram::{DatagramSink, IpVersion, MAX_DATAGRAM_BYTES};
pub use rotating::RotatingFileSink;

//! Quill Pipeline - asynchronous multi-producer / single-consumer logging
//!
//! Producers enqueue lightweight records on a lock-free queue and never
//! block on I/O; a dedicated dispatcher task drains batches, optionally
//! restores total sequence order, and fans each batch out to every live
//! sink concurrently.
//!
//! # Architecture
//!
//! ```text
//! [Producers]                [Dispatcher]                    [Sinks]
//!   thread --+                                           +--> rotating file
//!   thread --+--> IngestQueue --> drain/sort --> Arc<Batch> --> rotating file
//!   thread --+     (shard swap)                          +--> UDP datagram
//! ```
//!
//! # Key Design
//!
//! - **Wait-free producers**: enqueue stamps an atomic sequence number and
//!   pushes to a lock-free ring; sink I/O latency never reaches producers.
//! - **Ordered delivery on request**: `InitMode::PerfectlyOrdered` swaps the
//!   queue shard per drain and sorts by sequence number, so sinks observe a
//!   strictly increasing sequence across the run.
//! - **Weak sink registry**: sinks are user-owned; the registry keeps weak
//!   references and compacts expired ones past a small threshold.
//! - **Best-effort everywhere**: no logging failure propagates back to a
//!   producing call site.
//!
//! # Example
//!
//! ```ignore
//! use quill_pipeline::{log_async, shutdown_logging, register_log, LOG_INFO};
//!
//! let app_log = register_log("app.log");
//! log_async!([LOG_INFO], "ready after {}ms", elapsed);
//! shutdown_logging();
//! ```

/// Call-site counters backing the "every N" macros
pub mod counters;

mod dispatcher;
mod error;
mod global;
mod macros;
mod queue;
mod registry;
mod stream;

pub use dispatcher::InitMode;
pub use error::{PipelineError, Result};
pub use global::{
    init_logging, register_daily_log, register_interval_rotated_log, register_log,
    register_size_rotated_log, register_udp_destination, set_disk_space_threshold,
    set_logging_level, should_log, shutdown_logging,
};
pub use queue::{IngestQueue, QueueMode};
pub use registry::Pipeline;
pub use stream::LogStream;

// Re-export the types producers and sinks meet at the API surface
pub use quill_protocol::{
    Batch, Level, Record, LOG_ALL, LOG_DEBUG, LOG_ERROR, LOG_FATAL, LOG_INFO, LOG_WARN,
};
pub use quill_sinks::{DatagramSink, Filter, IpVersion, RotatingFileSink, Sink};

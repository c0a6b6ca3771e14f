//! Process-global entry points
//!
//! Synchronous convenience wrappers around [`Pipeline::global`] for
//! programs whose producers are plain OS threads. Each wrapper drives the
//! global pipeline's own background runtime, so none of these may be called
//! from inside an async context - use the `Pipeline` methods directly
//! there.

use std::path::PathBuf;
use std::sync::Arc;

use quill_protocol::Level;
use quill_sinks::{DatagramSink, IpVersion, RotatingFileSink};

use crate::dispatcher::InitMode;
use crate::registry::Pipeline;

/// Set up the logging system
///
/// Called implicitly by every registration function with the default mode;
/// call it yourself only to pick a different one. The first initialisation
/// wins for the process lifetime.
pub fn init_logging(mode: InitMode) {
    Pipeline::global().init(mode);
}

/// Drain outstanding records and stop the dispatcher
///
/// Not required for correctness of what was already written, but ensures
/// every record enqueued before this call reaches its sinks.
pub fn shutdown_logging() {
    let pipeline = Pipeline::global();
    pipeline.runtime_handle().block_on(pipeline.shutdown());
}

/// Register a plain append-only log
pub fn register_log(path: impl Into<PathBuf>) -> Arc<RotatingFileSink> {
    let pipeline = Pipeline::global();
    pipeline
        .runtime_handle()
        .block_on(pipeline.register_log(path))
}

/// Register a size-rotated log with cascading rename
pub fn register_size_rotated_log(
    path: impl Into<PathBuf>,
    max_bytes: u64,
    rotate_through: u32,
) -> Arc<RotatingFileSink> {
    let pipeline = Pipeline::global();
    pipeline
        .runtime_handle()
        .block_on(pipeline.register_size_rotated_log(path, max_bytes, rotate_through))
}

/// Register an interval-rotated log
pub fn register_interval_rotated_log(
    path: impl Into<PathBuf>,
    seconds_per_log: u64,
    rotate_through: u32,
) -> Arc<RotatingFileSink> {
    let pipeline = Pipeline::global();
    pipeline
        .runtime_handle()
        .block_on(pipeline.register_interval_rotated_log(path, seconds_per_log, rotate_through))
}

/// Register a log rotated at a daily wall-clock time
pub fn register_daily_log(
    path: impl Into<PathBuf>,
    hour: u32,
    minute: u32,
    second: u32,
) -> Arc<RotatingFileSink> {
    let pipeline = Pipeline::global();
    pipeline
        .runtime_handle()
        .block_on(pipeline.register_daily_log(path, hour, minute, second))
}

/// Register a UDP datagram destination
pub fn register_udp_destination(
    host: impl Into<String>,
    port: u16,
    version: IpVersion,
) -> Arc<DatagramSink> {
    Pipeline::global().register_udp_destination(host, port, version)
}

/// Replace the process level filter
pub fn set_logging_level(level: Level) {
    Pipeline::global().set_level(level);
}

/// Set the disk-usage percentage above which file sinks drop records
pub fn set_disk_space_threshold(percent: f64) {
    Pipeline::global().set_disk_space_threshold(percent);
}

/// Would a record with these tags be logged at all?
pub fn should_log(tags: &[&str]) -> bool {
    Pipeline::global().should_log(tags)
}

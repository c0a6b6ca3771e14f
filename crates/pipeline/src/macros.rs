//! Logging macros for the producer side
//!
//! Logging is based on tags, not levels: tags are more descriptive and
//! allow much richer per-sink organisation of file data. The level tags
//! (`LOG_INFO` and friends) are ordinary tags the process level filter
//! knows about.
//!
//! Tags given on any logging line must be constant: the tag memo and the
//! per-sink filter caches key on the call site and assume its tags never
//! change at runtime.

/// The `file::line` literal identifying the current call site
///
/// # Examples
/// ```
/// let here: &'static str = quill_pipeline::source_location!();
/// assert!(here.contains("::"));
/// ```
#[macro_export]
macro_rules! source_location {
    () => {
        concat!(file!(), "::", line!())
    };
}

/// Log a formatted line with the given tags
///
/// # Examples
/// ```ignore
/// log_async!([LOG_INFO, "NETWORK"], "connected to {} in {}ms", peer, ms);
/// ```
#[macro_export]
macro_rules! log_async {
    ([$($tag:expr),* $(,)?], $($arg:tt)+) => {{
        const TAGS: &[&str] = &[$($tag),*];
        let pipeline = $crate::Pipeline::global();
        if pipeline.should_log(TAGS) {
            pipeline.enqueue($crate::Record::new(
                $crate::source_location!(),
                TAGS,
                format!($($arg)+),
            ));
        }
    }};
}

/// Log a formatted line only when `cond` holds
///
/// # Examples
/// ```ignore
/// log_async_if!(latency > limit, [LOG_WARN], "slow reply: {}ms", latency);
/// ```
#[macro_export]
macro_rules! log_async_if {
    ($cond:expr, [$($tag:expr),* $(,)?], $($arg:tt)+) => {
        if $cond {
            $crate::log_async!([$($tag),*], $($arg)+);
        }
    };
}

/// Log a formatted line on every `n`-th hit of this call site, counted
/// across all threads
///
/// Keep each use on its own source line; the counter is keyed by call site.
///
/// # Examples
/// ```ignore
/// log_async_every!(1000, [LOG_DEBUG], "heartbeat {}", beat);
/// ```
#[macro_export]
macro_rules! log_async_every {
    ($n:expr, [$($tag:expr),* $(,)?], $($arg:tt)+) => {{
        if $crate::counters::count_of($crate::source_location!()) % $n == 0 {
            $crate::log_async!([$($tag),*], $($arg)+);
        }
    }};
}

/// Log a formatted line on every `n`-th hit of `(id, call site)`, counted
/// per thread
///
/// # Examples
/// ```ignore
/// log_async_every_id!(worker_id, 500, [LOG_DEBUG], "worker {} alive", worker_id);
/// ```
#[macro_export]
macro_rules! log_async_every_id {
    ($id:expr, $n:expr, [$($tag:expr),* $(,)?], $($arg:tt)+) => {{
        if $crate::counters::count_of_id($id, $crate::source_location!()) % $n == 0 {
            $crate::log_async!([$($tag),*], $($arg)+);
        }
    }};
}

/// Open a stream-style log line against the global pipeline
///
/// The returned guard implements `std::fmt::Write`; dropping it commits the
/// accumulated text as one record.
///
/// # Examples
/// ```ignore
/// use std::fmt::Write;
/// let mut line = log_stream!([LOG_INFO]);
/// let _ = write!(line, "phase {} of {}", phase, total);
/// ```
#[macro_export]
macro_rules! log_stream {
    ([$($tag:expr),* $(,)?]) => {{
        const TAGS: &[&str] = &[$($tag),*];
        $crate::Pipeline::global().stream($crate::source_location!(), TAGS)
    }};
}

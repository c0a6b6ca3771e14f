//! Pipeline - the sink registry and process lifecycle
//!
//! One `Pipeline` owns the ingestion queue, the dispatcher, the quit flag
//! and weak references to every registered sink. A process-wide instance
//! backed by its own runtime serves the logging macros; tests construct
//! private instances on their own runtime to isolate state.
//!
//! # Lifecycle
//!
//! Teardown order on shutdown: producers quiesce (`should_log` goes false
//! once the quit flag flips), the queue drains to zero outstanding records,
//! the dispatcher stops, and sinks drop whenever their owners release them.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::{Mutex, RwLock};
use quill_protocol::{Level, Record};
use quill_sinks::{DatagramSink, IpVersion, RotatingFileSink, Sink};
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{self, InitMode};
use crate::error::PipelineError;
use crate::queue::IngestQueue;
use crate::stream::LogStream;

/// Sleep between outstanding-count polls during shutdown
const SHUTDOWN_POLL_SLEEP: Duration = Duration::from_millis(100);

static GLOBAL: Lazy<Pipeline> = Lazy::new(|| {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("quill")
        .enable_all()
        .build()
        .expect("failed to build the quill background runtime");
    Pipeline::with_runtime(RuntimeHolder::Owned(runtime))
});

/// The runtime a pipeline schedules its workers on
enum RuntimeHolder {
    /// The global pipeline owns a dedicated background runtime so producers
    /// can be plain OS threads
    Owned(Runtime),

    /// Private pipelines borrow the caller's runtime
    Borrowed(Handle),
}

impl RuntimeHolder {
    fn handle(&self) -> Handle {
        match self {
            RuntimeHolder::Owned(runtime) => runtime.handle().clone(),
            RuntimeHolder::Borrowed(handle) => handle.clone(),
        }
    }
}

/// Registry and lifecycle for one logging pipeline
pub struct Pipeline {
    /// Created by `init`; the mode is a one-time choice
    queue: OnceCell<Arc<IngestQueue>>,

    /// Weak back-references only: the dispatcher never extends a sink's
    /// lifetime
    sinks: Arc<RwLock<Vec<Weak<dyn Sink>>>>,

    /// File sinks tracked separately so disk-threshold updates can reach
    /// them without downcasting
    file_sinks: RwLock<Vec<Weak<RotatingFileSink>>>,

    /// Active process level filter (`Level` repr)
    level: AtomicU8,

    /// Global disk-full flag mirrored by the file sinks' watchers
    space_exceeded: Arc<AtomicBool>,

    /// Disk-usage fraction applied to newly registered file sinks
    disk_threshold: Mutex<f64>,

    /// Process quit flag
    quit: CancellationToken,

    runtime: RuntimeHolder,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Pipeline {
    /// The process-wide pipeline used by the logging macros
    pub fn global() -> &'static Pipeline {
        &GLOBAL
    }

    /// Create a private pipeline on the caller's runtime
    ///
    /// Intended for tests and embedded use; fails outside a tokio runtime.
    pub fn new() -> Result<Self, PipelineError> {
        Ok(Self::with_runtime(RuntimeHolder::Borrowed(
            Handle::try_current()?,
        )))
    }

    fn with_runtime(runtime: RuntimeHolder) -> Self {
        Self {
            queue: OnceCell::new(),
            sinks: Arc::new(RwLock::new(Vec::new())),
            file_sinks: RwLock::new(Vec::new()),
            level: AtomicU8::new(Level::All as u8),
            space_exceeded: Arc::new(AtomicBool::new(false)),
            disk_threshold: Mutex::new(1.0),
            quit: CancellationToken::new(),
            runtime,
            dispatcher: Mutex::new(None),
        }
    }

    /// Initialise the queue and dispatcher
    ///
    /// The first call decides the mode for the whole pipeline lifetime;
    /// later calls are no-ops (a mismatched mode is reported and ignored).
    /// Registration initialises implicitly, so calling this is only needed
    /// to pick a non-default mode.
    pub fn init(&self, mode: InitMode) {
        let mut newly_created = false;
        let queue = self.queue.get_or_init(|| {
            newly_created = true;
            Arc::new(IngestQueue::new(mode.queue_mode()))
        });

        if newly_created {
            let task = dispatcher::run(
                Arc::clone(queue),
                Arc::clone(&self.sinks),
                self.quit.clone(),
                mode.dispatches(),
            );
            *self.dispatcher.lock() = Some(self.runtime.handle().spawn(task));
            tracing::debug!(?mode, "pipeline initialised");
        } else if queue.mode() != mode.queue_mode() {
            tracing::warn!(
                ?mode,
                "pipeline already initialised; mode change ignored"
            );
        }
    }

    /// Do we even need to build a record?
    ///
    /// False once the quit flag flips, while the disk is over threshold,
    /// while no sinks are registered, or when the level filter rejects the
    /// tags - so producers pay near-zero cost when nothing would be logged.
    pub fn should_log(&self, tags: &[&str]) -> bool {
        !self.quit.is_cancelled()
            && !self.space_exceeded.load(Ordering::Relaxed)
            && !self.sinks.read().is_empty()
            && self.level().accepts(tags)
    }

    /// The active process level filter
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Replace the process level filter
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    /// Stamp and enqueue a record
    ///
    /// A no-op before `init` (nothing could consume it).
    pub fn enqueue(&self, record: Record) {
        if let Some(queue) = self.queue.get() {
            queue.enqueue(record);
        }
    }

    /// Format-style entry point: build and enqueue a record if it would be
    /// logged at all
    pub fn log(&self, source: &'static str, tags: &'static [&'static str], message: String) {
        if self.should_log(tags) {
            self.enqueue(Record::new(source, tags, message));
        }
    }

    /// Stream-style entry point: returns a guard that accumulates text via
    /// `std::fmt::Write` and commits one record when dropped
    pub fn stream(
        &self,
        source: &'static str,
        tags: &'static [&'static str],
    ) -> LogStream<'_> {
        LogStream::new(self, source, tags, self.should_log(tags))
    }

    /// Register an arbitrary sink
    ///
    /// The registry keeps only a weak reference: the sink drops out of
    /// dispatch when the caller releases the returned/held `Arc`.
    pub fn attach<S: Sink + 'static>(&self, sink: &Arc<S>) {
        self.init(InitMode::default());
        let sink: Arc<dyn Sink> = sink.clone();
        let weak: Weak<dyn Sink> = Arc::downgrade(&sink);
        self.sinks.write().push(weak);
    }

    /// Register a plain append-only log
    pub async fn register_log(&self, path: impl Into<PathBuf>) -> Arc<RotatingFileSink> {
        let sink = self.new_file_sink(path);
        sink.append_only().await;
        self.adopt_file_sink(&sink).await;
        sink
    }

    /// Register a size-rotated log with cascading rename
    pub async fn register_size_rotated_log(
        &self,
        path: impl Into<PathBuf>,
        max_bytes: u64,
        rotate_through: u32,
    ) -> Arc<RotatingFileSink> {
        let sink = self.new_file_sink(path);
        sink.rotate_at_size(max_bytes, rotate_through).await;
        self.adopt_file_sink(&sink).await;
        sink
    }

    /// Register an interval-rotated log
    pub async fn register_interval_rotated_log(
        &self,
        path: impl Into<PathBuf>,
        seconds_per_log: u64,
        rotate_through: u32,
    ) -> Arc<RotatingFileSink> {
        let sink = self.new_file_sink(path);
        sink.rotate_after_elapsed(Duration::from_secs(seconds_per_log), rotate_through)
            .await;
        self.adopt_file_sink(&sink).await;
        sink
    }

    /// Register a log rotated at a daily wall-clock time
    pub async fn register_daily_log(
        &self,
        path: impl Into<PathBuf>,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Arc<RotatingFileSink> {
        let sink = self.new_file_sink(path);
        sink.rotate_at_time(hour, minute, second).await;
        self.adopt_file_sink(&sink).await;
        sink
    }

    /// Register a UDP datagram destination
    pub fn register_udp_destination(
        &self,
        host: impl Into<String>,
        port: u16,
        version: IpVersion,
    ) -> Arc<DatagramSink> {
        let sink = DatagramSink::new(host, port, version);
        self.attach(&sink);
        sink
    }

    /// Set the disk-usage percentage above which file sinks drop records
    ///
    /// 0.0 stops logging immediately; 100.0 logs until the device refuses.
    /// Applies to already-registered file sinks as well as future ones.
    pub fn set_disk_space_threshold(&self, percent: f64) {
        let fraction = (percent / 100.0).clamp(0.0, 1.0);
        *self.disk_threshold.lock() = fraction;

        for weak in self.file_sinks.read().iter() {
            if let Some(sink) = weak.upgrade() {
                sink.set_disk_threshold(fraction);
            }
        }
    }

    /// Drain and stop
    ///
    /// Flips the quit flag (producers' `should_log` goes false), waits for
    /// the queue to drain to zero outstanding records, then joins the
    /// dispatcher, which dispatches the final batch before exiting.
    pub async fn shutdown(&self) {
        self.quit.cancel();

        if let Some(queue) = self.queue.get() {
            while queue.outstanding() > 0 {
                tokio::time::sleep(SHUTDOWN_POLL_SLEEP).await;
            }
        }

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            if let Err(error) = dispatcher.await {
                tracing::error!(%error, "dispatcher join failed");
            }
        }
    }

    pub(crate) fn runtime_handle(&self) -> Handle {
        self.runtime.handle()
    }

    fn new_file_sink(&self, path: impl Into<PathBuf>) -> Arc<RotatingFileSink> {
        // Sink construction spawns its disk-space watcher, which needs a
        // runtime context even when the caller is a plain thread.
        let handle = self.runtime.handle();
        let _guard = handle.enter();
        RotatingFileSink::new(path)
    }

    async fn adopt_file_sink(&self, sink: &Arc<RotatingFileSink>) {
        sink.set_disk_threshold(*self.disk_threshold.lock());
        sink.mirror_space_flag(Arc::clone(&self.space_exceeded)).await;
        self.file_sinks.write().push(Arc::downgrade(sink));
        self.attach(sink);
    }
}

//! Rotating-file sink
//!
//! Writes formatted records to a file whose rotation is driven by one of
//! four modes: append-only, by size (cascading rename), after an elapsed
//! interval, or at a daily wall-clock time.
//!
//! # Rotation drivers
//!
//! Size-based rotation is triggered inline by the write path, which already
//! tracks bytes written. Interval and daily rotation are driven by a worker
//! task that sleeps interruptibly to the next trigger; a rotation raced
//! ahead by the write path suppresses the worker's rotation for that round.
//!
//! # Filesystem layout
//!
//! - Append mode: `<path>` only, never renamed.
//! - Size / interval mode with rotate-through `N`: `<path>`, `<path>.1`, ...
//!   `<path>.<N-1>`; files are renamed on rotation, the oldest is removed.
//! - Daily mode: `<path>.YYYY.M.D` (plain integers, no zero padding). If
//!   "now" precedes today's trigger the suffix names yesterday - the log
//!   still belongs to the previous day.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use chrono::{DateTime, Datelike, Local};
use quill_format::LineFormat;
use quill_protocol::Batch;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::common::{Filter, FilterSet, Sink};

/// Buffered bytes before the write path writes and flushes
const WRITE_BUFFER_FLUSH_BYTES: usize = 4096;

/// How often the disk-space watcher samples the filesystem
const DISK_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// How the active file is cycled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// Append to the base path forever
    Append,

    /// Rotate with cascading rename once the active file reaches `max_bytes`
    BySize { max_bytes: u64, rotate_through: u32 },

    /// Rotate with cascading rename every `interval`
    ByInterval {
        interval: Duration,
        rotate_through: u32,
    },

    /// Open a fresh dated file at the given local wall-clock time each day
    AtDailyTime { hour: u32, minute: u32, second: u32 },
}

/// Mutable file-side state, guarded by the sink's file lock
struct FileState {
    mode: RotationMode,
    file: Option<File>,

    /// Bytes written to the active file (seeded from `stat` on open)
    size: u64,

    /// Instant the active file was last opened
    last_rotated: DateTime<Local>,

    /// Reusable write buffer
    buffer: BytesMut,

    /// Reusable line-render scratch
    scratch: String,
}

impl FileState {
    fn new() -> Self {
        Self {
            mode: RotationMode::Append,
            file: None,
            size: 0,
            last_rotated: Local::now(),
            buffer: BytesMut::with_capacity(WRITE_BUFFER_FLUSH_BYTES),
            scratch: String::with_capacity(256),
        }
    }

    /// The name the active file should currently have
    fn file_name(&self, base: &Path) -> PathBuf {
        match self.mode {
            RotationMode::AtDailyTime {
                hour,
                minute,
                second,
            } => daily_file_name(base, hour, minute, second, Local::now()),
            _ => base.to_path_buf(),
        }
    }

    /// Close any open log, open `path` in append mode, reload its size
    fn open(&mut self, path: &Path) {
        self.file = None;
        self.size = 0;
        self.last_rotated = Local::now();

        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                self.size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                self.file = Some(file);
            }
            Err(error) => {
                tracing::error!(path = %path.display(), %error, "unable to open log file");
            }
        }
    }

    /// Write out and flush the buffered bytes, then re-check rotation
    fn flush_buffer(&mut self, base: &Path) {
        if self.buffer.is_empty() {
            return;
        }
        if let Some(file) = self.file.as_mut() {
            if let Err(error) = file.write_all(&self.buffer).and_then(|()| file.flush()) {
                tracing::warn!(path = %base.display(), %error, "log write failed");
            }
            self.size += self.buffer.len() as u64;
        }
        self.buffer.clear();
        self.check_rotation(base);
    }

    /// Inline rotation trigger: size mode by byte count, interval mode as a
    /// backup for a worker that has not woken yet
    fn check_rotation(&mut self, base: &Path) {
        let due = match self.mode {
            RotationMode::BySize { max_bytes, .. } => self.size >= max_bytes,
            RotationMode::ByInterval { interval, .. } => {
                elapsed_since(self.last_rotated) > interval
            }
            _ => false,
        };
        if due {
            self.rotate(base);
        }
    }

    /// Close, cascade-rename if the mode retains history, reopen
    fn rotate(&mut self, base: &Path) {
        self.file = None;

        let rotate_through = match self.mode {
            RotationMode::BySize { rotate_through, .. }
            | RotationMode::ByInterval { rotate_through, .. } => rotate_through,
            _ => 0,
        };
        if rotate_through > 1 {
            cascade_rename(base, rotate_through);
        } else {
            // No history retained: start the base file over.
            remove_if_exists(base);
        }

        let name = self.file_name(base);
        self.open(&name);
    }
}

/// Shared sink internals; workers hold this, never the outer sink, so the
/// user's last strong reference is what decides the sink's lifetime.
struct FileSinkInner {
    base: PathBuf,

    // One lock per concern; batch processing takes them jointly in the fixed
    // order file -> config -> filters.
    file: Mutex<FileState>,
    config: Mutex<LineFormat>,
    filters: Mutex<FilterSet>,

    /// Volatile disk-full flag, set by the disk-space watcher
    disk_full: AtomicBool,

    /// Disk-usage threshold as an `f64` fraction in bit representation
    disk_threshold_bits: AtomicU64,

    /// Mirror of `disk_full` shared with the pipeline's `should_log` fast path
    shared_space_flag: Mutex<Option<Arc<AtomicBool>>>,

    /// Local quit flag; cancelled when the user drops the sink
    cancel: CancellationToken,

    /// Active interval/daily rotation worker, replaced on mode change
    rotation_worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// A log file with size / interval / daily rotation
///
/// Created inside a tokio runtime (the pipeline registry enters its own
/// runtime before constructing sinks). The sink is user-owned: the registry
/// keeps a weak reference only, and dropping the last user handle cancels
/// the rotation and disk-space workers.
pub struct RotatingFileSink {
    inner: Arc<FileSinkInner>,
}

impl RotatingFileSink {
    /// Create an append-mode sink for `path`
    ///
    /// An empty path is replaced with `Unknown.<unix-time>.log`. The file is
    /// opened lazily by the first batch (or the first mode change).
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        let mut base: PathBuf = path.into();
        if base.as_os_str().is_empty() {
            base = PathBuf::from(format!("Unknown.{}.log", Local::now().timestamp()));
        }

        let inner = Arc::new(FileSinkInner {
            base,
            file: Mutex::new(FileState::new()),
            config: Mutex::new(LineFormat::default()),
            filters: Mutex::new(FilterSet::new()),
            disk_full: AtomicBool::new(false),
            disk_threshold_bits: AtomicU64::new(1.0_f64.to_bits()),
            shared_space_flag: Mutex::new(None),
            cancel: CancellationToken::new(),
            rotation_worker: std::sync::Mutex::new(None),
        });

        tokio::spawn(disk_space_watcher(Arc::clone(&inner)));

        Arc::new(Self { inner })
    }

    /// Base path this sink logs under
    pub fn path(&self) -> &Path {
        &self.inner.base
    }

    /// Switch to append-only mode (no rotation, no worker)
    pub async fn append_only(&self) {
        self.stop_rotation_worker();
        let mut state = self.inner.file.lock().await;
        state.mode = RotationMode::Append;
        let name = state.file_name(&self.inner.base);
        state.open(&name);
    }

    /// Rotate once the active file reaches `max_bytes`, retaining
    /// `rotate_through` files in total
    ///
    /// No worker runs in this mode; the write path tracks the size itself.
    pub async fn rotate_at_size(&self, max_bytes: u64, rotate_through: u32) {
        self.stop_rotation_worker();
        let mut state = self.inner.file.lock().await;
        state.mode = RotationMode::BySize {
            max_bytes,
            rotate_through,
        };
        let name = state.file_name(&self.inner.base);
        state.open(&name);
    }

    /// Rotate every `interval`, retaining `rotate_through` files in total
    pub async fn rotate_after_elapsed(&self, interval: Duration, rotate_through: u32) {
        self.stop_rotation_worker();
        {
            let mut state = self.inner.file.lock().await;
            state.mode = RotationMode::ByInterval {
                interval,
                rotate_through,
            };
            let name = state.file_name(&self.inner.base);
            state.open(&name);
        }
        self.spawn_rotation_worker(interval_rotation_worker(Arc::clone(&self.inner)));
    }

    /// Open a fresh dated file at the given local time every day
    pub async fn rotate_at_time(&self, hour: u32, minute: u32, second: u32) {
        self.stop_rotation_worker();
        {
            let mut state = self.inner.file.lock().await;
            state.mode = RotationMode::AtDailyTime {
                hour,
                minute,
                second,
            };
            let name = state.file_name(&self.inner.base);
            state.open(&name);
        }
        self.spawn_rotation_worker(daily_rotation_worker(Arc::clone(&self.inner)));
    }

    /// Append a filter to this sink's chain
    pub async fn add_filter(&self, filter: Filter) {
        self.inner.filters.lock().await.add(filter);
    }

    /// Replace the chain with a single filter
    pub async fn set_exclusive_filter(&self, filter: Filter) {
        self.inner.filters.lock().await.set_exclusive(filter);
    }

    /// Clear all filters
    pub async fn clear_filters(&self) {
        self.inner.filters.lock().await.clear();
    }

    /// Stop memoising filter verdicts per source location
    ///
    /// Required for filters that inspect the timestamp or message body.
    pub async fn disable_cache(&self) {
        self.inner.filters.lock().await.disable_cache();
    }

    /// Resume memoising filter verdicts (the default)
    pub async fn enable_cache(&self) {
        self.inner.filters.lock().await.enable_cache();
    }

    /// Replace the line and timestamp templates
    pub async fn set_format(&self, line_template: &str, time_template: &str) {
        *self.inner.config.lock().await = LineFormat::compile(line_template, time_template);
    }

    /// Set the disk-usage fraction above which records are dropped
    ///
    /// 0.0 means "always full" and 1.0 means "write until the device
    /// refuses". The watcher applies the new threshold at its next sample.
    pub fn set_disk_threshold(&self, fraction: f64) {
        let clamped = fraction.clamp(0.0, 1.0);
        self.inner
            .disk_threshold_bits
            .store(clamped.to_bits(), Ordering::Relaxed);
    }

    /// Share the registry's global space-exceeded flag with this sink's
    /// watcher so producers can skip record creation while the disk is full
    pub async fn mirror_space_flag(&self, flag: Arc<AtomicBool>) {
        *self.inner.shared_space_flag.lock().await = Some(flag);
    }

    fn stop_rotation_worker(&self) {
        if let Some(worker) = self.inner.rotation_worker.lock().unwrap().take() {
            worker.abort();
        }
    }

    fn spawn_rotation_worker(
        &self,
        worker: impl std::future::Future<Output = ()> + Send + 'static,
    ) {
        *self.inner.rotation_worker.lock().unwrap() = Some(tokio::spawn(worker));
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
        self.stop_rotation_worker();
    }
}

#[async_trait::async_trait]
impl Sink for RotatingFileSink {
    async fn handle(&self, batch: Arc<Batch>) {
        let inner = &self.inner;

        // Fixed acquisition order: file -> config -> filters.
        let mut state = inner.file.lock().await;
        let config = inner.config.lock().await;
        let mut filters = inner.filters.lock().await;

        if inner.cancel.is_cancelled() {
            return;
        }

        if state.file.is_none() {
            let name = state.file_name(&inner.base);
            state.open(&name);
        }

        // Records are dropped, not queued, while the file is unopenable or
        // the disk is over threshold.
        if state.file.is_none() || inner.disk_full.load(Ordering::Relaxed) {
            return;
        }

        for record in batch.iter() {
            if !filters.accepts(record) || inner.cancel.is_cancelled() {
                continue;
            }

            let mut line = std::mem::take(&mut state.scratch);
            line.clear();
            config.render(record, &mut line);
            line.push('\n');
            state.buffer.extend_from_slice(line.as_bytes());
            state.scratch = line;

            if state.buffer.len() >= WRITE_BUFFER_FLUSH_BYTES {
                state.flush_buffer(&inner.base);
            }
        }

        if !inner.cancel.is_cancelled() && !inner.disk_full.load(Ordering::Relaxed) {
            state.flush_buffer(&inner.base);
        }
    }
}

/// Worker for `ByInterval` mode: sleep to the next boundary, then rotate
/// unless an inline rotation raced ahead while we slept
async fn interval_rotation_worker(inner: Arc<FileSinkInner>) {
    loop {
        let (observed_rotation, interval) = {
            let state = inner.file.lock().await;
            match state.mode {
                RotationMode::ByInterval { interval, .. } => (state.last_rotated, interval),
                _ => return,
            }
        };

        let until_next = interval.saturating_sub(elapsed_since(observed_rotation));
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            _ = tokio::time::sleep(until_next) => {}
        }

        let mut state = inner.file.lock().await;
        if state.last_rotated == observed_rotation {
            state.rotate(&inner.base);
        }
    }
}

/// Worker for `AtDailyTime` mode: open the dated log at each daily boundary
async fn daily_rotation_worker(inner: Arc<FileSinkInner>) {
    loop {
        let (hour, minute, second) = {
            let state = inner.file.lock().await;
            match state.mode {
                RotationMode::AtDailyTime {
                    hour,
                    minute,
                    second,
                } => (hour, minute, second),
                _ => return,
            }
        };

        let now = Local::now();
        let until_next = until_next_daily_trigger(now, hour, minute, second);
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            _ = tokio::time::sleep(until_next) => {}
        }

        let mut state = inner.file.lock().await;
        let name = state.file_name(&inner.base);
        state.open(&name);
    }
}

/// Periodically sample free space for the log directory and gate the write
/// path when the used fraction reaches the configured threshold
async fn disk_space_watcher(inner: Arc<FileSinkInner>) {
    loop {
        tokio::select! {
            _ = inner.cancel.cancelled() => return,
            _ = tokio::time::sleep(DISK_SAMPLE_INTERVAL) => {}
        }

        let directory = inner
            .base
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        if let Some(used) = disk_used_fraction(directory) {
            let threshold = f64::from_bits(inner.disk_threshold_bits.load(Ordering::Relaxed));
            let full = used >= threshold;

            if full && !inner.disk_full.load(Ordering::Relaxed) {
                tracing::warn!(
                    path = %inner.base.display(),
                    used_fraction = used,
                    threshold,
                    "disk over threshold, dropping records"
                );
            }
            inner.disk_full.store(full, Ordering::Relaxed);

            if let Some(flag) = inner.shared_space_flag.lock().await.as_ref() {
                flag.store(full, Ordering::Relaxed);
            }
        }
    }
}

/// Used fraction of the filesystem holding `directory`, if it can be found
fn disk_used_fraction(directory: &Path) -> Option<f64> {
    let canonical = fs::canonicalize(directory).ok()?;
    let disks = sysinfo::Disks::new_with_refreshed_list();

    // Longest mount-point prefix owns the directory.
    let disk = disks
        .iter()
        .filter(|d| canonical.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())?;

    let total = disk.total_space();
    if total == 0 {
        return None;
    }
    Some((total - disk.available_space()) as f64 / total as f64)
}

/// Shift `<base>.<i>` back by one for i = N-1..1, dropping the oldest, then
/// move the active file to `<base>.1`
///
/// Failures are reported and skipped; a rename that cannot happen never
/// aborts logging.
fn cascade_rename(base: &Path, rotate_through: u32) {
    remove_if_exists(&numbered(base, rotate_through - 1));

    for index in (1..rotate_through).rev() {
        let from = numbered(base, index);
        if from.exists() {
            let to = numbered(base, index + 1);
            if let Err(error) = fs::rename(&from, &to) {
                tracing::warn!(from = %from.display(), to = %to.display(), %error, "log rename failed");
            }
        }
    }

    if base.exists() {
        let to = numbered(base, 1);
        if let Err(error) = fs::rename(base, &to) {
            tracing::warn!(from = %base.display(), to = %to.display(), %error, "log rename failed");
        }
    }
}

fn remove_if_exists(path: &Path) {
    if path.exists() {
        if let Err(error) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), %error, "log remove failed");
        }
    }
}

/// `<base>.<index>`
fn numbered(base: &Path, index: u32) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// `<base>.YYYY.M.D` for the most recent daily trigger
///
/// If `now` precedes today's trigger instant, the log still belongs to
/// yesterday and the suffix names yesterday's date. Plain integer formatting
/// keeps the name locale-independent.
fn daily_file_name(base: &Path, hour: u32, minute: u32, second: u32, now: DateTime<Local>) -> PathBuf {
    let today = now.date_naive();
    let trigger = today
        .and_hms_opt(hour, minute, second)
        .unwrap_or_else(|| today.and_hms_opt(0, 0, 0).expect("midnight is always valid"));

    let effective = if now.naive_local() < trigger {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    };

    let mut name = base.as_os_str().to_os_string();
    name.push(format!(
        ".{}.{}.{}",
        effective.year(),
        effective.month(),
        effective.day()
    ));
    PathBuf::from(name)
}

/// Sleep duration until the next occurrence of the daily H:M:S boundary
fn until_next_daily_trigger(now: DateTime<Local>, hour: u32, minute: u32, second: u32) -> Duration {
    let today = now.date_naive();
    let trigger_today = today
        .and_hms_opt(hour, minute, second)
        .unwrap_or_else(|| today.and_hms_opt(0, 0, 0).expect("midnight is always valid"));

    let next = if trigger_today > now.naive_local() {
        trigger_today
    } else {
        trigger_today + chrono::Duration::days(1)
    };

    (next - now.naive_local()).to_std().unwrap_or(Duration::ZERO)
}

/// Wall-clock time since `instant`, saturating at zero if the clock stepped
fn elapsed_since(instant: DateTime<Local>) -> Duration {
    (Local::now() - instant).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[path = "rotating_test.rs"]
mod rotating_test;

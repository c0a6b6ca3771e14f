//! Datagram (UDP) sink
//!
//! Sends each accepted record as one UDP datagram whose payload is the
//! formatted line, truncated to the maximum datagram size. There is no
//! framing beyond the datagram boundary and no delivery guarantee; send
//! failures are reported and the record is dropped.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use quill_format::LineFormat;
use quill_protocol::Batch;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::common::{Filter, FilterSet, Sink, SinkError};

/// Largest payload a single datagram carries; longer lines are cut here
pub const MAX_DATAGRAM_BYTES: usize = 65_535;

/// Seconds between endpoint resolve attempts after a failure
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 2;

/// Address family the destination resolves under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// The unspecified local bind address for this family
    fn bind_addr(self) -> &'static str {
        match self {
            IpVersion::V4 => "0.0.0.0:0",
            IpVersion::V6 => "[::]:0",
        }
    }

    fn matches(self, addr: &SocketAddr) -> bool {
        match self {
            IpVersion::V4 => addr.is_ipv4(),
            IpVersion::V6 => addr.is_ipv6(),
        }
    }
}

/// Socket-side state, guarded by the sink's socket lock
struct SocketState {
    socket: Option<UdpSocket>,
    endpoint: Option<SocketAddr>,

    /// Last failed resolve/bind attempt, for retry pacing
    last_failure: Option<Instant>,

    /// Reusable line-render scratch
    scratch: String,
}

struct DatagramInner {
    host: String,
    port: u16,
    version: IpVersion,

    // One lock per concern, taken in the fixed order socket -> config ->
    // filters (mirrors the file sink's ordering discipline).
    socket: Mutex<SocketState>,
    config: Mutex<LineFormat>,
    filters: Mutex<FilterSet>,

    /// Seconds to wait between resolve attempts after a failure
    retry_interval_secs: AtomicU64,

    /// Local quit flag; cancelled when the user drops the sink
    cancel: CancellationToken,
}

/// A UDP destination for formatted records
///
/// "Connection is open" for a datagram socket means the socket is bound and
/// open; there is no handshake. `check_connection` re-resolves the endpoint
/// and rebinds when necessary, so a destination that appears later (DNS,
/// interface up) starts receiving without any sink restart.
pub struct DatagramSink {
    inner: Arc<DatagramInner>,
}

impl DatagramSink {
    /// Create a sink for `host:port` over the given address family
    ///
    /// The socket is bound lazily by the first batch.
    pub fn new(host: impl Into<String>, port: u16, version: IpVersion) -> Arc<Self> {
        let inner = Arc::new(DatagramInner {
            host: host.into(),
            port,
            version,
            socket: Mutex::new(SocketState {
                socket: None,
                endpoint: None,
                last_failure: None,
                scratch: String::with_capacity(256),
            }),
            config: Mutex::new(LineFormat::default()),
            filters: Mutex::new(FilterSet::new()),
            retry_interval_secs: AtomicU64::new(DEFAULT_RETRY_INTERVAL_SECS),
            cancel: CancellationToken::new(),
        });

        Arc::new(Self { inner })
    }

    /// Destination host
    pub fn host(&self) -> &str {
        &self.inner.host
    }

    /// Destination port
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Set the wait between resolve attempts after a failure
    pub fn set_timeout(&self, seconds: u64) {
        self.inner
            .retry_interval_secs
            .store(seconds.max(1), Ordering::Relaxed);
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

    /// Re-resolve and rebind if the socket is not open
    pub async fn check_connection(&self) {
        let mut state = self.inner.socket.lock().await;
        check_connection_locked(&self.inner, &mut state).await;
    }

    /// Is the socket bound and open?
    pub async fn connection_is_open(&self) -> bool {
        let state = self.inner.socket.lock().await;
        state.socket.is_some() && state.endpoint.is_some()
    }
}

impl Drop for DatagramSink {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

#[async_trait::async_trait]
impl Sink for DatagramSink {
    async fn handle(&self, batch: Arc<Batch>) {
        let inner = &self.inner;

        // Fixed acquisition order: socket -> config -> filters.
        let mut state = inner.socket.lock().await;
        let config = inner.config.lock().await;
        let mut filters = inner.filters.lock().await;

        let state = &mut *state;
        check_connection_locked(inner, state).await;
        let (Some(socket), Some(endpoint)) = (state.socket.as_ref(), state.endpoint) else {
            // Unresolvable destination: the whole batch drops.
            return;
        };

        let scratch = &mut state.scratch;
        for record in batch.iter() {
            if inner.cancel.is_cancelled() {
                break;
            }
            if !filters.accepts(record) {
                continue;
            }

            scratch.clear();
            config.render(record, scratch);

            let payload = &scratch.as_bytes()[..scratch.len().min(MAX_DATAGRAM_BYTES)];
            if let Err(error) = socket.send_to(payload, endpoint).await {
                tracing::warn!(
                    host = %inner.host,
                    port = inner.port,
                    %error,
                    "datagram send failed, dropping record"
                );
            }
        }
    }
}

/// Resolve + rebind with the socket lock already held
async fn check_connection_locked(inner: &DatagramInner, state: &mut SocketState) {
    if state.socket.is_some() && state.endpoint.is_some() {
        return;
    }

    // Pace retries so a dead DNS name is not hammered on every batch.
    let retry_after = Duration::from_secs(inner.retry_interval_secs.load(Ordering::Relaxed));
    if let Some(failed_at) = state.last_failure {
        if failed_at.elapsed() < retry_after {
            return;
        }
    }

    match open_socket(inner).await {
        Ok((socket, endpoint)) => {
            tracing::info!(host = %inner.host, port = inner.port, %endpoint, "datagram socket open");
            state.socket = Some(socket);
            state.endpoint = Some(endpoint);
            state.last_failure = None;
        }
        Err(error) => {
            tracing::warn!(host = %inner.host, port = inner.port, %error, "datagram socket unavailable");
            state.socket = None;
            state.endpoint = None;
            state.last_failure = Some(Instant::now());
        }
    }
}

async fn open_socket(inner: &DatagramInner) -> Result<(UdpSocket, SocketAddr), SinkError> {
    let endpoint = tokio::net::lookup_host((inner.host.as_str(), inner.port))
        .await?
        .find(|addr| inner.version.matches(addr))
        .ok_or_else(|| SinkError::Resolve {
            host: inner.host.clone(),
            port: inner.port,
        })?;

    let socket = UdpSocket::bind(inner.version.bind_addr()).await?;
    Ok((socket, endpoint))
}

#[cfg(test)]
#[path = "datagram_test.rs"]
mod datagram_test;

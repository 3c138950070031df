use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use spherolink_frame::{Decode, Encode};
use spherolink_transport::{BtStream, Endpoint, RawStream};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ConnectionConfig;
use crate::error::{ConnError, Result};
use crate::pipeline;
use crate::state::{ConnectionState, Shared};

const REACTOR_THREAD_NAME: &str = "spherolink-reactor";

/// The running background half of a connection.
struct Reactor {
    handle: Handle,
    cancel: CancellationToken,
    thread: JoinHandle<()>,
}

/// A framed, full-duplex connection to one device.
///
/// `send` queues an encoded frame for the reactor thread and returns at once.
/// `read` blocks the calling thread until the reactor has queued an inbound
/// frame. Frames go out in `send` order and come back in arrival order; no
/// attempt is made to match replies to requests.
///
/// All methods take `&self`, so a connection can be shared between threads
/// behind an `Arc`.
pub struct Connection {
    endpoint: Option<Endpoint>,
    config: ConnectionConfig,
    shared: Arc<Shared>,
    reactor: Mutex<Option<Reactor>>,
    /// Held for a whole `connect` so attempts never overlap.
    connect_gate: Mutex<()>,
}

impl Connection {
    /// A connection with no endpoint. `connect` fails until one is bound.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            endpoint: None,
            config,
            shared: Arc::new(Shared::new()),
            reactor: Mutex::new(None),
            connect_gate: Mutex::new(()),
        }
    }

    /// A connection bound to `endpoint`. Nothing is opened yet.
    pub fn with_endpoint(endpoint: Endpoint, config: ConnectionConfig) -> Self {
        Self {
            endpoint: Some(endpoint),
            config,
            shared: Arc::new(Shared::new()),
            reactor: Mutex::new(None),
            connect_gate: Mutex::new(()),
        }
    }

    /// Bind `endpoint` and connect with retry.
    pub fn open(endpoint: Endpoint, config: ConnectionConfig) -> Result<Self> {
        let conn = Self::with_endpoint(endpoint, config);
        conn.connect()?;
        Ok(conn)
    }

    /// Connect to the bound endpoint and start the reactor.
    ///
    /// Makes up to `max_retries + 1` blocking attempts with `retry_delay`
    /// between them. When all fail the connection is `Closed` and the error
    /// carries the last transport error. Connecting an already connected
    /// connection does nothing; a closed one can be connected again.
    ///
    /// `close` or `shutdown` from another thread aborts the retry loop.
    pub fn connect(&self) -> Result<()> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| ConnError::NotConnected("no endpoint bound".to_string()))?;

        let _gate = self.connect_gate.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut reactor = self.lock_reactor();
            if self.shared.is_connected() {
                debug!(%endpoint, "already connected");
                return Ok(());
            }
            if let Some(old) = reactor.take() {
                // Previous session is winding down; let it finish first.
                self.shared.begin_close(&old.cancel);
                join_reactor(old);
            }
            self.shared.begin_connect();
        }

        let raw = match self.connect_with_retry(endpoint) {
            Ok(raw) => raw,
            Err(err) => {
                self.shared.mark_closed();
                return Err(err);
            }
        };

        let mut reactor = self.lock_reactor();
        if self.shared.is_shutting_down() {
            info!(%endpoint, "closed while connecting");
            self.shared.mark_closed();
            return Err(ConnError::NotConnected("closed while connecting".to_string()));
        }
        match self.start_reactor(raw) {
            Ok(started) => {
                info!(%endpoint, "connected");
                *reactor = Some(started);
                Ok(())
            }
            Err(err) => {
                error!(%endpoint, error = %err, "failed to start reactor");
                self.shared.mark_closed();
                Err(err)
            }
        }
    }

    fn connect_with_retry(&self, endpoint: &Endpoint) -> Result<RawStream> {
        let attempts = self.config.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            if self.shared.is_shutting_down() {
                break;
            }
            match spherolink_transport::connect(endpoint) {
                Ok(raw) => return Ok(raw),
                Err(err) if attempt < attempts => {
                    warn!(
                        %endpoint,
                        attempt,
                        attempts,
                        error = %err,
                        "connect failed, retrying in {:?}",
                        self.config.retry_delay
                    );
                    last_error = Some(err);
                    if !self.shared.pause_unless_stopped(self.config.retry_delay) {
                        break;
                    }
                }
                Err(err) => {
                    error!(%endpoint, attempt, attempts, error = %err, "connect failed, quitting");
                    return Err(ConnError::NotConnected(err.to_string()));
                }
            }
        }

        info!(%endpoint, "connect abandoned");
        let reason = last_error.map_or_else(
            || format!("connect to {endpoint} abandoned"),
            |err| format!("connect abandoned after: {err}"),
        );
        Err(ConnError::NotConnected(reason))
    }

    fn start_reactor(&self, raw: RawStream) -> Result<Reactor> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let stream = {
            let _enter = runtime.enter();
            BtStream::from_raw(raw)?
        };
        let handle = runtime.handle().clone();
        let cancel = CancellationToken::new();

        self.shared.open();

        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        let read_buffer_size = self.config.read_buffer_size;
        let thread = thread::Builder::new()
            .name(REACTOR_THREAD_NAME.to_string())
            .spawn(move || {
                let session = pipeline::run(stream, Arc::clone(&shared), token, read_buffer_size);
                runtime.block_on(session);
                drop(runtime);
                shared.mark_closed();
                debug!("reactor stopped");
            })?;

        Ok(Reactor {
            handle,
            cancel,
            thread,
        })
    }

    /// Queue `frame` for transmission.
    ///
    /// Fails with `NotConnected` unless connected, and with a frame error if
    /// the frame cannot be encoded. Never waits for the socket.
    pub fn send<F: Encode + ?Sized>(&self, frame: &F) -> Result<()> {
        self.ensure_sendable()?;

        let mut buf = BytesMut::with_capacity(frame.wire_len());
        frame.encode(&mut buf)?;
        let bytes = buf.len();

        if self.shared.push_outbound(buf.freeze()) {
            self.shared.wake_writer();
        }
        debug!(bytes, "queued frame");
        Ok(())
    }

    /// Block until a frame arrives and decode it as `F`.
    ///
    /// Waits at most [`ConnectionConfig::read_timeout`] when one is set.
    pub fn read<F: Decode>(&self) -> Result<F> {
        let deadline = self.config.read_timeout.map(|t| (Instant::now() + t, t));
        let raw = self.next_frame(deadline, None)?;
        self.decode(&raw)
    }

    /// Like [`read`](Self::read) but gives up with `Timeout` after `timeout`.
    pub fn read_timeout<F: Decode>(&self, timeout: Duration) -> Result<F> {
        let raw = self.next_frame(Some((Instant::now() + timeout, timeout)), None)?;
        self.decode(&raw)
    }

    /// Like [`read`](Self::read) but gives up with `Cancelled` once `cancel`
    /// fires.
    pub fn read_cancellable<F: Decode>(&self, cancel: &CancellationToken) -> Result<F> {
        self.ensure_connected()?;

        let done = CancellationToken::new();
        let _stop_watcher = done.clone().drop_guard();
        if let Some(handle) = self.reactor_handle() {
            let shared = Arc::clone(&self.shared);
            let cancel = cancel.clone();
            handle.spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => shared.wake_readers(),
                    _ = done.cancelled() => {}
                }
            });
        }

        let deadline = self.config.read_timeout.map(|t| (Instant::now() + t, t));
        let raw = self.next_frame(deadline, Some(cancel))?;
        self.decode(&raw)
    }

    fn decode<F: Decode>(&self, raw: &[u8]) -> Result<F> {
        Ok(F::decode(raw, &self.config.frame)?)
    }

    fn next_frame(
        &self,
        deadline: Option<(Instant, Duration)>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Bytes> {
        self.ensure_connected()?;

        let ready = self.shared.inbound_ready();
        let mut inbound = self.shared.lock_inbound();
        loop {
            if let Some(frame) = inbound.pop_front() {
                return Ok(frame);
            }
            if !self.shared.is_connected() {
                return Err(ConnError::NotConnected("connection closed".to_string()));
            }
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(ConnError::Cancelled);
            }

            inbound = match deadline {
                None => ready.wait(inbound).unwrap_or_else(PoisonError::into_inner),
                Some((at, timeout)) => {
                    let now = Instant::now();
                    if now >= at {
                        return Err(ConnError::Timeout(timeout));
                    }
                    ready
                        .wait_timeout(inbound, at - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|poisoned| poisoned.into_inner().0)
                }
            };
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.shared.is_connected() {
            Ok(())
        } else {
            Err(ConnError::NotConnected(format!(
                "connection is {}",
                self.shared.state()
            )))
        }
    }

    fn ensure_sendable(&self) -> Result<()> {
        self.ensure_connected()?;
        if self.shared.is_shutting_down() {
            return Err(ConnError::NotConnected(
                "connection is shutting down".to_string(),
            ));
        }
        Ok(())
    }

    fn lock_reactor(&self) -> MutexGuard<'_, Option<Reactor>> {
        self.reactor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reactor_handle(&self) -> Option<Handle> {
        self.lock_reactor().as_ref().map(|r| r.handle.clone())
    }

    /// Block until every queued frame has been written, for at most `timeout`.
    ///
    /// Fails with `NotConnected` if the connection stops with frames still
    /// queued, and with `Timeout` if the queue is not empty by the deadline.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let drained = self.shared.outbound_drained();
        let mut outbound = self.shared.lock_outbound();
        loop {
            if outbound.is_empty() {
                return Ok(());
            }
            if !self.shared.is_connected() {
                return Err(ConnError::NotConnected(format!(
                    "connection closed with {} frame(s) unsent",
                    outbound.len()
                )));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ConnError::Timeout(timeout));
            }
            outbound = drained
                .wait_timeout(outbound, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Stop the reactor, close the socket and wait for the reactor thread.
    ///
    /// Frames still queued for sending are dropped. Blocked readers wake up
    /// with `NotConnected`. Calling it again is a no-op.
    pub fn close(&self) {
        let reactor = self.lock_reactor().take();

        if let Some(reactor) = reactor {
            match &self.endpoint {
                Some(endpoint) => info!(%endpoint, "closing connection"),
                None => info!("closing connection"),
            }
            self.shared.begin_close(&reactor.cancel);
            join_reactor(reactor);
        }
        self.shared.mark_closed();
    }

    /// Ask the reactor to stop once the frame being written is out.
    ///
    /// Returns immediately. New sends fail at once; the connection reaches
    /// `Closed` when the reactor exits. Calling it again is a no-op.
    pub fn shutdown(&self) {
        if !self.shared.request_shutdown() {
            return;
        }
        let running = self.lock_reactor().is_some();

        if !running {
            self.shared.mark_closed();
        } else if self
            .shared
            .transition(ConnectionState::Connected, ConnectionState::Closing)
        {
            debug!("graceful shutdown requested");
            self.shared.wake_writer();
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.is_shutting_down()
    }

    /// Frames queued but not yet fully written.
    pub fn pending_outbound(&self) -> usize {
        self.shared.pending_outbound()
    }

    /// Frames received but not yet read.
    pub fn pending_inbound(&self) -> usize {
        self.shared.pending_inbound()
    }

    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("state", &self.shared.state())
            .field("pending_outbound", &self.shared.pending_outbound())
            .field("pending_inbound", &self.shared.pending_inbound())
            .finish()
    }
}

fn join_reactor(reactor: Reactor) {
    if reactor.thread.join().is_err() {
        error!("reactor thread panicked");
    }
}

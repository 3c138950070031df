use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a [`Connection`](crate::Connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, never connected.
    Idle,
    /// Connect attempts in progress.
    Connecting,
    /// Reactor running, frames flow both ways.
    Connected,
    /// Stop requested; the reactor has not exited yet.
    Closing,
    /// Reactor gone or every connect attempt failed.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between callers and the reactor thread.
///
/// Each queue has its own lock and no code path takes both.
pub(crate) struct Shared {
    state: Mutex<ConnectionState>,
    connected: AtomicBool,
    shutting_down: AtomicBool,
    outbound: Mutex<VecDeque<Bytes>>,
    outbound_ready: Notify,
    outbound_drained: Condvar,
    inbound: Mutex<VecDeque<Bytes>>,
    inbound_ready: Condvar,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Idle),
            connected: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
            outbound: Mutex::new(VecDeque::new()),
            outbound_ready: Notify::new(),
            outbound_drained: Condvar::new(),
            inbound: Mutex::new(VecDeque::new()),
            inbound_ready: Condvar::new(),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }

    /// Move from `from` to `to` under one lock. Returns `false` and leaves the
    /// state alone if it was not `from`.
    pub(crate) fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let mut state = lock(&self.state);
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Enter `Connecting` and clear a stop left over from the last session.
    pub(crate) fn begin_connect(&self) {
        self.connected.store(false, Ordering::Release);
        self.shutting_down.store(false, Ordering::Release);
        self.set_state(ConnectionState::Connecting);
    }

    /// Sleep for up to `delay`, returning early with `false` once a stop is
    /// requested.
    pub(crate) fn pause_unless_stopped(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        let mut inbound = lock(&self.inbound);
        loop {
            if self.is_shutting_down() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            inbound = self
                .inbound_ready
                .wait_timeout(inbound, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Reset flags and queues for a new session.
    pub(crate) fn open(&self) {
        lock(&self.outbound).clear();
        lock(&self.inbound).clear();
        self.shutting_down.store(false, Ordering::Release);
        self.connected.store(true, Ordering::Release);
        self.set_state(ConnectionState::Connected);
    }

    /// Append a frame for the write pipeline. Returns `true` if the queue was
    /// empty before.
    pub(crate) fn push_outbound(&self, frame: Bytes) -> bool {
        let mut outbound = lock(&self.outbound);
        let was_empty = outbound.is_empty();
        outbound.push_back(frame);
        was_empty
    }

    pub(crate) fn front_outbound(&self) -> Option<Bytes> {
        lock(&self.outbound).front().cloned()
    }

    /// Remove the frame that was just written. Wakes flushers once the queue
    /// is empty.
    pub(crate) fn pop_outbound(&self) -> Option<Bytes> {
        let mut outbound = lock(&self.outbound);
        let frame = outbound.pop_front();
        if outbound.is_empty() {
            self.outbound_drained.notify_all();
        }
        frame
    }

    pub(crate) fn lock_outbound(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        lock(&self.outbound)
    }

    pub(crate) fn outbound_drained(&self) -> &Condvar {
        &self.outbound_drained
    }

    /// Wake every flusher so it re-checks the connection.
    pub(crate) fn wake_flushers(&self) {
        let _outbound = lock(&self.outbound);
        self.outbound_drained.notify_all();
    }

    pub(crate) fn pending_outbound(&self) -> usize {
        lock(&self.outbound).len()
    }

    pub(crate) fn wake_writer(&self) {
        self.outbound_ready.notify_one();
    }

    pub(crate) async fn writer_woken(&self) {
        self.outbound_ready.notified().await;
    }

    pub(crate) fn push_inbound(&self, frame: Bytes) {
        lock(&self.inbound).push_back(frame);
        self.inbound_ready.notify_one();
    }

    pub(crate) fn pending_inbound(&self) -> usize {
        lock(&self.inbound).len()
    }

    pub(crate) fn lock_inbound(&self) -> MutexGuard<'_, VecDeque<Bytes>> {
        lock(&self.inbound)
    }

    pub(crate) fn inbound_ready(&self) -> &Condvar {
        &self.inbound_ready
    }

    /// Wake every blocked reader so it re-checks its exit conditions.
    pub(crate) fn wake_readers(&self) {
        let _inbound = lock(&self.inbound);
        self.inbound_ready.notify_all();
    }

    /// Request a graceful stop. Returns `false` if one was already requested.
    pub(crate) fn request_shutdown(&self) -> bool {
        !self.shutting_down.swap(true, Ordering::AcqRel)
    }

    /// Stop the reactor now: no new sends, loops exit, readers wake.
    pub(crate) fn begin_close(&self, cancel: &CancellationToken) {
        self.shutting_down.store(true, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        {
            let mut state = lock(&self.state);
            if *state != ConnectionState::Closed {
                *state = ConnectionState::Closing;
            }
        }
        cancel.cancel();
        self.wake_readers();
        self.wake_flushers();
    }

    /// The reactor has exited or never started.
    pub(crate) fn mark_closed(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        self.set_state(ConnectionState::Closed);
        self.wake_readers();
        self.wake_flushers();
    }
}

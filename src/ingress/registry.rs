//! Connection registry.
//!
//! Tracks every active connection and its per-connection throttle state.
//! Lifecycle is driven entirely by external open/close notifications; the
//! registry never owns the underlying transport.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

/// Opaque, stable identity for one logical client session.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({:?})", &*self.0)
    }
}

/// Per-connection state: pending message queue, per-tick counter, and
/// last-activity timestamp.
///
/// The queue is written by whoever dispatches inbound messages for this
/// connection and swapped out by the single drain task; both critical
/// sections are a handful of instructions.
pub struct ConnectionState<M> {
    queue: Mutex<VecDeque<M>>,
    received_this_tick: AtomicU32,
    last_activity: Mutex<Instant>,
}

impl<M> ConnectionState<M> {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            received_this_tick: AtomicU32::new(0),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    /// Count one arrival and, if the post-increment count stays within
    /// `cap`, append the message in arrival order. Returns whether the
    /// message was queued.
    ///
    /// Counting and queueing happen under the queue lock, the same lock
    /// [`take_tick`](Self::take_tick) swaps under, so a message can never
    /// be counted in one tick window and queued in the next.
    pub(crate) fn offer(&self, message: M, cap: u32) -> bool {
        let mut queue = self.queue.lock();
        let seen = self.received_this_tick.fetch_add(1, Ordering::SeqCst) + 1;
        if seen > cap {
            return false;
        }
        queue.push_back(message);
        true
    }

    /// Swap out the pending queue and reset the per-tick counter as one
    /// step. Called exactly once per drain pass.
    ///
    /// Messages enqueued after the swap land in the fresh queue, counted
    /// against the fresh window, and are picked up by the next pass.
    pub(crate) fn take_tick(&self) -> VecDeque<M> {
        let mut queue = self.queue.lock();
        self.received_this_tick.store(0, Ordering::SeqCst);
        std::mem::take(&mut *queue)
    }

    pub(crate) fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Messages currently queued for the next drain.
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Messages received since the last drain.
    pub fn received_this_tick(&self) -> u32 {
        self.received_this_tick.load(Ordering::SeqCst)
    }

    /// Time since the last inbound message (or registration).
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }
}

/// Concurrent map from connection identity to per-connection state.
///
/// Cheap to clone; clones share the same underlying map.
pub struct Registry<M> {
    connections: Arc<DashMap<ConnectionId, Arc<ConnectionState<M>>>>,
}

impl<M> Clone for Registry<M> {
    fn clone(&self) -> Self {
        Self {
            connections: Arc::clone(&self.connections),
        }
    }
}

impl<M> Default for Registry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Registry<M> {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Create fresh state for `id` if absent. Re-registering an already
    /// known connection keeps its existing state untouched.
    pub fn register(&self, id: &ConnectionId) {
        self.connections
            .entry(id.clone())
            .or_insert_with(|| Arc::new(ConnectionState::new()));
    }

    /// Remove and discard all state for `id`. No-op if the connection was
    /// never registered or is already gone.
    pub fn unregister(&self, id: &ConnectionId) {
        self.connections.remove(id);
    }

    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ConnectionState<M>>> {
        self.connections.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Collect the current set of connections without holding any shard
    /// lock while the caller processes them.
    pub(crate) fn snapshot(&self) -> Vec<(ConnectionId, Arc<ConnectionState<M>>)> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }
}

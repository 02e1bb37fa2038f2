//! Ingress throttle: per-connection rate capping and periodic drain.
//!
//! Inbound messages are queued per connection and counted against a
//! per-tick cap. A periodic drain pass forwards every message queued
//! before the pass began, in arrival order, through a [`MessageSink`],
//! then resets the counters for the next tick.

use tracing::{debug, warn};

use super::registry::{ConnectionId, Registry};
use crate::error::Result;

/// Decision returned to the external dispatcher for one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The message was queued and will be forwarded by the next drain.
    Accepted,
    /// The message exceeded the per-tick cap (or arrived for an unknown
    /// connection) and was discarded. The dispatcher must not process it.
    Rejected,
}

impl Verdict {
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Re-injection endpoint for drained messages.
///
/// Implementations must not block: a forward that cannot complete
/// immediately should return an error so the drain can move on. A
/// returned error drops the remainder of that connection's batch for
/// the current pass; other connections are unaffected.
pub trait MessageSink<M>: Send + Sync + Clone + 'static {
    fn forward(&self, id: &ConnectionId, message: M) -> Result<()>;
}

/// Outcome of one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Messages successfully forwarded across all connections.
    pub forwarded: u64,
    /// Connections whose batch was cut short by a forward failure.
    pub failed_connections: u64,
}

/// Per-connection inbound rate limiter.
///
/// Shares its registry with the rest of the core; cloning is cheap.
pub struct Throttle<M> {
    registry: Registry<M>,
    per_tick_cap: u32,
}

impl<M> Clone for Throttle<M> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            per_tick_cap: self.per_tick_cap,
        }
    }
}

impl<M: Send + 'static> Throttle<M> {
    pub fn new(registry: Registry<M>, per_tick_cap: u32) -> Self {
        Self {
            registry,
            per_tick_cap,
        }
    }

    /// Record an inbound message for `id`.
    ///
    /// Counts the message against the per-tick cap; past the cap it is
    /// rejected and discarded. Messages for unknown connections are
    /// rejected without creating state: connections only come into
    /// existence through registration.
    pub fn enqueue(&self, id: &ConnectionId, message: M) -> Verdict {
        let Some(state) = self.registry.get(id) else {
            debug!(%id, "message for unknown connection rejected");
            return Verdict::Rejected;
        };

        state.touch();

        if !state.offer(message, self.per_tick_cap) {
            debug!(%id, cap = self.per_tick_cap, "per-tick cap exceeded");
            return Verdict::Rejected;
        }

        Verdict::Accepted
    }

    /// Run one drain pass over every registered connection.
    ///
    /// Each connection's queue is swapped out first, so messages arriving
    /// while the pass runs wait for the next one. The counter reset is
    /// part of the same swap, so an arrival is always counted in the
    /// window its message lands in; forwarding happens outside any lock.
    pub fn drain<S: MessageSink<M>>(&self, sink: &S) -> DrainSummary {
        let mut summary = DrainSummary::default();

        for (id, state) in self.registry.snapshot() {
            let batch = state.take_tick();

            for message in batch {
                if let Err(err) = sink.forward(&id, message) {
                    warn!(%id, error = %err, "forward failed, dropping rest of batch");
                    summary.failed_connections += 1;
                    break;
                }
                summary.forwarded += 1;
            }
        }

        summary
    }
}

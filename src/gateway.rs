//! Host-facing façade over the ingress and resolver components.
//!
//! The host's serving loop notifies the gateway about connection
//! lifecycle and inbound messages, its scheduler invokes `drain_tick`,
//! and its DNS-consuming code reads the active resolver selection.
//! Designed with trait-based dependencies for testability.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{Config, TuningSettings};
use crate::error::Result;
use crate::ingress::{
    ConnectionId, MessageSink, Registry, Throttle, TransportHandle, Verdict, tune,
};
use crate::resolver::{ActiveResolver, Benchmark, ResolverCandidate, SelectedResolver, TcpProber};

/// Counters for gateway operations.
#[derive(Debug, Default)]
pub struct GatewayStats {
    pub messages_accepted: AtomicU64,
    pub messages_rejected: AtomicU64,
    pub messages_forwarded: AtomicU64,
    pub forward_failures: AtomicU64,
    pub connections_tuned: AtomicU64,
}

/// The concurrency core's entry point for a host connection-serving
/// process.
///
/// Generic over the host's message type `M` and the re-injection sink
/// `S`; the gateway never owns transports or payloads, it only observes
/// and forwards them.
pub struct Gateway<M, S>
where
    M: Send + 'static,
    S: MessageSink<M>,
{
    registry: Registry<M>,
    throttle: Throttle<M>,
    tuning: TuningSettings,
    sink: S,
    active: ActiveResolver,
    probe_timeout: Duration,
    probe_port: u16,
    stats: Arc<GatewayStats>,
}

impl<M, S> Gateway<M, S>
where
    M: Send + 'static,
    S: MessageSink<M>,
{
    /// Create a gateway from configuration and the host's sink.
    pub fn new(config: &Config, sink: S) -> Self {
        let registry = Registry::new();
        let throttle = Throttle::new(registry.clone(), config.per_tick_cap);

        Self {
            registry,
            throttle,
            tuning: config.tuning.clone(),
            sink,
            active: ActiveResolver::new(),
            probe_timeout: config.probe_timeout(),
            probe_port: config.probe_port,
            stats: Arc::new(GatewayStats::default()),
        }
    }

    /// Handle a connection-open notification.
    ///
    /// Registers fresh per-connection state and tunes the transport.
    /// Tuning is best-effort: a transport that cannot be tuned is logged
    /// and skipped, never fatal to the connection. Safe to call again
    /// for a retried notification; the inspection stage is installed at
    /// most once.
    pub fn on_connection_opened(&self, id: &ConnectionId, transport: &dyn TransportHandle) {
        self.registry.register(id);

        match tune(transport, &self.tuning) {
            Ok(true) => {
                self.stats.connections_tuned.fetch_add(1, Ordering::Relaxed);
                debug!(%id, "transport tuned, inspection stage installed");
            }
            Ok(false) => debug!(%id, "inspection stage already present"),
            Err(err) => warn!(%id, error = %err, "transport tuning failed"),
        }
    }

    /// Handle a connection-close notification. No-op for unknown ids.
    pub fn on_connection_closed(&self, id: &ConnectionId) {
        self.registry.unregister(id);
    }

    /// Record an inbound message and tell the dispatcher whether to keep
    /// processing it.
    pub fn on_inbound_message(&self, id: &ConnectionId, message: M) -> Verdict {
        let verdict = self.throttle.enqueue(id, message);
        match verdict {
            Verdict::Accepted => self.stats.messages_accepted.fetch_add(1, Ordering::Relaxed),
            Verdict::Rejected => self.stats.messages_rejected.fetch_add(1, Ordering::Relaxed),
        };
        verdict
    }

    /// Periodic drain hook for the host's scheduler.
    pub fn drain_tick(&self) {
        let summary = self.throttle.drain(&self.sink);
        self.stats
            .messages_forwarded
            .fetch_add(summary.forwarded, Ordering::Relaxed);
        self.stats
            .forward_failures
            .fetch_add(summary.failed_connections, Ordering::Relaxed);
    }

    /// Benchmark the given candidates and publish the fastest as the
    /// active resolver. One-shot; may be re-invoked on demand.
    pub async fn run_resolver_benchmark(
        &self,
        candidates: &[ResolverCandidate],
    ) -> Result<SelectedResolver> {
        let bench = Benchmark::new(
            TcpProber::new(self.probe_timeout),
            self.probe_port,
            self.active.clone(),
        );
        bench.select_best(candidates).await
    }

    /// The currently selected resolver, if a benchmark has published one.
    pub fn active_resolver(&self) -> Option<Arc<SelectedResolver>> {
        self.active.current()
    }

    /// Number of currently registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }
}

impl<M, S> Clone for Gateway<M, S>
where
    M: Send + 'static,
    S: MessageSink<M>,
{
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            throttle: self.throttle.clone(),
            tuning: self.tuning.clone(),
            sink: self.sink.clone(),
            active: self.active.clone(),
            probe_timeout: self.probe_timeout,
            probe_port: self.probe_port,
            stats: Arc::clone(&self.stats),
        }
    }
}

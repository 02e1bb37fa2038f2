//! Resolver benchmarking: concurrent latency probes and winner selection.
//!
//! One probe per candidate, all launched together, each bounded by the
//! configured timeout. The lowest successful latency wins; ties go to
//! the earlier candidate in the input list. The winner is published
//! atomically to [`ActiveResolver`]; if every probe fails, the previous
//! selection is left untouched.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::active::{ActiveResolver, SelectedResolver};
use crate::error::{Error, Result};

/// One candidate resolver: an address and a human-readable label.
///
/// Immutable once a benchmark run has started.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverCandidate {
    pub address: IpAddr,
    pub label: String,
}

impl ResolverCandidate {
    pub fn new(address: IpAddr, label: impl Into<String>) -> Self {
        Self {
            address,
            label: label.into(),
        }
    }
}

/// Terminal outcome of a single probe. No retries within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Succeeded(Duration),
    Failed,
    TimedOut,
}

impl ProbeOutcome {
    pub const fn latency(self) -> Option<Duration> {
        match self {
            Self::Succeeded(latency) => Some(latency),
            Self::Failed | Self::TimedOut => None,
        }
    }
}

/// Trait for latency probing.
///
/// Abstracted so the benchmark can be driven by mock probers in tests
/// and by different handshake strategies in production.
pub trait Prober: Send + Sync + Clone + 'static {
    /// Measure one candidate. Must resolve within the prober's budget.
    fn probe(&self, target: SocketAddr) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Production prober: a bounded TCP connection establishment.
///
/// The elapsed time of a successful connect is the measured latency;
/// refusal maps to [`ProbeOutcome::Failed`] and budget exhaustion to
/// [`ProbeOutcome::TimedOut`].
#[derive(Clone)]
pub struct TcpProber {
    budget: Duration,
}

impl TcpProber {
    pub const fn new(budget: Duration) -> Self {
        Self { budget }
    }
}

impl Prober for TcpProber {
    async fn probe(&self, target: SocketAddr) -> ProbeOutcome {
        let start = Instant::now();
        match tokio::time::timeout(self.budget, TcpStream::connect(target)).await {
            Ok(Ok(_stream)) => ProbeOutcome::Succeeded(start.elapsed()),
            Ok(Err(err)) => {
                debug!(%target, error = %err, "probe refused");
                ProbeOutcome::Failed
            }
            Err(_) => ProbeOutcome::TimedOut,
        }
    }
}

/// One-shot resolver benchmark. May be re-invoked on demand.
pub struct Benchmark<P: Prober> {
    prober: P,
    probe_port: u16,
    active: ActiveResolver,
}

impl<P: Prober> Benchmark<P> {
    pub fn new(prober: P, probe_port: u16, active: ActiveResolver) -> Self {
        Self {
            prober,
            probe_port,
            active,
        }
    }

    /// Probe every candidate concurrently and publish the fastest.
    ///
    /// Probes do not block each other; the run completes once all of
    /// them have resolved or timed out. Returns the published selection,
    /// or [`Error::AllCandidatesFailed`] with the previous selection
    /// untouched.
    pub async fn select_best(&self, candidates: &[ResolverCandidate]) -> Result<SelectedResolver> {
        let probes: Vec<_> = candidates
            .iter()
            .map(|candidate| {
                let prober = self.prober.clone();
                let target = SocketAddr::new(candidate.address, self.probe_port);
                tokio::spawn(async move { prober.probe(target).await })
            })
            .collect();

        // Awaiting in candidate order makes tie-breaking deterministic:
        // strictly-lower latency is required to displace an earlier winner.
        let mut best: Option<(usize, Duration)> = None;
        for (index, handle) in probes.into_iter().enumerate() {
            let outcome = handle.await.unwrap_or(ProbeOutcome::Failed);
            let candidate = &candidates[index];
            debug!(label = %candidate.label, address = %candidate.address, ?outcome, "probe finished");

            if let Some(latency) = outcome.latency() {
                if best.is_none_or(|(_, lowest)| latency < lowest) {
                    best = Some((index, latency));
                }
            }
        }

        let Some((index, latency)) = best else {
            warn!("resolver benchmark failed: no candidate responded");
            return Err(Error::AllCandidatesFailed);
        };

        let winner = &candidates[index];
        let selection = SelectedResolver {
            address: winner.address,
            label: winner.label.clone(),
            selected_at: SystemTime::now(),
        };
        self.active.publish(selection.clone());

        info!(
            label = %selection.label,
            address = %selection.address,
            latency_ms = latency.as_millis() as u64,
            "resolver benchmark selected winner"
        );

        Ok(selection)
    }
}

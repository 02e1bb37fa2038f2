//! Background tasks: the periodic drain and the startup benchmark.
//!
//! Both run on the tokio runtime, off the host's primary processing
//! loop. The drain task is gated on a shared running flag for
//! cooperative shutdown; the benchmark is an explicit task the host can
//! await, retry, or abort. Aborting a benchmark can never leave a
//! partial selection because publication is a single atomic swap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::Result;
use crate::gateway::Gateway;
use crate::ingress::MessageSink;
use crate::resolver::{ResolverCandidate, SelectedResolver};

/// Spawn the periodic drain task.
///
/// Invokes [`Gateway::drain_tick`] every `interval` until `running` is
/// cleared. The drain itself never blocks, so the ticker keeps its
/// cadence regardless of connection count.
pub fn spawn_drain_task<M, S>(
    gateway: Gateway<M, S>,
    running: Arc<AtomicBool>,
    interval: Duration,
) -> JoinHandle<()>
where
    M: Send + 'static,
    S: MessageSink<M>,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        while running.load(Ordering::SeqCst) {
            ticker.tick().await;
            gateway.drain_tick();
        }
    })
}

/// Spawn the resolver benchmark as an explicit task.
///
/// Returns the handle so the host can await the selection, retry on
/// failure, or abort during shutdown.
pub fn spawn_benchmark_task<M, S>(
    gateway: Gateway<M, S>,
    candidates: Vec<ResolverCandidate>,
) -> JoinHandle<Result<SelectedResolver>>
where
    M: Send + 'static,
    S: MessageSink<M>,
{
    tokio::spawn(async move { gateway.run_resolver_benchmark(&candidates).await })
}

//! Floodgate resolver benchmark runner - entry point.
//!
//! One-shot utility: loads configuration, probes every candidate
//! resolver concurrently, and reports the fastest. The embeddable core
//! (throttle, tuner, scheduler) lives in the library and is driven by a
//! host process instead of this binary.

use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use floodgate::config::Config;
use floodgate::resolver::{ActiveResolver, Benchmark, TcpProber};

async fn run() -> Result<()> {
    let config_path = std::env::var("CONFIG_PATH")
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed("config.toml"));

    let config = if Path::new(config_path.as_ref()).exists() {
        Config::load(config_path.as_ref()).context("Failed to load configuration")?
    } else {
        info!("No config file at {config_path}, using defaults");
        Config::parse("").context("Failed to build default configuration")?
    };

    floodgate::metrics::init(&config.metrics).context("Failed to initialize metrics")?;
    if config.metrics.enabled {
        info!("Metrics enabled on {}", config.metrics.listen);
    }

    info!("Benchmarking {} resolver candidates...", config.resolvers.len());
    info!(
        "Probe budget: {}ms, port {}",
        config.probe_timeout_ms, config.probe_port
    );

    let active = ActiveResolver::new();
    let bench = Benchmark::new(
        TcpProber::new(config.probe_timeout()),
        config.probe_port,
        active.clone(),
    );

    let selected = bench
        .select_best(&config.resolvers)
        .await
        .context("Resolver benchmark failed")?;

    info!("Active resolver: {} ({})", selected.label, selected.address);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    run().await
}

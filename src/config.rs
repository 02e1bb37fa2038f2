//! Configuration loading and validation.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::resolver::ResolverCandidate;

/// Main configuration for the Floodgate core.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum messages accepted per connection within one drain tick.
    /// Anything past the cap is rejected and discarded.
    #[serde(default = "default_per_tick_cap")]
    pub per_tick_cap: u32,

    /// Interval between drain passes, in milliseconds.
    #[serde(default = "default_drain_interval_ms")]
    pub drain_interval_ms: u64,

    /// Per-probe budget for resolver benchmarking, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// TCP port probed on each resolver candidate.
    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    /// Ordered list of resolver candidates. Order matters: benchmark
    /// ties are broken in favor of the earlier entry.
    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<ResolverCandidate>,

    /// Socket tuning applied to newly opened connections.
    #[serde(default)]
    pub tuning: TuningSettings,

    /// Prometheus metrics exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Socket options applied by the channel tuner.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuningSettings {
    /// Disable Nagle's algorithm on the transport.
    #[serde(default = "default_true")]
    pub no_delay: bool,

    /// Enable TCP keep-alive on the transport.
    #[serde(default = "default_true")]
    pub keep_alive: bool,

    /// Enable address reuse on the transport.
    #[serde(default = "default_true")]
    pub reuse_addr: bool,

    /// Send buffer size in bytes. If None, the transport default is kept.
    pub send_buffer: Option<usize>,

    /// Receive buffer size in bytes. If None, the transport default is kept.
    pub recv_buffer: Option<usize>,
}

impl Default for TuningSettings {
    fn default() -> Self {
        Self {
            no_delay: true,
            keep_alive: true,
            reuse_addr: true,
            send_buffer: None,
            recv_buffer: None,
        }
    }
}

/// Prometheus metrics exporter settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable the Prometheus scrape endpoint.
    #[serde(default)]
    pub enabled: bool,

    /// Address the exporter listens on.
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

const fn default_per_tick_cap() -> u32 {
    100
}

const fn default_drain_interval_ms() -> u64 {
    50
}

const fn default_probe_timeout_ms() -> u64 {
    300
}

const fn default_probe_port() -> u16 {
    53
}

const fn default_true() -> bool {
    true
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9090))
}

fn default_resolvers() -> Vec<ResolverCandidate> {
    [
        (Ipv4Addr::new(1, 1, 1, 1), "Cloudflare"),
        (Ipv4Addr::new(8, 8, 8, 8), "Google"),
        (Ipv4Addr::new(9, 9, 9, 9), "Quad9"),
        (Ipv4Addr::new(208, 67, 222, 222), "OpenDNS"),
        (Ipv4Addr::new(94, 140, 14, 14), "AdGuard"),
    ]
    .into_iter()
    .map(|(ip, label)| ResolverCandidate::new(IpAddr::V4(ip), label))
    .collect()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Interval between drain passes.
    pub const fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    /// Per-probe timeout budget.
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.per_tick_cap == 0 {
            return Err(ConfigError::Validation("per_tick_cap must be > 0".into()).into());
        }

        if self.drain_interval_ms == 0 {
            return Err(ConfigError::Validation("drain_interval_ms must be > 0".into()).into());
        }

        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::Validation("probe_timeout_ms must be > 0".into()).into());
        }

        if self.probe_port == 0 {
            return Err(ConfigError::Validation("probe_port must be > 0".into()).into());
        }

        let mut labels = HashSet::new();
        for candidate in &self.resolvers {
            if candidate.label.is_empty() {
                return Err(
                    ConfigError::Validation("resolver label cannot be empty".into()).into(),
                );
            }
            if !labels.insert(candidate.label.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate resolver label: {:?}",
                    candidate.label
                ))
                .into());
            }
        }

        Ok(())
    }
}

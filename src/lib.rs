//! Floodgate - inline ingress throttling and resolver selection.
//!
//! Floodgate is an embeddable concurrency core for multi-connection
//! network services. It bounds and smooths per-connection inbound
//! message rates, tunes connection transports without disturbing
//! in-flight traffic, and continuously keeps the fastest reachable
//! resolver from a fixed candidate list published as the active
//! default.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`]: Configuration loading and validation
//! - [`ingress`]: Connection registry, per-connection throttle, and
//!   transport tuner
//! - [`resolver`]: Concurrent latency benchmarking and the atomically
//!   published active selection
//! - [`gateway`]: The host-facing façade
//! - [`scheduler`]: Periodic drain and benchmark background tasks
//! - [`error`]: Error types
//!
//! # Testing
//!
//! All components are designed with trait-based abstractions to enable
//! comprehensive testing without network access: the host's transport
//! is reached only through the [`ingress::TransportHandle`] capability
//! trait, drained messages leave through [`ingress::MessageSink`], and
//! latency probes go through [`resolver::Prober`].

pub mod config;
pub mod error;
pub mod gateway;
pub mod ingress;
pub mod metrics;
pub mod resolver;
pub mod scheduler;

pub use config::Config;
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use ingress::{ConnectionId, MessageSink, TransportHandle, Verdict};

//! Resolver benchmarking and active-selection publication.

pub mod active;
pub mod bench;

pub use active::{ActiveResolver, SelectedResolver};
pub use bench::{Benchmark, ProbeOutcome, Prober, ResolverCandidate, TcpProber};

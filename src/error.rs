//! Error types for the Floodgate core.

use std::io;

use thiserror::Error;

/// Main error type for Floodgate operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A connection's transport could not be introspected or tuned,
    /// typically because the connection closed concurrently. Always
    /// contained to the affected connection.
    #[error("transport unavailable: {0}")]
    Transport(String),

    /// Every candidate in a benchmark run failed or timed out. The
    /// previously published selection is left untouched.
    #[error("no resolver candidate responded within budget")]
    AllCandidatesFailed,

    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

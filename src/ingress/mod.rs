//! Per-connection ingress handling: registry, throttle, and tuner.

pub mod registry;
pub mod throttle;
pub mod tuner;

pub use registry::{ConnectionId, ConnectionState, Registry};
pub use throttle::{DrainSummary, MessageSink, Throttle, Verdict};
pub use tuner::{INSPECTION_STAGE, SocketOption, StagePosition, TransportHandle, tune};

//! Channel tuner: socket options and idempotent inspection-stage install.
//!
//! The host exposes each connection's transport through the narrow
//! [`TransportHandle`] capability trait instead of letting this core poke
//! at its internal object graph. Tuning is best-effort: a transport that
//! cannot be tuned (typically because the connection closed concurrently)
//! is skipped, never failed hard.

use crate::config::TuningSettings;
use crate::error::Result;

/// Name of the pass-through inspection stage installed into each
/// connection's pipeline.
pub const INSPECTION_STAGE: &str = "floodgate-inspect";

/// Socket-level option applied to a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOption {
    NoDelay(bool),
    KeepAlive(bool),
    ReuseAddr(bool),
    SendBuffer(usize),
    RecvBuffer(usize),
}

/// Where a pipeline stage is installed relative to the transport's
/// message-decoding stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePosition {
    BeforeDecoder,
    AfterDecoder,
}

/// Capability interface the host supplies for each connection transport.
///
/// The core never owns the transport; it only applies options and
/// installs its own stage, leaving stages installed by other
/// collaborators untouched.
pub trait TransportHandle: Send + Sync {
    /// Apply one socket option.
    fn set_option(&self, option: SocketOption) -> Result<()>;

    /// Install a named pipeline stage at the given position.
    fn install_stage(&self, name: &str, position: StagePosition) -> Result<()>;

    /// Whether a stage with this name is already installed.
    fn has_stage(&self, name: &str) -> bool;
}

/// Tune a connection's transport and install the inspection stage.
///
/// Applies the configured socket options, then installs the inspection
/// stage after the decoder so it observes fully decoded application
/// messages. Re-invocation for an already tuned transport applies the
/// options again (they are idempotent) and leaves the existing stage
/// alone. Returns whether the stage was installed by this call.
pub fn tune(transport: &dyn TransportHandle, settings: &TuningSettings) -> Result<bool> {
    transport.set_option(SocketOption::NoDelay(settings.no_delay))?;
    transport.set_option(SocketOption::KeepAlive(settings.keep_alive))?;
    transport.set_option(SocketOption::ReuseAddr(settings.reuse_addr))?;

    if let Some(bytes) = settings.send_buffer {
        transport.set_option(SocketOption::SendBuffer(bytes))?;
    }
    if let Some(bytes) = settings.recv_buffer {
        transport.set_option(SocketOption::RecvBuffer(bytes))?;
    }

    if transport.has_stage(INSPECTION_STAGE) {
        return Ok(false);
    }

    transport.install_stage(INSPECTION_STAGE, StagePosition::AfterDecoder)?;
    Ok(true)
}

#[cfg(test)]
pub mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::error::Error;

    /// Mock transport recording applied options and installed stages.
    #[derive(Default)]
    pub struct MockTransport {
        pub options: Mutex<Vec<SocketOption>>,
        pub stages: Mutex<Vec<(String, StagePosition)>>,
        pub closed: Mutex<bool>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Simulate the connection closing underneath the tuner.
        pub fn close(&self) {
            *self.closed.lock() = true;
        }

        pub fn stage_count(&self, name: &str) -> usize {
            self.stages
                .lock()
                .iter()
                .filter(|(stage, _)| stage == name)
                .count()
        }
    }

    impl TransportHandle for MockTransport {
        fn set_option(&self, option: SocketOption) -> Result<()> {
            if *self.closed.lock() {
                return Err(Error::Transport("connection closed".into()));
            }
            self.options.lock().push(option);
            Ok(())
        }

        fn install_stage(&self, name: &str, position: StagePosition) -> Result<()> {
            if *self.closed.lock() {
                return Err(Error::Transport("connection closed".into()));
            }
            self.stages.lock().push((name.to_string(), position));
            Ok(())
        }

        fn has_stage(&self, name: &str) -> bool {
            self.stages.lock().iter().any(|(stage, _)| stage == name)
        }
    }

    fn settings() -> TuningSettings {
        TuningSettings::default()
    }

    #[test]
    fn should_apply_socket_options() {
        let transport = MockTransport::new();

        tune(&transport, &settings()).unwrap();

        let options = transport.options.lock();
        assert!(options.contains(&SocketOption::NoDelay(true)));
        assert!(options.contains(&SocketOption::KeepAlive(true)));
        assert!(options.contains(&SocketOption::ReuseAddr(true)));
    }

    #[test]
    fn should_apply_buffer_sizes_when_configured() {
        let transport = MockTransport::new();
        let settings = TuningSettings {
            send_buffer: Some(65536),
            recv_buffer: Some(32768),
            ..TuningSettings::default()
        };

        tune(&transport, &settings).unwrap();

        let options = transport.options.lock();
        assert!(options.contains(&SocketOption::SendBuffer(65536)));
        assert!(options.contains(&SocketOption::RecvBuffer(32768)));
    }

    #[test]
    fn should_install_stage_exactly_once() {
        let transport = MockTransport::new();

        assert!(tune(&transport, &settings()).unwrap());
        assert!(!tune(&transport, &settings()).unwrap());
        assert!(!tune(&transport, &settings()).unwrap());

        assert_eq!(transport.stage_count(INSPECTION_STAGE), 1);
    }

    #[test]
    fn should_install_stage_after_decoder() {
        let transport = MockTransport::new();

        tune(&transport, &settings()).unwrap();

        let stages = transport.stages.lock();
        assert_eq!(
            stages.as_slice(),
            [(INSPECTION_STAGE.to_string(), StagePosition::AfterDecoder)]
        );
    }

    #[test]
    fn should_leave_foreign_stages_untouched() {
        let transport = MockTransport::new();
        transport
            .install_stage("host-compressor", StagePosition::BeforeDecoder)
            .unwrap();

        tune(&transport, &settings()).unwrap();

        assert_eq!(transport.stage_count("host-compressor"), 1);
        assert_eq!(transport.stage_count(INSPECTION_STAGE), 1);
    }

    #[test]
    fn should_fail_on_closed_transport() {
        let transport = MockTransport::new();
        transport.close();

        let result = tune(&transport, &settings());

        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(transport.stage_count(INSPECTION_STAGE), 0);
    }
}

//! Integration tests for the Floodgate core.
//!
//! These tests drive the public gateway API end to end with mock
//! transports and sinks, plus real loopback sockets for the benchmark.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use floodgate::config::Config;
use floodgate::error::Error;
use floodgate::ingress::{INSPECTION_STAGE, SocketOption, StagePosition};
use floodgate::resolver::ResolverCandidate;
use floodgate::{ConnectionId, Gateway, MessageSink, TransportHandle, Verdict};

/// Mock transport recording installed stages.
#[derive(Default)]
struct TestTransport {
    options: Mutex<Vec<SocketOption>>,
    stages: Mutex<Vec<String>>,
}

impl TestTransport {
    fn stage_count(&self, name: &str) -> usize {
        self.stages.lock().iter().filter(|s| *s == name).count()
    }
}

impl TransportHandle for TestTransport {
    fn set_option(&self, option: SocketOption) -> floodgate::Result<()> {
        self.options.lock().push(option);
        Ok(())
    }

    fn install_stage(&self, name: &str, _position: StagePosition) -> floodgate::Result<()> {
        self.stages.lock().push(name.to_string());
        Ok(())
    }

    fn has_stage(&self, name: &str) -> bool {
        self.stages.lock().iter().any(|s| s == name)
    }
}

/// Sink collecting forwarded messages per connection.
#[derive(Clone, Default)]
struct CollectingSink {
    forwarded: Arc<Mutex<Vec<(ConnectionId, u32)>>>,
}

impl CollectingSink {
    fn messages_for(&self, id: &ConnectionId) -> Vec<u32> {
        self.forwarded
            .lock()
            .iter()
            .filter(|(conn, _)| conn == id)
            .map(|(_, msg)| *msg)
            .collect()
    }
}

impl MessageSink<u32> for CollectingSink {
    fn forward(&self, id: &ConnectionId, message: u32) -> floodgate::Result<()> {
        self.forwarded.lock().push((id.clone(), message));
        Ok(())
    }
}

fn gateway_with_cap(cap: u32) -> (Gateway<u32, CollectingSink>, CollectingSink) {
    let config = Config::parse(&format!("per_tick_cap = {cap}")).unwrap();
    let sink = CollectingSink::default();
    (Gateway::new(&config, sink.clone()), sink)
}

#[test]
fn should_throttle_and_drain_multiple_connections_independently() {
    let (gateway, sink) = gateway_with_cap(3);
    let quiet = ConnectionId::from("quiet");
    let noisy = ConnectionId::from("noisy");

    gateway.on_connection_opened(&quiet, &TestTransport::default());
    gateway.on_connection_opened(&noisy, &TestTransport::default());

    gateway.on_inbound_message(&quiet, 1);
    gateway.on_inbound_message(&quiet, 2);
    for n in 10..20 {
        gateway.on_inbound_message(&noisy, n);
    }

    gateway.drain_tick();

    // The quiet connection is untouched by the noisy one's flood.
    assert_eq!(sink.messages_for(&quiet), [1, 2]);
    assert_eq!(sink.messages_for(&noisy), [10, 11, 12]);
}

#[test]
fn should_accept_exactly_cap_within_one_tick() {
    let (gateway, _) = gateway_with_cap(5);
    let id = ConnectionId::from("conn-1");
    gateway.on_connection_opened(&id, &TestTransport::default());

    let accepted = (0..20)
        .filter(|n| gateway.on_inbound_message(&id, *n).is_accepted())
        .count();

    assert_eq!(accepted, 5);
}

#[test]
fn should_install_inspection_stage_once_across_retries() {
    let (gateway, _) = gateway_with_cap(10);
    let id = ConnectionId::from("conn-1");
    let transport = TestTransport::default();

    gateway.on_connection_opened(&id, &transport);
    gateway.on_connection_opened(&id, &transport);
    gateway.on_connection_opened(&id, &transport);

    assert_eq!(transport.stage_count(INSPECTION_STAGE), 1);
}

#[test]
fn should_survive_connection_closed_mid_drain() {
    /// Sink that closes the connection while its batch is being drained.
    #[derive(Clone)]
    struct ClosingSink {
        gateway: Arc<Mutex<Option<Gateway<u32, ClosingSink>>>>,
        closed: Arc<AtomicBool>,
        forwarded: Arc<Mutex<Vec<u32>>>,
    }

    impl MessageSink<u32> for ClosingSink {
        fn forward(&self, id: &ConnectionId, message: u32) -> floodgate::Result<()> {
            self.forwarded.lock().push(message);
            if !self.closed.swap(true, Ordering::SeqCst) {
                let guard = self.gateway.lock();
                if let Some(gateway) = guard.as_ref() {
                    gateway.on_connection_closed(id);
                }
            }
            Ok(())
        }
    }

    let sink = ClosingSink {
        gateway: Arc::new(Mutex::new(None)),
        closed: Arc::new(AtomicBool::new(false)),
        forwarded: Arc::new(Mutex::new(Vec::new())),
    };
    let config = Config::parse("").unwrap();
    let gateway = Gateway::new(&config, sink.clone());
    *sink.gateway.lock() = Some(gateway.clone());

    let id = ConnectionId::from("conn-1");
    gateway.on_connection_opened(&id, &TestTransport::default());
    gateway.on_inbound_message(&id, 1);
    gateway.on_inbound_message(&id, 2);

    gateway.drain_tick();

    // The already snapshotted batch still went out, the state is gone,
    // and a later message does not resurrect it.
    assert_eq!(*sink.forwarded.lock(), [1, 2]);
    assert_eq!(gateway.connection_count(), 0);
    assert_eq!(gateway.on_inbound_message(&id, 3), Verdict::Rejected);
}

#[tokio::test]
async fn should_select_reachable_loopback_resolver() {
    // A listening socket on loopback stands in for a fast resolver.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = Config::parse(&format!("probe_port = {port}")).unwrap();
    let gateway: Gateway<u32, CollectingSink> = Gateway::new(&config, CollectingSink::default());

    let candidates = vec![ResolverCandidate::new("127.0.0.1".parse().unwrap(), "Local")];
    let selected = gateway.run_resolver_benchmark(&candidates).await.unwrap();

    assert_eq!(selected.label, "Local");
    assert_eq!(gateway.active_resolver().unwrap().label, "Local");
}

#[tokio::test]
async fn should_report_failure_when_no_candidate_is_reachable() {
    // Grab a free port, then close it so the probe gets refused.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let config = Config::parse(&format!("probe_port = {port}\nprobe_timeout_ms = 200")).unwrap();
    let gateway: Gateway<u32, CollectingSink> = Gateway::new(&config, CollectingSink::default());

    let candidates = vec![ResolverCandidate::new("127.0.0.1".parse().unwrap(), "Gone")];
    let result = gateway.run_resolver_benchmark(&candidates).await;

    assert!(matches!(result, Err(Error::AllCandidatesFailed)));
    assert!(gateway.active_resolver().is_none());
}

#[test]
fn should_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
per_tick_cap = 25
drain_interval_ms = 40

[[resolvers]]
address = "9.9.9.9"
label = "Quad9"

[tuning]
recv_buffer = 16384
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.per_tick_cap, 25);
    assert_eq!(config.drain_interval(), Duration::from_millis(40));
    assert_eq!(config.resolvers.len(), 1);
    assert_eq!(config.tuning.recv_buffer, Some(16384));
}

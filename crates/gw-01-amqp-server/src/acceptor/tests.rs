use super::*;
use crate::domain::{ConfigError, TlsConfig, TransportError};
use crate::ports::{AttachedLink, ClientAuth};
use crate::registry::EndpointRegistryBuilder;
use crate::test_utils::{MockEndpoint, MockTransport, StaticAuthorization, EPHEMERAL_PORT_BASE};
use shared_bus::{EventFilter, EventSubscriber, GatewayEvent, InMemoryEventBus};
use shared_types::amqp::condition::{DECODE_ERROR, NOT_FOUND, UNAUTHORIZED_ACCESS};
use shared_types::amqp::{Link, LinkRole};
use shared_types::constants::{CONNECTION_CLOSED_ADDRESS, DEFAULT_TENANT};
use shared_types::testing::{MockConnection, MockLink, MockSession};
use shared_types::Permission;
use std::time::Duration;

struct Harness {
    acceptor: ConnectionAcceptor,
    transport: Arc<MockTransport>,
    authorization: Arc<StaticAuthorization>,
    bus: Arc<InMemoryEventBus>,
    telemetry: Arc<MockEndpoint>,
    control: Arc<MockEndpoint>,
}

fn insecure_config() -> ServerConfig {
    ServerConfig {
        insecure_port_enabled: true,
        insecure_port: Some(0),
        ..Default::default()
    }
}

fn tls_config() -> ServerConfig {
    ServerConfig {
        bind_address: "0.0.0.0".into(),
        insecure_port_enabled: true,
        tls: Some(TlsConfig {
            key_path: "key.pem".into(),
            cert_path: "cert.pem".into(),
            trust_store_path: None,
        }),
        ..Default::default()
    }
}

fn harness(config: ServerConfig, authorization: Arc<StaticAuthorization>) -> Harness {
    let telemetry = MockEndpoint::new("telemetry");
    let control = MockEndpoint::new("control");
    let registry = EndpointRegistryBuilder::new()
        .with(telemetry.clone())
        .with(control.clone())
        .build();
    let transport = MockTransport::new();
    let bus = Arc::new(InMemoryEventBus::new());
    let acceptor = ConnectionAcceptor::new(
        config,
        registry,
        authorization.clone(),
        bus.clone(),
        transport.clone(),
    );
    Harness {
        acceptor,
        transport,
        authorization,
        bus,
        telemetry,
        control,
    }
}

async fn started(authorization: Arc<StaticAuthorization>) -> Harness {
    let h = harness(insecure_config(), authorization);
    h.acceptor.start().await.unwrap();
    h
}

/// A connection that went through remote open on the first listener.
fn open_connection(h: &Harness, subject: Option<&str>) -> Arc<MockConnection> {
    let connection = match subject {
        Some(subject) => MockConnection::with_subject(subject),
        None => MockConnection::new(),
    };
    assert!(h.transport.connect(0, connection.clone()));
    connection.fire_remote_open();
    connection
}

/// Records the level and message of every event while installed.
#[derive(Clone, Default)]
struct LogRecorder(Arc<Mutex<Vec<(tracing::Level, String)>>>);

impl LogRecorder {
    fn level_of(&self, message: &str) -> Option<tracing::Level> {
        self.0
            .lock()
            .iter()
            .find(|(_, m)| m == message)
            .map(|(level, _)| *level)
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogRecorder {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        struct Message(String);
        impl tracing::field::Visit for Message {
            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.0 = format!("{value:?}");
                }
            }
        }
        let mut message = Message(String::new());
        event.record(&mut message);
        self.0.lock().push((*event.metadata().level(), message.0));
    }
}

async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached");
}

// =============================================================================
// Startup and shutdown
// =============================================================================

#[tokio::test]
async fn test_start_binds_insecure_listener() {
    let h = started(StaticAuthorization::allowing()).await;

    assert_eq!(h.telemetry.starts(), 1);
    assert_eq!(h.control.starts(), 1);
    assert_eq!(h.acceptor.port(), None);
    assert_eq!(h.acceptor.insecure_port(), Some(EPHEMERAL_PORT_BASE));

    let options = h.transport.options();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].port, 0);
    assert!(options[0].tls.is_none());
}

#[tokio::test]
async fn test_start_binds_secure_then_insecure() {
    let h = harness(tls_config(), StaticAuthorization::allowing());
    h.acceptor.start().await.unwrap();

    let options = h.transport.options();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].port, 5671);
    assert_eq!(options[0].bind_address, "0.0.0.0");
    assert_eq!(options[0].tls.as_ref().unwrap().client_auth, ClientAuth::None);
    assert_eq!(options[1].port, 5672);
    assert!(options[1].tls.is_none());
    assert_eq!(h.acceptor.port(), Some(5671));
    assert_eq!(h.acceptor.insecure_port(), Some(5672));
}

#[tokio::test]
async fn test_start_without_ports_fails_before_endpoints() {
    let h = harness(ServerConfig::default(), StaticAuthorization::allowing());

    let err = h.acceptor.start().await.unwrap_err();
    assert_eq!(err, ServerError::Config(ConfigError::NoPortConfigured));
    assert_eq!(h.telemetry.starts(), 0);
    assert!(h.transport.options().is_empty());
}

#[tokio::test]
async fn test_endpoint_start_failure_aborts_startup() {
    let h = harness(insecure_config(), StaticAuthorization::allowing());
    h.control.fail_start("downstream unavailable");

    let err = h.acceptor.start().await.unwrap_err();
    assert_eq!(
        err,
        ServerError::EndpointStart {
            name: "control".into(),
            source: EndpointError::Failed("downstream unavailable".into()),
        }
    );
    assert!(h.transport.options().is_empty());
    assert_eq!(h.acceptor.insecure_port(), None);

    // the sibling that did start is stopped again
    assert_eq!(h.telemetry.stops(), 1);
    assert_eq!(h.control.stops(), 0);
}

#[tokio::test]
async fn test_insecure_bind_failure_closes_secure_listener() {
    let h = harness(tls_config(), StaticAuthorization::allowing());
    h.transport.fail_on(5672);

    let err = h.acceptor.start().await.unwrap_err();
    assert!(matches!(
        err,
        ServerError::Bind {
            kind: ListenerKind::Insecure,
            source: TransportError::Bind { port: 5672, .. },
        }
    ));
    assert_eq!(h.transport.closed(), 1);
    assert_eq!(h.acceptor.port(), None);
    assert_eq!(h.telemetry.stops(), 1);
    assert_eq!(h.control.stops(), 1);
}

#[tokio::test]
async fn test_start_after_bind_failure_restarts_stopped_endpoints() {
    let h = harness(tls_config(), StaticAuthorization::allowing());
    h.transport.fail_on(5672);
    assert!(h.acceptor.start().await.is_err());

    h.transport.clear_failure();
    h.acceptor.start().await.unwrap();

    for endpoint in [&h.telemetry, &h.control] {
        assert_eq!(endpoint.starts(), 2);
        assert_eq!(endpoint.stops(), 1);
    }
    assert_eq!(h.acceptor.port(), Some(5671));
    assert_eq!(h.acceptor.insecure_port(), Some(5672));
}

#[tokio::test]
async fn test_start_twice() {
    let h = started(StaticAuthorization::allowing()).await;
    assert_eq!(h.acceptor.start().await, Err(ServerError::AlreadyStarted));
}

#[tokio::test]
async fn test_stop_closes_listeners_and_stops_all_endpoints() {
    let h = harness(tls_config(), StaticAuthorization::allowing());
    h.acceptor.start().await.unwrap();
    h.telemetry.fail_stop("flush failed");

    let err = h.acceptor.stop().await.unwrap_err();
    assert_eq!(
        err,
        ServerError::EndpointStop {
            name: "telemetry".into(),
            source: EndpointError::Failed("flush failed".into()),
        }
    );
    assert_eq!(h.transport.closed(), 2);
    assert_eq!(h.telemetry.stops(), 1);
    assert_eq!(h.control.stops(), 1);
    assert_eq!(h.acceptor.port(), None);
    assert_eq!(h.acceptor.insecure_port(), None);
}

#[tokio::test]
async fn test_stop_ok() {
    let h = started(StaticAuthorization::allowing()).await;
    assert!(h.acceptor.stop().await.is_ok());
    assert_eq!(h.transport.closed(), 1);
}

// =============================================================================
// Connection handling
// =============================================================================

#[tokio::test]
async fn test_remote_open_assigns_id_and_container() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, Some("device-4711"));

    assert_eq!(connection.calls(), vec!["open"]);
    assert!(connection.attachments().connection_id().is_some());
    assert_eq!(
        connection.container(),
        Some(format!("IoT-Gateway-127.0.0.1:{EPHEMERAL_PORT_BASE}"))
    );
}

#[tokio::test]
async fn test_repeated_open_keeps_first_id() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, None);
    let id = connection.attachments().connection_id();

    connection.fire_remote_open();
    assert_eq!(connection.attachments().connection_id(), id);
    assert_eq!(connection.calls(), vec!["open"]);
}

#[tokio::test]
async fn test_session_is_opened_and_closed_with_peer() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, None);
    let session = MockSession::new();

    connection.fire_session_open(session.clone());
    assert_eq!(session.calls(), vec!["open"]);

    assert!(session.fire_remote_close());
    assert_eq!(session.calls(), vec!["open", "close"]);
}

#[tokio::test]
async fn test_closed_event_published_once() {
    let h = started(StaticAuthorization::allowing()).await;
    let mut events = h
        .bus
        .subscribe(EventFilter::addresses([CONNECTION_CLOSED_ADDRESS]));
    let connection = open_connection(&h, None);
    let id = connection.attachments().connection_id().unwrap();

    connection.fire_remote_close(Ok(()));
    connection.fire_disconnect();
    assert_eq!(connection.calls(), vec!["open", "close", "disconnect", "disconnect"]);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap();
    assert_eq!(event, Some(GatewayEvent::ConnectionClosed { connection_id: id }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(events.try_recv().unwrap(), None);
}

#[tokio::test]
async fn test_connection_teardown_is_logged_at_info() {
    use tracing_subscriber::layer::SubscriberExt;

    let h = started(StaticAuthorization::allowing()).await;
    let recorder = LogRecorder::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

    let closed = open_connection(&h, None);
    closed.fire_remote_close(Ok(()));
    let dropped = open_connection(&h, None);
    dropped.fire_disconnect();

    assert_eq!(
        recorder.level_of("Client closed connection"),
        Some(tracing::Level::INFO)
    );
    assert_eq!(
        recorder.level_of("Client disconnected"),
        Some(tracing::Level::INFO)
    );
}

#[tokio::test]
async fn test_disconnect_without_close_publishes_event() {
    let h = started(StaticAuthorization::allowing()).await;
    let mut events = h.bus.subscribe(EventFilter::all());
    let connection = open_connection(&h, None);
    let id = connection.attachments().connection_id().unwrap();

    connection.fire_disconnect();
    assert_eq!(connection.calls(), vec!["open", "disconnect"]);

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap();
    assert_eq!(event, Some(GatewayEvent::ConnectionClosed { connection_id: id }));
}

#[tokio::test]
async fn test_no_event_for_connection_never_opened() {
    let h = started(StaticAuthorization::allowing()).await;
    let mut events = h.bus.subscribe(EventFilter::all());
    let connection = MockConnection::new();
    h.transport.connect(0, connection.clone());

    connection.fire_disconnect();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(events.try_recv().unwrap(), None);
}

// =============================================================================
// Link attach
// =============================================================================

#[tokio::test]
async fn test_authorized_receiver_link_is_handed_to_endpoint() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, Some("device-4711"));
    let link = MockLink::receiver("telemetry/tenant-a");

    connection.fire_receiver_open(link.clone());
    eventually(|| h.telemetry.attached().len() == 1).await;

    let calls = h.authorization.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].subject, "device-4711");
    assert_eq!(calls[0].resource, "telemetry/tenant-a");
    assert_eq!(calls[0].permission, Permission::Write);

    let (attached, resource) = h.telemetry.attached().remove(0);
    assert!(matches!(attached, AttachedLink::Receiver(_)));
    assert_eq!(resource.tenant_id(), "tenant-a");
    assert_eq!(link.local_address().as_deref(), Some("telemetry/tenant-a"));
    assert_eq!(
        link.attachments().connection_id(),
        connection.attachments().connection_id()
    );
    assert_eq!(link.calls(), vec!["open"]);
}

#[tokio::test]
async fn test_authorized_sender_link_is_handed_to_endpoint() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, Some("device-4711"));
    let link = MockLink::sender("control/tenant-a/4711");

    connection.fire_sender_open(link.clone());
    eventually(|| h.control.attached().len() == 1).await;

    assert_eq!(h.authorization.calls()[0].permission, Permission::Read);
    let (attached, resource) = h.control.attached().remove(0);
    assert!(attached.as_sender().is_some());
    assert_eq!(resource.resource_id(), Some("4711"));
    assert!(h.telemetry.attached().is_empty());
}

#[tokio::test]
async fn test_denied_receiver_link_is_closed() {
    let h = started(StaticAuthorization::denying()).await;
    let connection = open_connection(&h, Some("device-4711"));
    let link = MockLink::receiver("telemetry/tenant-a");

    connection.fire_receiver_open(link.clone());
    eventually(|| link.count("close") == 1).await;

    let condition = link.local_condition().unwrap();
    assert_eq!(condition.condition, UNAUTHORIZED_ACCESS);
    assert_eq!(
        condition.description.as_deref(),
        Some("subject [device-4711] is not authorized to WRITE to [telemetry/tenant-a]")
    );
    assert!(h.telemetry.attached().is_empty());
    assert_eq!(connection.calls(), vec!["open"]);
}

#[tokio::test]
async fn test_denied_sender_link_is_closed() {
    let h = started(StaticAuthorization::denying()).await;
    let connection = open_connection(&h, Some("app"));
    let link = MockLink::sender("control/tenant-a/4711");

    connection.fire_sender_open(link.clone());
    eventually(|| link.count("close") == 1).await;

    assert_eq!(
        link.local_condition().unwrap().description.as_deref(),
        Some("subject [app] is not authorized to READ from [control/tenant-a/4711]")
    );
}

#[tokio::test]
async fn test_anonymous_receiver_is_rejected_without_authorization() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, None);
    let link = MockLink::anonymous(LinkRole::Receiver);

    connection.fire_receiver_open(link.clone());

    assert_eq!(link.calls(), vec!["close"]);
    assert_eq!(link.local_condition().unwrap().condition, NOT_FOUND);
    assert!(h.authorization.calls().is_empty());
}

#[tokio::test]
async fn test_sender_without_source_is_rejected() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, None);
    let link = MockLink::anonymous(LinkRole::Sender);

    connection.fire_sender_open(link.clone());

    assert_eq!(link.calls(), vec!["close"]);
    assert_eq!(link.local_condition().unwrap().condition, DECODE_ERROR);
    assert!(h.authorization.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_address_is_rejected() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, None);
    let link = MockLink::receiver("telemetry");

    connection.fire_receiver_open(link.clone());

    assert_eq!(link.calls(), vec!["close"]);
    assert_eq!(link.local_condition().unwrap().condition, DECODE_ERROR);
    assert!(h.authorization.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_endpoint_is_rejected() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, None);
    let link = MockLink::receiver("event/tenant-a");

    connection.fire_receiver_open(link.clone());

    let condition = link.local_condition().unwrap();
    assert_eq!(condition.condition, NOT_FOUND);
    assert_eq!(
        condition.description.as_deref(),
        Some("no endpoint registered for address event/tenant-a")
    );
    assert!(h.authorization.calls().is_empty());
    assert_eq!(connection.calls(), vec!["open"]);
}

#[tokio::test]
async fn test_single_tenant_address() {
    let config = ServerConfig {
        single_tenant: true,
        ..insecure_config()
    };
    let h = harness(config, StaticAuthorization::allowing());
    h.acceptor.start().await.unwrap();
    let connection = open_connection(&h, Some("device-4711"));

    connection.fire_receiver_open(MockLink::receiver("telemetry"));
    eventually(|| h.telemetry.attached().len() == 1).await;

    let (_, resource) = h.telemetry.attached().remove(0);
    assert_eq!(resource.tenant_id(), DEFAULT_TENANT);
    assert_eq!(
        h.authorization.calls()[0].resource,
        format!("telemetry/{DEFAULT_TENANT}")
    );
}

#[tokio::test]
async fn test_unauthenticated_connection_uses_anonymous_subject() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, None);

    connection.fire_receiver_open(MockLink::receiver("telemetry/tenant-a"));
    eventually(|| !h.authorization.calls().is_empty()).await;

    assert_eq!(h.authorization.calls()[0].subject, "anonymous");
}

#[tokio::test]
async fn test_rejected_link_leaves_other_links_alone() {
    let h = started(StaticAuthorization::allowing()).await;
    let connection = open_connection(&h, Some("device-4711"));
    let bad = MockLink::receiver("nowhere/tenant-a");
    let good = MockLink::receiver("telemetry/tenant-a");

    connection.fire_receiver_open(bad.clone());
    connection.fire_receiver_open(good.clone());
    eventually(|| h.telemetry.attached().len() == 1).await;

    assert_eq!(bad.calls(), vec!["close"]);
    assert_eq!(good.calls(), vec!["open"]);
    assert_eq!(connection.calls(), vec!["open"]);
}

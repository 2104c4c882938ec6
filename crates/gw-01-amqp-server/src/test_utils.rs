//! Test utilities for the AMQP server.
//!
//! Doubles for the ports of the acceptor. Enable with the `test-utils`
//! feature flag. Engine doubles live in `shared_types::testing`.
//!
//! # Example
//!
//! ```rust,ignore
//! use gw_01_amqp_server::test_utils::MockEndpoint;
//! use gw_01_amqp_server::Endpoint;
//!
//! let endpoint = MockEndpoint::new("telemetry");
//! assert_eq!(endpoint.name(), "telemetry");
//! assert!(endpoint.attached().is_empty());
//! ```

use crate::domain::{EndpointError, TransportError};
use crate::ports::{
    AttachedLink, AuthorizationService, BoundListener, ConnectionListener, Endpoint,
    ListenOptions, TransportServer,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::amqp::Connection;
use shared_types::{Permission, ResourceIdentifier};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;

/// An endpoint that opens and records every link handed to it.
pub struct MockEndpoint {
    name: String,
    start_error: Mutex<Option<EndpointError>>,
    stop_error: Mutex<Option<EndpointError>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    attached: Mutex<Vec<(AttachedLink, ResourceIdentifier)>>,
}

impl MockEndpoint {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            start_error: Mutex::new(None),
            stop_error: Mutex::new(None),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            attached: Mutex::new(Vec::new()),
        })
    }

    /// Make `start` fail with `reason`.
    pub fn fail_start(&self, reason: &str) {
        *self.start_error.lock() = Some(EndpointError::Failed(reason.to_string()));
    }

    /// Make `stop` fail with `reason`.
    pub fn fail_stop(&self, reason: &str) {
        *self.stop_error.lock() = Some(EndpointError::Failed(reason.to_string()));
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Links handed over so far, with their parsed address.
    pub fn attached(&self) -> Vec<(AttachedLink, ResourceIdentifier)> {
        self.attached.lock().clone()
    }
}

#[async_trait]
impl Endpoint for MockEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), EndpointError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        match self.start_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), EndpointError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        match self.stop_error.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn on_link_attach(&self, link: AttachedLink, resource: ResourceIdentifier) {
        link.open();
        self.attached.lock().push((link, resource));
    }
}

/// One recorded authorization question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCall {
    pub subject: String,
    pub resource: String,
    pub permission: Permission,
}

/// Answers every authorization request the same way.
pub struct StaticAuthorization {
    allow: AtomicBool,
    calls: Mutex<Vec<AuthorizationCall>>,
}

impl StaticAuthorization {
    pub fn allowing() -> Arc<Self> {
        Self::build(true)
    }

    pub fn denying() -> Arc<Self> {
        Self::build(false)
    }

    fn build(allow: bool) -> Arc<Self> {
        Arc::new(Self {
            allow: AtomicBool::new(allow),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_allow(&self, allow: bool) {
        self.allow.store(allow, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<AuthorizationCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AuthorizationService for StaticAuthorization {
    async fn is_authorized(
        &self,
        subject: &str,
        resource: &ResourceIdentifier,
        permission: Permission,
    ) -> bool {
        self.calls.lock().push(AuthorizationCall {
            subject: subject.to_string(),
            resource: resource.to_string(),
            permission,
        });
        self.allow.load(Ordering::SeqCst)
    }
}

/// First port handed out when a listener asks for port 0.
pub const EPHEMERAL_PORT_BASE: u16 = 40_000;

/// A transport that binds nothing. Connections are injected with
/// [`MockTransport::connect`].
pub struct MockTransport {
    next_ephemeral: AtomicU16,
    failing_port: Mutex<Option<u16>>,
    options: Mutex<Vec<ListenOptions>>,
    listeners: Mutex<Vec<Arc<dyn ConnectionListener>>>,
    closed: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_ephemeral: AtomicU16::new(EPHEMERAL_PORT_BASE),
            failing_port: Mutex::new(None),
            options: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            closed: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Make binding to `port` fail.
    pub fn fail_on(&self, port: u16) {
        *self.failing_port.lock() = Some(port);
    }

    /// Let every port bind again.
    pub fn clear_failure(&self) {
        *self.failing_port.lock() = None;
    }

    /// Options of every successful `listen`, in order.
    pub fn options(&self) -> Vec<ListenOptions> {
        self.options.lock().clone()
    }

    /// Number of listeners closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Hand `connection` to the listener bound by the `index`-th `listen`.
    ///
    /// Returns false if there is no such listener.
    pub fn connect(&self, index: usize, connection: Arc<dyn Connection>) -> bool {
        let listener = self.listeners.lock().get(index).cloned();
        match listener {
            Some(listener) => {
                listener.on_connection(connection);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl TransportServer for MockTransport {
    async fn listen(
        &self,
        options: ListenOptions,
        listener: Arc<dyn ConnectionListener>,
    ) -> Result<Box<dyn BoundListener>, TransportError> {
        if *self.failing_port.lock() == Some(options.port) {
            return Err(TransportError::Bind {
                address: options.bind_address,
                port: options.port,
                reason: "address in use".into(),
            });
        }
        let port = match options.port {
            0 => self.next_ephemeral.fetch_add(1, Ordering::SeqCst),
            port => port,
        };
        self.options.lock().push(options);
        self.listeners.lock().push(listener);
        Ok(Box::new(MockBoundListener {
            port,
            closed: self.closed.clone(),
        }))
    }
}

pub struct MockBoundListener {
    port: u16,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BoundListener for MockBoundListener {
    fn local_port(&self) -> u16 {
        self.port
    }

    async fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
